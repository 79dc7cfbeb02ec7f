//! Hardware-independent core library for envmon
//!
//! This crate contains all platform-agnostic logic for the envmon battery
//! powered environmental monitor: the BME280 register driver, calibration
//! decoding, the integer-only compensation pipeline, the duty-cycle wake
//! scheduler and the acquisition cycle that ties them together.
//!
//! It is `#![no_std]` and allocation free so it compiles on both embedded
//! targets (ESP32-S3) and desktop hosts (for the simulator and tests).

#![no_std]

pub mod bus;
pub mod calibration;
pub mod compensation;
pub mod config;
pub mod cycle;
pub mod display;
pub mod framebuffer;
pub mod schedule;
pub mod sensors;
pub mod wake;
