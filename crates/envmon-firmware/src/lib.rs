//! ESP32-S3 firmware-specific modules for envmon
//!
//! This crate contains hardware-specific code that cannot compile on desktop
//! targets: peripheral bring-up, the RTC alarm wake source, the SPI panel sink
//! and the build-time deployment settings.

#![no_std]

pub mod hardware;
pub mod panel;
pub mod rtc_alarm;
pub mod settings;
