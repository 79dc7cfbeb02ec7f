//! Bakes deployment settings from `.env` into the firmware.
//!
//! Every key falls back to its default when neither `.env` nor the build
//! environment sets it.

use std::env;

const SETTINGS: [(&str, &str); 2] = [
    ("ENVMON_PRESSURE_OFFSET_HPA", "200"),
    ("ENVMON_WAKE_INTERVAL_SECS", "600"),
];

fn main() {
    println!("cargo:rerun-if-changed=.env");

    // No .env file is fine
    let _ = dotenvy::dotenv();

    for (key, default) in SETTINGS {
        println!("cargo:rerun-if-env-changed={key}");

        let value = env::var(key).unwrap_or_else(|_| default.to_string());
        if value.trim().parse::<i64>().is_err() {
            panic!("{key} must be an integer, got {value:?}");
        }
        println!("cargo:rustc-env={key}={}", value.trim());
    }
}
