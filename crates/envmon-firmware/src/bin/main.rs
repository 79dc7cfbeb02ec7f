#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]

use core::fmt::Display;

use embedded_hal_bus::spi::ExclusiveDevice;
use esp_hal::clock::CpuClock;
use esp_hal::delay::Delay;
use esp_hal::gpio::{Level, Output, OutputConfig};
use esp_hal::rtc_cntl::Rtc;
use esp_hal::spi::master::{Config as SpiConfig, Spi};
use log::{LevelFilter, error, info};

// Display-LCD panel specific imports
use mipidsi::interface::SpiInterface;
use mipidsi::{Builder as MipidsiBuilder, models::ILI9342CRgb565};

use envmon_core::cycle::AcquisitionCycle;
use envmon_core::wake::WakeChannel;
use envmon_firmware::hardware::{HardwareError, create_sensor_bus};
use envmon_firmware::panel::PanelSink;
use envmon_firmware::rtc_alarm::{RtcAlarm, wake_event};
use envmon_firmware::settings::monitor_config;

const DISPLAY_WIDTH: u16 = 320;
const DISPLAY_HEIGHT: u16 = 240;

static WAKE: WakeChannel = WakeChannel::new();

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

/// Stay awake and keep logging. Without an armed alarm, deep sleep would
/// never end.
fn halt(reason: impl Display) -> ! {
    let delay = Delay::new();
    loop {
        error!("Halted: {}", reason);
        delay.delay_millis(10_000);
    }
}

#[esp_hal::main]
fn main() -> ! {
    rtt_target::rtt_init_log!(LevelFilter::Info);

    let peripherals = esp_hal::init(esp_hal::Config::default().with_cpu_clock(CpuClock::max()));

    let event = wake_event();
    let config = monitor_config();
    info!("envmon starting ({:?})", event);

    let mut delay = Delay::new();

    let bus = match create_sensor_bus(
        peripherals.I2C0,
        peripherals.GPIO12,
        peripherals.GPIO11,
        config.sensor_address,
    ) {
        Ok(bus) => bus,
        Err(e) => halt(e),
    };

    // 1. Configure SPI bus
    let spi_bus = match Spi::new(peripherals.SPI2, SpiConfig::default()) {
        Ok(spi) => spi
            .with_sck(peripherals.GPIO36)
            .with_mosi(peripherals.GPIO37),
        Err(e) => halt(HardwareError::Spi(e)),
    };

    // 2. Dummy CS pin; the panel has no hardware CS
    let cs = Output::new(peripherals.GPIO35, Level::High, OutputConfig::default());
    let Ok(spi_device) = ExclusiveDevice::new_no_delay(spi_bus, cs);

    // 3. Data/Command pin and display interface
    let dc = Output::new(peripherals.GPIO34, Level::Low, OutputConfig::default());
    let mut spi_buffer = [0u8; 64];
    let di = SpiInterface::new(spi_device, dc, &mut spi_buffer);

    // 4. Build and initialize the display driver
    let display = match MipidsiBuilder::new(ILI9342CRgb565, di)
        .display_size(DISPLAY_WIDTH, DISPLAY_HEIGHT)
        .init(&mut delay)
    {
        Ok(display) => display,
        Err(_) => halt(HardwareError::Display),
    };
    let sink = match PanelSink::new(display) {
        Ok(sink) => sink,
        Err(e) => halt(format_args!("panel clear failed: {:?}", e)),
    };

    let alarm = RtcAlarm::new(Rtc::new(peripherals.LPWR), event);

    let mut cycle = match AcquisitionCycle::bring_up(bus, delay, sink, alarm, config) {
        Ok(cycle) => cycle,
        Err(e) => halt(e),
    };

    WAKE.notify(event);
    match cycle.service(&WAKE) {
        Some(Ok(report)) => info!(
            "Cycle complete (rendered: {}), next wake at {}",
            report.rendered, report.next_wake.target
        ),
        Some(Err(e)) => halt(e),
        None => halt("wake request lost"),
    }

    if !cycle.ready_to_sleep() {
        halt("no wake alarm armed");
    }
    let alarm = cycle.wake_source_mut();
    match alarm.pending() {
        Some(duration) => {
            info!("Entering deep sleep for {} s", duration.as_secs());
            alarm.deep_sleep(duration)
        }
        None => halt("no wake alarm armed"),
    }
}
