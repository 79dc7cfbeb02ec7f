//! Text output for compensated readings
//!
//! [`ReadingLines`] turns a [`CompensatedReading`] into the three text lines
//! shown on the panel. [`TextPanel`] draws them with the ISO-8859-1 5x8 mono
//! font onto any `DrawTarget`, one 8-pixel row per line.
//!
//! Characters the font has no glyph for are drawn as `?` and lines longer
//! than the panel are cut at [`PANEL_COLUMNS`].

use core::fmt::Write;

use embedded_graphics::mono_font::iso_8859_1::FONT_5X8;
use embedded_graphics::mono_font::{MonoTextStyle, MonoTextStyleBuilder};
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};
use heapless::String;

use crate::compensation::{CompensatedReading, Hundredths};

/// Byte capacity of a formatted reading line.
pub const LINE_CAPACITY: usize = 24;
/// Characters that fit across a 128 px panel with a 6 px advance.
pub const PANEL_COLUMNS: usize = 21;
pub const LINE_HEIGHT_PX: i32 = 8;
/// Drawn in place of characters the font cannot render.
pub const PLACEHOLDER: char = '?';
/// Latin-1 glyphs are at most two UTF-8 bytes.
pub const SANITIZED_CAPACITY: usize = PANEL_COLUMNS * 2;

const UNDEFINED_PRESSURE: &str = "----.--hPa";

/// The three lines written to the display once per cycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReadingLines {
    pub temperature: String<LINE_CAPACITY>,
    pub humidity: String<LINE_CAPACITY>,
    pub pressure: String<LINE_CAPACITY>,
}

impl ReadingLines {
    pub fn from_reading(reading: &CompensatedReading) -> Self {
        let mut lines = Self::default();

        push_hundredths(&mut lines.temperature, reading.temperature);
        lines.temperature.push_str("°C").ok();

        push_hundredths(&mut lines.humidity, reading.humidity);
        lines.humidity.push_str("%R").ok();

        if reading.pressure_defined {
            push_hundredths(&mut lines.pressure, reading.pressure);
            lines.pressure.push_str("hPa").ok();
        } else {
            lines.pressure.push_str(UNDEFINED_PRESSURE).ok();
        }

        lines
    }

    /// Lines in display order, top to bottom.
    pub fn rows(&self) -> [&str; 3] {
        [
            self.temperature.as_str(),
            self.humidity.as_str(),
            self.pressure.as_str(),
        ]
    }
}

fn push_hundredths<const N: usize>(line: &mut String<N>, value: Hundredths) {
    let sign = if value.is_negative() { "-" } else { "" };
    let _ = write!(
        line,
        "{}{}.{:02}",
        sign,
        value.integer.unsigned_abs(),
        value.fraction.unsigned_abs()
    );
}

/// `true` if the 5x8 ISO-8859-1 font has a glyph for `c`.
pub fn is_drawable(c: char) -> bool {
    matches!(c, ' '..='~' | '\u{A0}'..='\u{FF}')
}

/// Replace undrawable characters with [`PLACEHOLDER`] and cut the line to
/// [`PANEL_COLUMNS`] characters.
pub fn sanitize(line: &str) -> String<SANITIZED_CAPACITY> {
    let mut out = String::new();
    for c in line.chars().take(PANEL_COLUMNS) {
        let c = if is_drawable(c) { c } else { PLACEHOLDER };
        out.push(c).ok();
    }
    out
}

/// Consumer of the per-cycle text lines.
pub trait DisplaySink {
    type Error: core::fmt::Debug;

    fn show(&mut self, lines: &ReadingLines) -> Result<(), Self::Error>;
}

/// Draws reading lines as monospaced text.
pub struct TextPanel<D: DrawTarget> {
    target: D,
    style: MonoTextStyle<'static, D::Color>,
    background: D::Color,
}

impl<D: DrawTarget> TextPanel<D> {
    pub fn new(target: D, foreground: D::Color, background: D::Color) -> Self {
        let style = MonoTextStyleBuilder::new()
            .font(&FONT_5X8)
            .text_color(foreground)
            .background_color(background)
            .build();

        Self {
            target,
            style,
            background,
        }
    }

    pub fn target(&self) -> &D {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut D {
        &mut self.target
    }

    pub fn into_inner(self) -> D {
        self.target
    }
}

impl<D: DrawTarget> DisplaySink for TextPanel<D>
where
    D::Error: core::fmt::Debug,
{
    type Error = D::Error;

    fn show(&mut self, lines: &ReadingLines) -> Result<(), Self::Error> {
        self.target.clear(self.background)?;

        for (row, line) in lines.rows().into_iter().enumerate() {
            let text = sanitize(line);
            Text::with_baseline(
                &text,
                Point::new(0, row as i32 * LINE_HEIGHT_PX),
                self.style,
                Baseline::Top,
            )
            .draw(&mut self.target)?;
        }
        Ok(())
    }
}
