//! Reading display on the SPI LCD
//!
//! Lines are drawn into a 128x64 [`FrameBuffer`], then only the changed
//! region is pushed to the panel, centred on the 320x240 screen.

use embedded_graphics::pixelcolor::{BinaryColor, Rgb565};
use embedded_graphics::prelude::*;

use envmon_core::display::{DisplaySink, ReadingLines, TextPanel};
use envmon_core::framebuffer::{FRAME_HEIGHT_PX, FRAME_WIDTH_PX, FrameBuffer};

const FOREGROUND: Rgb565 = Rgb565::WHITE;
const BACKGROUND: Rgb565 = Rgb565::BLACK;

pub struct PanelSink<D> {
    text: TextPanel<FrameBuffer>,
    display: D,
    offset: Point,
}

impl<D> PanelSink<D>
where
    D: DrawTarget<Color = Rgb565>,
{
    /// Clear the panel and centre the text frame on it.
    pub fn new(mut display: D) -> Result<Self, D::Error> {
        display.clear(BACKGROUND)?;

        let size = display.bounding_box().size;
        let offset = Point::new(
            (size.width.saturating_sub(FRAME_WIDTH_PX) / 2) as i32,
            (size.height.saturating_sub(FRAME_HEIGHT_PX) / 2) as i32,
        );

        Ok(Self {
            text: TextPanel::new(FrameBuffer::new(), BinaryColor::On, BinaryColor::Off),
            display,
            offset,
        })
    }
}

impl<D> DisplaySink for PanelSink<D>
where
    D: DrawTarget<Color = Rgb565>,
    D::Error: core::fmt::Debug,
{
    type Error = D::Error;

    fn show(&mut self, lines: &ReadingLines) -> Result<(), Self::Error> {
        let Ok(()) = self.text.show(lines);
        self.text.target_mut().flush(
            &mut self.display.translated(self.offset),
            FOREGROUND,
            BACKGROUND,
        )
    }
}
