//! Monochrome framebuffer with dirty-region tracking.
//!
//! Drawing targets this RAM buffer instead of the panel. After a frame is
//! drawn, only the rectangle containing changed pixels is flushed to the
//! hardware display in a single `fill_contiguous` call.
//!
//! Pixels are stored in SSD1306 page order: 8 pages of 128 column bytes,
//! bit 0 of each byte being the top row of its page. Page-addressed
//! controllers can stream [`FrameBuffer::page`] directly.

use core::convert::Infallible;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use log::debug;

pub const FRAME_WIDTH_PX: u32 = 128;
pub const FRAME_HEIGHT_PX: u32 = 64;

const WIDTH: usize = FRAME_WIDTH_PX as usize;
const HEIGHT: usize = FRAME_HEIGHT_PX as usize;
const PAGES: usize = HEIGHT / 8;

/// Bounding box of pixels that have changed since the last flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DirtyRect {
    min_x: usize,
    min_y: usize,
    max_x: usize,
    max_y: usize,
}

impl DirtyRect {
    fn from_point(x: usize, y: usize) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    fn expand(&mut self, x: usize, y: usize) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn area(&self) -> Rectangle {
        Rectangle::with_corners(
            Point::new(self.min_x as i32, self.min_y as i32),
            Point::new(self.max_x as i32, self.max_y as i32),
        )
    }
}

/// 128x64 one-bit framebuffer implementing `DrawTarget<Color = BinaryColor>`.
pub struct FrameBuffer {
    pages: [[u8; WIDTH]; PAGES],
    dirty: Option<DirtyRect>,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    /// All pixels off, nothing dirty.
    pub const fn new() -> Self {
        Self {
            pages: [[0; WIDTH]; PAGES],
            dirty: None,
        }
    }

    /// `false` for coordinates outside the frame.
    pub fn is_on(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x as usize >= WIDTH || y as usize >= HEIGHT {
            return false;
        }
        let (x, y) = (x as usize, y as usize);
        self.pages[y / 8][x] & (1 << (y % 8)) != 0
    }

    /// Raw column bytes of page `index` (rows `8 * index ..= 8 * index + 7`).
    pub fn page(&self, index: usize) -> Option<&[u8; WIDTH]> {
        self.pages.get(index)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.is_some()
    }

    /// Mark every pixel dirty so the next flush repaints the whole frame.
    pub fn invalidate(&mut self) {
        self.dirty = Some(DirtyRect {
            min_x: 0,
            min_y: 0,
            max_x: WIDTH - 1,
            max_y: HEIGHT - 1,
        });
    }

    #[inline]
    fn set_pixel(&mut self, x: usize, y: usize, on: bool) {
        let byte = &mut self.pages[y / 8][x];
        let mask = 1 << (y % 8);
        if (*byte & mask != 0) == on {
            return;
        }

        if on {
            *byte |= mask;
        } else {
            *byte &= !mask;
        }
        match &mut self.dirty {
            Some(rect) => rect.expand(x, y),
            None => self.dirty = Some(DirtyRect::from_point(x, y)),
        }
    }

    /// Flush the dirty region to `display`, then reset the dirty state.
    ///
    /// Lit pixels are sent as `on`, dark ones as `off`. No-op when nothing
    /// changed. If the display rejects the write the region stays dirty and
    /// goes out again on the next flush.
    pub fn flush<D>(&mut self, display: &mut D, on: D::Color, off: D::Color) -> Result<(), D::Error>
    where
        D: DrawTarget,
    {
        let Some(rect) = self.dirty else {
            return Ok(());
        };

        let area = rect.area();
        debug!(
            "Flushing {}x{} dirty region at ({}, {})",
            area.size.width, area.size.height, rect.min_x, rect.min_y
        );

        let pages = &self.pages;
        let colors = (rect.min_y..=rect.max_y).flat_map(move |y| {
            (rect.min_x..=rect.max_x).map(move |x| {
                if pages[y / 8][x] & (1 << (y % 8)) != 0 {
                    on
                } else {
                    off
                }
            })
        });

        display.fill_contiguous(&area, colors)?;
        self.dirty = None;
        Ok(())
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(FRAME_WIDTH_PX, FRAME_HEIGHT_PX)
    }
}

impl DrawTarget for FrameBuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(coord, color) in pixels {
            let (x, y) = (coord.x, coord.y);
            if x >= 0 && y >= 0 && (x as usize) < WIDTH && (y as usize) < HEIGHT {
                self.set_pixel(x as usize, y as usize, color.is_on());
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let area = area.intersection(&self.bounding_box());
        let Some(bottom_right) = area.bottom_right() else {
            return Ok(());
        };

        for y in area.top_left.y..=bottom_right.y {
            for x in area.top_left.x..=bottom_right.x {
                self.set_pixel(x as usize, y as usize, color.is_on());
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                self.set_pixel(x, y, color.is_on());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::vec::Vec;

    use embedded_graphics::pixelcolor::Gray8;
    use embedded_graphics::primitives::{Line, PrimitiveStyle};

    use super::*;

    /// Records every `fill_contiguous` call.
    #[derive(Default)]
    struct RecordingPanel {
        fills: Vec<(Rectangle, Vec<Gray8>)>,
    }

    impl OriginDimensions for RecordingPanel {
        fn size(&self) -> Size {
            Size::new(320, 240)
        }
    }

    impl DrawTarget for RecordingPanel {
        type Color = Gray8;
        type Error = Infallible;

        fn draw_iter<I>(&mut self, _pixels: I) -> Result<(), Self::Error>
        where
            I: IntoIterator<Item = Pixel<Self::Color>>,
        {
            Ok(())
        }

        fn fill_contiguous<I>(&mut self, area: &Rectangle, colors: I) -> Result<(), Self::Error>
        where
            I: IntoIterator<Item = Self::Color>,
        {
            self.fills.push((*area, colors.into_iter().collect()));
            Ok(())
        }
    }

    #[test]
    fn test_new_frame_is_blank_and_clean() {
        let fb = FrameBuffer::new();

        assert!(!fb.is_dirty());
        assert!((0..8).all(|p| fb.page(p).unwrap().iter().all(|&b| b == 0)));
        assert!(fb.page(8).is_none());
    }

    #[test]
    fn test_page_layout() {
        let mut fb = FrameBuffer::new();
        Pixel(Point::new(5, 0), BinaryColor::On).draw(&mut fb).unwrap();
        Pixel(Point::new(5, 7), BinaryColor::On).draw(&mut fb).unwrap();
        Pixel(Point::new(127, 63), BinaryColor::On).draw(&mut fb).unwrap();

        assert_eq!(fb.page(0).unwrap()[5], 0b1000_0001);
        assert_eq!(fb.page(7).unwrap()[127], 0b1000_0000);
        assert!(fb.is_on(5, 7));
        assert!(!fb.is_on(5, 8));
    }

    #[test]
    fn test_out_of_bounds_pixels_are_clipped() {
        let mut fb = FrameBuffer::new();
        Pixel(Point::new(-1, 0), BinaryColor::On).draw(&mut fb).unwrap();
        Pixel(Point::new(128, 0), BinaryColor::On).draw(&mut fb).unwrap();
        Pixel(Point::new(0, 64), BinaryColor::On).draw(&mut fb).unwrap();

        assert!(!fb.is_dirty());
        assert!(!fb.is_on(-1, 0));
    }

    #[test]
    fn test_unchanged_pixel_does_not_dirty() {
        let mut fb = FrameBuffer::new();
        fb.clear(BinaryColor::Off).unwrap();

        assert!(!fb.is_dirty());
    }

    #[test]
    fn test_flush_sends_only_dirty_region() {
        let mut fb = FrameBuffer::new();
        Line::new(Point::new(10, 20), Point::new(13, 20))
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
            .draw(&mut fb)
            .unwrap();
        Pixel(Point::new(11, 21), BinaryColor::On).draw(&mut fb).unwrap();

        let mut panel = RecordingPanel::default();
        fb.flush(&mut panel, Gray8::WHITE, Gray8::BLACK).unwrap();

        assert_eq!(panel.fills.len(), 1);
        let (area, colors) = &panel.fills[0];
        assert_eq!(*area, Rectangle::new(Point::new(10, 20), Size::new(4, 2)));
        assert_eq!(
            colors.as_slice(),
            &[
                Gray8::WHITE,
                Gray8::WHITE,
                Gray8::WHITE,
                Gray8::WHITE,
                Gray8::BLACK,
                Gray8::WHITE,
                Gray8::BLACK,
                Gray8::BLACK,
            ]
        );
        assert!(!fb.is_dirty());
    }

    /// Rejects the first `failures` writes, then records like [`RecordingPanel`].
    struct FlakyPanel {
        failures: usize,
        inner: RecordingPanel,
    }

    impl OriginDimensions for FlakyPanel {
        fn size(&self) -> Size {
            self.inner.size()
        }
    }

    impl DrawTarget for FlakyPanel {
        type Color = Gray8;
        type Error = &'static str;

        fn draw_iter<I>(&mut self, _pixels: I) -> Result<(), Self::Error>
        where
            I: IntoIterator<Item = Pixel<Self::Color>>,
        {
            Ok(())
        }

        fn fill_contiguous<I>(&mut self, area: &Rectangle, colors: I) -> Result<(), Self::Error>
        where
            I: IntoIterator<Item = Self::Color>,
        {
            if self.failures > 0 {
                self.failures -= 1;
                return Err("spi write failed");
            }
            let _ = self.inner.fill_contiguous(area, colors);
            Ok(())
        }
    }

    #[test]
    fn test_failed_flush_keeps_region_dirty() {
        let mut fb = FrameBuffer::new();
        Pixel(Point::new(5, 5), BinaryColor::On).draw(&mut fb).unwrap();

        let mut panel = FlakyPanel {
            failures: 1,
            inner: RecordingPanel::default(),
        };
        assert_eq!(
            fb.flush(&mut panel, Gray8::WHITE, Gray8::BLACK),
            Err("spi write failed")
        );
        assert!(fb.is_dirty());

        fb.flush(&mut panel, Gray8::WHITE, Gray8::BLACK).unwrap();

        assert_eq!(panel.inner.fills.len(), 1);
        assert_eq!(
            panel.inner.fills[0],
            (
                Rectangle::new(Point::new(5, 5), Size::new(1, 1)),
                [Gray8::WHITE].to_vec()
            )
        );
        assert!(!fb.is_dirty());
    }

    #[test]
    fn test_flush_when_clean_is_noop() {
        let mut fb = FrameBuffer::new();
        let mut panel = RecordingPanel::default();
        fb.flush(&mut panel, Gray8::WHITE, Gray8::BLACK).unwrap();

        assert!(panel.fills.is_empty());
    }

    #[test]
    fn test_invalidate_repaints_everything() {
        let mut fb = FrameBuffer::new();
        fb.invalidate();

        let mut panel = RecordingPanel::default();
        fb.flush(&mut panel, Gray8::WHITE, Gray8::BLACK).unwrap();

        assert_eq!(panel.fills[0].0, fb.bounding_box());
        assert_eq!(panel.fills[0].1.len(), 128 * 64);
    }

    #[test]
    fn test_fill_solid_clamps_to_frame() {
        let mut fb = FrameBuffer::new();
        fb.fill_solid(
            &Rectangle::new(Point::new(120, 60), Size::new(20, 20)),
            BinaryColor::On,
        )
        .unwrap();

        assert!(fb.is_on(127, 63));
        assert!(fb.is_on(120, 60));
        assert!(!fb.is_on(119, 60));
    }
}
