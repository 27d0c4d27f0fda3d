//! Status lines on the unit's LCD.

use alloc::{
    format,
    string::String,
};

use embedded_graphics::{
    mono_font::{
        MonoTextStyle,
        ascii::FONT_6X10,
    },
    pixelcolor::Rgb565,
    prelude::*,
    primitives::{
        PrimitiveStyle,
        Rectangle,
    },
    text::{
        Baseline,
        Text,
    },
};

const LEFT: i32 = 10;
const LINE_HEIGHT: u32 = 10;
const LINE_WIDTH: u32 = 300;
const REFLECTOR_ROW: i32 = 10;
const MOTOR_ROW: i32 = 20;

pub fn reflector_line(top: u16, bottom: u16) -> String {
    format!("photo reflector: top={top:4}, bottom={bottom:4}")
}

pub fn motor_line(power: u8) -> String {
    format!("motor: power={power:4}")
}

/// Redraws single status lines in place on a dark background.
pub struct StatusPanel {
    text: MonoTextStyle<'static, Rgb565>,
    background: PrimitiveStyle<Rgb565>,
}

impl Default for StatusPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusPanel {
    pub fn new() -> Self {
        Self {
            text: MonoTextStyle::new(&FONT_6X10, Rgb565::WHITE),
            background: PrimitiveStyle::with_fill(Rgb565::BLACK),
        }
    }

    pub fn clear<D>(&self, display: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        display.clear(Rgb565::BLACK)
    }

    pub fn show_reflectors<D>(&self, display: &mut D, top: u16, bottom: u16) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        self.draw_line(display, REFLECTOR_ROW, &reflector_line(top, bottom))
    }

    pub fn show_motor<D>(&self, display: &mut D, power: u8) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        self.draw_line(display, MOTOR_ROW, &motor_line(power))
    }

    fn draw_line<D>(&self, display: &mut D, row: i32, line: &str) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        Rectangle::new(Point::new(LEFT, row), Size::new(LINE_WIDTH, LINE_HEIGHT))
            .into_styled(self.background)
            .draw(display)?;
        Text::with_baseline(line, Point::new(LEFT, row), self.text, Baseline::Top)
            .draw(display)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloc::{
        vec,
        vec::Vec,
    };
    use core::convert::Infallible;

    use super::*;

    const W: u32 = 320;
    const H: u32 = 40;

    struct Canvas(Vec<Rgb565>);

    impl Canvas {
        fn new() -> Self {
            Self(vec![Rgb565::CSS_ORANGE; (W * H) as usize])
        }

        fn lit_in_rows(&self, rows: core::ops::Range<u32>) -> usize {
            rows.flat_map(|y| (0..W).map(move |x| (x, y)))
                .filter(|&(x, y)| self.0[(y * W + x) as usize] == Rgb565::WHITE)
                .count()
        }
    }

    impl OriginDimensions for Canvas {
        fn size(&self) -> Size {
            Size::new(W, H)
        }
    }

    impl DrawTarget for Canvas {
        type Color = Rgb565;
        type Error = Infallible;

        fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Infallible>
        where
            I: IntoIterator<Item = Pixel<Rgb565>>,
        {
            for Pixel(point, color) in pixels {
                if let (Ok(x), Ok(y)) = (u32::try_from(point.x), u32::try_from(point.y)) {
                    if x < W && y < H {
                        self.0[(y * W + x) as usize] = color;
                    }
                }
            }
            Ok(())
        }
    }

    /// Bus that fails every transfer.
    struct Unplugged;

    impl OriginDimensions for Unplugged {
        fn size(&self) -> Size {
            Size::new(W, H)
        }
    }

    impl DrawTarget for Unplugged {
        type Color = Rgb565;
        type Error = &'static str;

        fn draw_iter<I>(&mut self, _pixels: I) -> Result<(), Self::Error>
        where
            I: IntoIterator<Item = Pixel<Rgb565>>,
        {
            Err("spi write failed")
        }
    }

    #[test]
    fn draw_errors_reach_caller() {
        let panel = StatusPanel::new();
        assert_eq!(panel.show_motor(&mut Unplugged, 10), Err("spi write failed"));
        assert_eq!(panel.show_reflectors(&mut Unplugged, 1, 2), Err("spi write failed"));
    }

    #[test]
    fn lines_pad_numbers() {
        assert_eq!(reflector_line(12, 3500), "photo reflector: top=  12, bottom=3500");
        assert_eq!(motor_line(7), "motor: power=   7");
    }

    #[test]
    fn lines_land_in_their_rows() {
        let panel = StatusPanel::new();
        let mut canvas = Canvas::new();
        panel.clear(&mut canvas).unwrap();

        panel.show_motor(&mut canvas, 120).unwrap();
        assert_eq!(canvas.lit_in_rows(10..20), 0);
        assert!(canvas.lit_in_rows(20..30) > 0);

        panel.show_reflectors(&mut canvas, 1, 2).unwrap();
        assert!(canvas.lit_in_rows(10..20) > 0);
    }

    #[test]
    fn redraw_replaces_old_text() {
        let panel = StatusPanel::new();
        let mut canvas = Canvas::new();
        panel.clear(&mut canvas).unwrap();

        panel.show_motor(&mut canvas, 255).unwrap();
        let mut fresh = Canvas::new();
        panel.clear(&mut fresh).unwrap();
        panel.show_motor(&mut fresh, 0).unwrap();

        panel.show_motor(&mut canvas, 0).unwrap();
        assert_eq!(canvas.0, fresh.0);
    }
}
