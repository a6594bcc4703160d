//! SSD1306 text rendering of the kiosk display lines.
//!
//! The 128x64 panel shows the four bounded lines from
//! [`theralink_common::display::DisplayLines`]; rendering happens only
//! when the lines changed, at most a few times per second. The panel sits
//! alone on I²C bus 1.

use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};
use embedded_hal::i2c::I2c;
use profont::PROFONT_9_POINT;
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::{I2CDisplayInterface, Ssd1306};

/// Vertical pitch between lines.
const LINE_PITCH: i32 = 16;

/// The kiosk OLED.
pub struct Oled<B: I2c> {
    display: Ssd1306<I2CInterface<B>, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>,
}

impl<B: I2c> Oled<B> {
    /// Initialize the panel. Failure means the kiosk runs headless behind
    /// the web mirror.
    pub fn new(bus: B) -> Result<Self, ()> {
        let interface = I2CDisplayInterface::new(bus);
        let mut display = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();
        display.init().map_err(|_| ())?;
        Ok(Self { display })
    }

    /// Redraw all four lines and flush the frame.
    pub fn render(
        &mut self,
        lines: [&str; 4],
    ) {
        let style = MonoTextStyle::new(&PROFONT_9_POINT, BinaryColor::On);
        self.display.clear_buffer();
        for (i, line) in lines.iter().enumerate() {
            let _ = Text::with_baseline(
                line,
                Point::new(0, i as i32 * LINE_PITCH),
                style,
                Baseline::Top,
            )
            .draw(&mut self.display);
        }
        let _ = self.display.flush();
    }
}
