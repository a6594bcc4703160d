//! TCS34725 RGB/clear sensor driver.
//!
//! Configured for ~103 ms integration at 16x gain. Readings come back
//! normalized: RGB as fractions of the clear count, clear as a fraction of
//! the integration full-scale, so the classifier thresholds live on one
//! 0..1 scale.

use embassy_time::Timer;
use embedded_hal_async::i2c::I2c;
use theralink_common::color::ColorSample;

use super::SensorError;

/// Fixed I²C address.
pub const ADDR: u8 = 0x29;

const CMD_BIT: u8 = 0x80;
const CMD_AUTOINC: u8 = 0x20;

const REG_ENABLE: u8 = 0x00;
const REG_ATIME: u8 = 0x01;
const REG_CONTROL: u8 = 0x0F;
const REG_ID: u8 = 0x12;
// Data sequence: C, R, G, B, 16 bits each, little-endian.
const REG_CDATAL: u8 = 0x14;

/// ATIME 0xD5: 43 cycles × 2.4 ms ≈ 103 ms integration.
const ATIME: u8 = 0xD5;
/// 16x analog gain.
const GAIN_16X: u8 = 0x02;
/// Clear-channel full scale at this ATIME: (256 − 0xD5) × 1024 counts.
const FULL_SCALE: f32 = 44_032.0;

/// TCS34725 driver.
pub struct Tcs34725;

impl Tcs34725 {
    /// Verify the device ID and power the sensor up.
    pub async fn probe<B: I2c>(bus: &mut B) -> Result<Self, SensorError> {
        let mut id = [0u8; 1];
        bus.write_read(ADDR, &[CMD_BIT | REG_ID], &mut id)
            .await
            .map_err(|_| SensorError::NotFound)?;
        // Datasheet IDs: 0x44 (TCS34721/25), 0x4D (TCS34723/27).
        if !(id[0] == 0x44 || id[0] == 0x4D) {
            return Err(SensorError::NotFound);
        }

        wr(bus, REG_ATIME, ATIME).await?;
        wr(bus, REG_CONTROL, GAIN_16X).await?;
        wr(bus, REG_ENABLE, 0x01).await?; // PON
        Timer::after_millis(3).await;
        wr(bus, REG_ENABLE, 0x03).await?; // PON | AEN
        // First conversion needs one integration period.
        Timer::after_millis(5).await;
        Ok(Self)
    }

    /// Raw 16-bit clear/red/green/blue counts.
    pub async fn read_raw<B: I2c>(
        &mut self,
        bus: &mut B,
    ) -> Result<(u16, u16, u16, u16), SensorError> {
        let mut d = [0u8; 8];
        bus.write_read(ADDR, &[CMD_BIT | CMD_AUTOINC | REG_CDATAL], &mut d)
            .await
            .map_err(|_| SensorError::Bus)?;
        let c = u16::from_le_bytes([d[0], d[1]]);
        let r = u16::from_le_bytes([d[2], d[3]]);
        let g = u16::from_le_bytes([d[4], d[5]]);
        let b = u16::from_le_bytes([d[6], d[7]]);
        Ok((c, r, g, b))
    }

    /// One normalized reading for the classifier.
    pub async fn read_norm<B: I2c>(
        &mut self,
        bus: &mut B,
    ) -> Result<ColorSample, SensorError> {
        let (c, r, g, b) = self.read_raw(bus).await?;
        let cf = f32::from(c).max(1.0);
        Ok(ColorSample {
            r: f32::from(r) / cf,
            g: f32::from(g) / cf,
            b: f32::from(b) / cf,
            c_norm: (f32::from(c) / FULL_SCALE).min(1.0),
        })
    }
}

async fn wr<B: I2c>(
    bus: &mut B,
    reg: u8,
    val: u8,
) -> Result<(), SensorError> {
    bus.write(ADDR, &[CMD_BIT | reg, val])
        .await
        .map_err(|_| SensorError::Bus)
}
