//! MAX30100/MAX30102 pulse-oximeter front-end driver.
//!
//! The two parts share an address but differ in register map and sample
//! width, so the probe reads the part ID first and the rest of the driver
//! branches on it. Only the IR channel is consumed; the estimator does not
//! use red at all.

use embedded_hal_async::i2c::I2c;
use theralink_common::ppg::PulsePart;

use super::SensorError;

/// Shared I²C address of the MAX3010x family.
pub const ADDR: u8 = 0x57;

const REG_PART_ID: u8 = 0xFF;
const PART_ID_MAX30100: u8 = 0x11;
const PART_ID_MAX30102: u8 = 0x15;

// MAX30100 register map (16-bit samples, 16-deep FIFO).
const R100_FIFO_WR_PTR: u8 = 0x02;
const R100_FIFO_RD_PTR: u8 = 0x04;
const R100_FIFO_DATA: u8 = 0x05;
const R100_MODE_CONFIG: u8 = 0x06;
const R100_SPO2_CONFIG: u8 = 0x07;
const R100_LED_CONFIG: u8 = 0x09;

// MAX30102 register map (18-bit samples, 32-deep FIFO).
const R102_FIFO_WR_PTR: u8 = 0x04;
const R102_FIFO_RD_PTR: u8 = 0x06;
const R102_FIFO_DATA: u8 = 0x07;
const R102_FIFO_CONFIG: u8 = 0x08;
const R102_MODE_CONFIG: u8 = 0x09;
const R102_SPO2_CONFIG: u8 = 0x0A;
const R102_LED1_PA: u8 = 0x0C;
const R102_LED2_PA: u8 = 0x0D;

/// MAX3010x driver state: just the detected part.
pub struct Max3010x {
    part: PulsePart,
}

impl Max3010x {
    /// Probe the part ID and bring the front-end up at 100 Hz.
    pub async fn probe<B: I2c>(bus: &mut B) -> Result<Self, SensorError> {
        let mut id = [0u8; 1];
        bus.write_read(ADDR, &[REG_PART_ID], &mut id)
            .await
            .map_err(|_| SensorError::NotFound)?;
        let part = match id[0] {
            PART_ID_MAX30100 => PulsePart::Max30100,
            PART_ID_MAX30102 => PulsePart::Max30102,
            _ => return Err(SensorError::NotFound),
        };

        let dev = Self { part };
        dev.init(bus).await?;
        Ok(dev)
    }

    /// Detected front-end variant.
    pub const fn part(&self) -> PulsePart { self.part }

    async fn init<B: I2c>(
        &self,
        bus: &mut B,
    ) -> Result<(), SensorError> {
        match self.part {
            PulsePart::Max30100 => {
                // HR mode, 100 Hz, 1600 µs pulses, ~27 mA on both LEDs.
                wr(bus, R100_MODE_CONFIG, 0x02).await?;
                wr(bus, R100_SPO2_CONFIG, (1 << 2) | 0x03).await?;
                wr(bus, R100_LED_CONFIG, 0x88).await?;
                wr(bus, R100_FIFO_WR_PTR, 0).await?;
                wr(bus, R100_FIFO_RD_PTR, 0).await?;
            }
            PulsePart::Max30102 => {
                // Reset, then SpO2 mode (red + IR), 100 Hz, 411 µs / 18-bit,
                // FIFO rollover on, ~7 mA per LED.
                wr(bus, R102_MODE_CONFIG, 0x40).await?;
                wr(bus, R102_FIFO_CONFIG, 0x10).await?;
                wr(bus, R102_SPO2_CONFIG, 0x27).await?;
                wr(bus, R102_LED1_PA, 0x24).await?;
                wr(bus, R102_LED2_PA, 0x24).await?;
                wr(bus, R102_FIFO_WR_PTR, 0).await?;
                wr(bus, R102_FIFO_RD_PTR, 0).await?;
                wr(bus, R102_MODE_CONFIG, 0x03).await?;
            }
        }
        Ok(())
    }

    /// Pop the newest IR sample from the FIFO, draining any backlog.
    /// `Ok(None)` when no sample is ready this tick.
    pub async fn read_ir<B: I2c>(
        &mut self,
        bus: &mut B,
    ) -> Result<Option<f32>, SensorError> {
        let (wr_reg, rd_reg, depth) = match self.part {
            PulsePart::Max30100 => (R100_FIFO_WR_PTR, R100_FIFO_RD_PTR, 16u8),
            PulsePart::Max30102 => (R102_FIFO_WR_PTR, R102_FIFO_RD_PTR, 32u8),
        };
        let wr_ptr = rd8(bus, wr_reg).await?;
        let rd_ptr = rd8(bus, rd_reg).await?;
        let mut available = wr_ptr.wrapping_sub(rd_ptr) & (depth - 1);
        if available == 0 {
            return Ok(None);
        }

        let mut ir = 0f32;
        while available > 0 {
            ir = self.pop_sample(bus).await?;
            available -= 1;
        }
        Ok(Some(ir))
    }

    async fn pop_sample<B: I2c>(
        &self,
        bus: &mut B,
    ) -> Result<f32, SensorError> {
        match self.part {
            PulsePart::Max30100 => {
                // IR[15:8] IR[7:0] RED[15:8] RED[7:0]
                let mut d = [0u8; 4];
                bus.write_read(ADDR, &[R100_FIFO_DATA], &mut d)
                    .await
                    .map_err(|_| SensorError::Bus)?;
                Ok(f32::from(u16::from_be_bytes([d[0], d[1]])))
            }
            PulsePart::Max30102 => {
                // RED and IR, three bytes each, 18 significant bits.
                let mut d = [0u8; 6];
                bus.write_read(ADDR, &[R102_FIFO_DATA], &mut d)
                    .await
                    .map_err(|_| SensorError::Bus)?;
                let ir = (u32::from(d[3]) << 16 | u32::from(d[4]) << 8 | u32::from(d[5])) & 0x3_FFFF;
                Ok(ir as f32)
            }
        }
    }
}

async fn wr<B: I2c>(
    bus: &mut B,
    reg: u8,
    val: u8,
) -> Result<(), SensorError> {
    bus.write(ADDR, &[reg, val]).await.map_err(|_| SensorError::Bus)
}

async fn rd8<B: I2c>(
    bus: &mut B,
    reg: u8,
) -> Result<u8, SensorError> {
    let mut d = [0u8; 1];
    bus.write_read(ADDR, &[reg], &mut d)
        .await
        .map_err(|_| SensorError::Bus)?;
    Ok(d[0])
}
