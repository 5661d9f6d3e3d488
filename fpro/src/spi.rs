//! SPI master core driver.

use crate::bridge::Slot;
use crate::{FproError, FproResult};
use std::fmt::{Debug, Formatter};
use std::hint::spin_loop;

/// The `SpiBus` trait defines the interface for a byte-oriented SPI
/// master with software-controlled select lines.
pub trait SpiBus: Debug {
    /// Sets the serial clock frequency.
    fn set_frequency(&mut self, hz: u32) -> FproResult<()>;

    /// Sets the clock polarity and phase.
    fn set_mode(&mut self, cpol: bool, cpha: bool) -> FproResult<()>;

    /// Drives the given select line active (low).
    fn assert_select(&mut self, line: usize) -> FproResult<()>;

    /// Returns the given select line to inactive (high).
    fn deassert_select(&mut self, line: usize) -> FproResult<()>;

    /// Shifts one byte out and returns the byte shifted in.
    fn transfer(&mut self, byte: u8) -> FproResult<u8>;
}

/// SPI master core behind one bridge slot.
///
/// Register map:
/// - reg 0 (read): bits 7:0 received byte, bit 8 ready flag
/// - reg 1 (write): bits 15:0 clock divisor, bit 16 cpol, bit 17 cpha
/// - reg 2 (write): select lines, active low
/// - reg 3 (write): transmit byte; the write starts the exchange
pub struct MmioSpi<'a> {
    slot: Slot<'a>,
    dvsr: u32,
    cpol: bool,
    cpha: bool,
    ss_n: u32,
}

impl<'a> MmioSpi<'a> {
    const RD_DATA_REG: usize = 0;
    const CTRL_REG: usize = 1;
    const SS_REG: usize = 2;
    const WR_DATA_REG: usize = 3;

    const READY_BIT: u32 = 1 << 8;

    const SYS_CLK_HZ: u32 = 100_000_000;
    const SELECT_LINES: usize = 32;

    /// Claims the core: all select lines inactive, 1 MHz mode-0 clock.
    pub fn new(slot: Slot<'a>) -> FproResult<Self> {
        let mut spi = MmioSpi {
            slot,
            dvsr: 0,
            cpol: false,
            cpha: false,
            ss_n: u32::MAX,
        };
        spi.slot.write_reg(Self::SS_REG, spi.ss_n)?;
        spi.set_frequency(1_000_000)?;
        Ok(spi)
    }

    fn write_ctrl(&self) -> FproResult<()> {
        let mut value = self.dvsr & 0xFFFF;
        if self.cpol {
            value |= 1 << 16;
        }
        if self.cpha {
            value |= 1 << 17;
        }
        self.slot.write_reg(Self::CTRL_REG, value)
    }
}

impl Debug for MmioSpi<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "MmioSpi({:?})", self.slot)
    }
}

impl SpiBus for MmioSpi<'_> {
    fn set_frequency(&mut self, hz: u32) -> FproResult<()> {
        if hz == 0 || hz > Self::SYS_CLK_HZ / 2 {
            return Err(FproError::InvalidArgument);
        }
        // sclk = sys_clk / (2 * (dvsr + 1))
        self.dvsr = Self::SYS_CLK_HZ / (2 * hz) - 1;
        self.write_ctrl()
    }

    fn set_mode(&mut self, cpol: bool, cpha: bool) -> FproResult<()> {
        self.cpol = cpol;
        self.cpha = cpha;
        self.write_ctrl()
    }

    fn assert_select(&mut self, line: usize) -> FproResult<()> {
        if line >= Self::SELECT_LINES {
            return Err(FproError::InvalidArgument);
        }
        self.ss_n &= !(1 << line);
        self.slot.write_reg(Self::SS_REG, self.ss_n)
    }

    fn deassert_select(&mut self, line: usize) -> FproResult<()> {
        if line >= Self::SELECT_LINES {
            return Err(FproError::InvalidArgument);
        }
        self.ss_n |= 1 << line;
        self.slot.write_reg(Self::SS_REG, self.ss_n)
    }

    fn transfer(&mut self, byte: u8) -> FproResult<u8> {
        self.slot.write_reg(Self::WR_DATA_REG, byte as u32)?;
        loop {
            let status = self.slot.read_reg(Self::RD_DATA_REG)?;
            if status & Self::READY_BIT != 0 {
                return Ok((status & 0xFF) as u8);
            }
            spin_loop();
        }
    }
}
