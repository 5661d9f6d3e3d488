//! General-purpose output core driver.

use crate::bridge::Slot;
use crate::FproResult;
use std::fmt::{Debug, Formatter};

/// The `GpoOutput` trait defines the interface for parallel output
/// ports written as a bitmask.
pub trait GpoOutput: Debug {
    fn write(&self, bits: u32) -> FproResult<()>;
}

/// Output core behind one bridge slot: a single data register.
pub struct MmioGpo<'a> {
    slot: Slot<'a>,
}

impl<'a> MmioGpo<'a> {
    const DATA_REG: usize = 0;

    pub fn new(slot: Slot<'a>) -> Self {
        MmioGpo { slot }
    }
}

impl Debug for MmioGpo<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "MmioGpo({:?})", self.slot)
    }
}

impl GpoOutput for MmioGpo<'_> {
    fn write(&self, bits: u32) -> FproResult<()> {
        self.slot.write_reg(Self::DATA_REG, bits)
    }
}
