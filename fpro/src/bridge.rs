//! Memory-mapped access to the peripheral slot bridge.
//!
//! The programmable-logic bridge exposes every I/O core as a numbered
//! slot of 32 word-sized registers. The whole register file is mapped
//! once through `/dev/mem`; individual cores claim their slot and talk
//! to it through [Slot].

use crate::{FproError, FproResult};
use bitvec::vec::BitVec;
use memmap2::{MmapOptions, MmapRaw};
use std::fmt::{Debug, Formatter};
use std::fs::OpenOptions;
use std::sync::atomic::AtomicU8;

pub struct MmioBridge {
    mmap: MmapRaw,
    used_slots: BitVec<AtomicU8>,
}

impl MmioBridge {
    pub const SLOT_COUNT: usize = 64;
    pub const REGS_PER_SLOT: usize = 32;

    fn create(path: &str, base: u64) -> FproResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)?;

        let mmap = MmapOptions::new()
            .offset(base)
            .len(Self::SLOT_COUNT * Self::REGS_PER_SLOT * 4)
            .map_raw(&file)?;

        Ok(MmioBridge {
            mmap,
            used_slots: BitVec::repeat(false, Self::SLOT_COUNT),
        })
    }

    /// Maps the bridge register file at the given physical address
    /// through `/dev/mem`. Requires root (or `CAP_SYS_RAWIO`).
    pub fn new_mem(base: u64) -> FproResult<Self> {
        Self::create("/dev/mem", base)
    }

    /// Claims the slot at the given index.
    ///
    /// # Errors
    /// - `FproError::InvalidArgument` if the index is out of range.
    /// - `FproError::AlreadyInUse` if the slot was already claimed.
    pub fn slot(&self, index: usize) -> FproResult<Slot<'_>> {
        if index >= Self::SLOT_COUNT {
            return Err(FproError::InvalidArgument);
        }

        if self.used_slots[index] {
            return Err(FproError::AlreadyInUse);
        }

        self.used_slots.set_aliased(index, true);

        Ok(Slot {
            bridge: self,
            slot_index: index,
        })
    }

    fn raw_read_reg(&self, slot_index: usize, reg: usize) -> u32 {
        let mmap = self.mmap.as_ptr() as *const u32;
        let register_ptr = unsafe { mmap.add(slot_index * Self::REGS_PER_SLOT + reg) };
        unsafe { register_ptr.read_volatile() }
    }

    fn raw_write_reg(&self, slot_index: usize, reg: usize, value: u32) {
        let mmap = self.mmap.as_mut_ptr() as *mut u32;
        let register_ptr = unsafe { mmap.add(slot_index * Self::REGS_PER_SLOT + reg) };
        unsafe { register_ptr.write_volatile(value) };
    }
}

impl Debug for MmioBridge {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "MmioBridge({:?})", self.mmap.as_ptr().addr())
    }
}

/// A claimed bridge slot: 32 word-sized registers belonging to one
/// peripheral core. Released on drop.
pub struct Slot<'a> {
    bridge: &'a MmioBridge,
    slot_index: usize,
}

impl Slot<'_> {
    /// Reads the register at the given offset within the slot.
    pub fn read_reg(&self, reg: usize) -> FproResult<u32> {
        if reg >= MmioBridge::REGS_PER_SLOT {
            return Err(FproError::InvalidArgument);
        }
        Ok(self.bridge.raw_read_reg(self.slot_index, reg))
    }

    /// Writes the register at the given offset within the slot.
    pub fn write_reg(&self, reg: usize, value: u32) -> FproResult<()> {
        if reg >= MmioBridge::REGS_PER_SLOT {
            return Err(FproError::InvalidArgument);
        }
        self.bridge.raw_write_reg(self.slot_index, reg, value);
        Ok(())
    }
}

impl Debug for Slot<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}]", self.bridge, self.slot_index)
    }
}

impl Drop for Slot<'_> {
    fn drop(&mut self) {
        self.bridge.used_slots.set_aliased(self.slot_index, false);
    }
}
