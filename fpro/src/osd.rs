//! On-screen display core driver.
//!
//! The OSD overlays an 80×30 character grid on the video output. Its
//! tile RAM lives in the video region of the address map, separate from
//! the slot bridge, so the driver owns its own mapping.

use crate::{FproError, FproResult};
use memmap2::{MmapOptions, MmapRaw};
use std::fmt::{Debug, Formatter};
use std::fs::OpenOptions;

/// The `CharDisplay` trait defines the interface for character-grid
/// render targets. Cells are written individually and never read back.
pub trait CharDisplay: Debug {
    fn columns(&self) -> usize;
    fn rows(&self) -> usize;
    fn write_char(&mut self, col: usize, row: usize, ch: char) -> FproResult<()>;
}

pub struct MmioOsd {
    mmap: MmapRaw,
}

impl MmioOsd {
    pub const COLUMNS: usize = 80;
    pub const ROWS: usize = 30;

    fn create(path: &str, base: u64) -> FproResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)?;

        let mmap = MmapOptions::new()
            .offset(base)
            .len(Self::COLUMNS * Self::ROWS * 4)
            .map_raw(&file)?;

        Ok(MmioOsd { mmap })
    }

    /// Maps the OSD tile RAM at the given physical address through
    /// `/dev/mem`.
    pub fn new_mem(base: u64) -> FproResult<Self> {
        Self::create("/dev/mem", base)
    }

    /// Blanks the whole grid.
    pub fn clear(&mut self) -> FproResult<()> {
        for row in 0..Self::ROWS {
            for col in 0..Self::COLUMNS {
                self.write_char(col, row, ' ')?;
            }
        }
        Ok(())
    }
}

impl Debug for MmioOsd {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "MmioOsd({:?})", self.mmap.as_ptr().addr())
    }
}

impl CharDisplay for MmioOsd {
    fn columns(&self) -> usize {
        Self::COLUMNS
    }

    fn rows(&self) -> usize {
        Self::ROWS
    }

    fn write_char(&mut self, col: usize, row: usize, ch: char) -> FproResult<()> {
        if col >= Self::COLUMNS || row >= Self::ROWS || !ch.is_ascii() {
            return Err(FproError::InvalidArgument);
        }

        let mmap = self.mmap.as_mut_ptr() as *mut u32;
        let cell_ptr = unsafe { mmap.add(row * Self::COLUMNS + col) };
        unsafe { cell_ptr.write_volatile(ch as u32 & 0x7F) };

        Ok(())
    }
}
