use joylock_fpro::osd::CharDisplay;
use joylock_fpro::FproResult;
use log::warn;

pub trait DisplayExt {
    fn write_str(&mut self, col: usize, row: usize, s: &str) -> FproResult<()>;
    fn clear_region(&mut self, col: usize, row: usize, len: usize) -> FproResult<()>;
}

impl<T: ?Sized + CharDisplay> DisplayExt for T {
    fn write_str(&mut self, col: usize, row: usize, s: &str) -> FproResult<()> {
        for (i, c) in s.chars().enumerate() {
            if c.is_ascii() {
                self.write_char(col + i, row, c)?;
            } else {
                warn!("Non-ASCII character: {}", c);
                self.write_char(col + i, row, '?')?;
            }
        }
        Ok(())
    }

    fn clear_region(&mut self, col: usize, row: usize, len: usize) -> FproResult<()> {
        for i in 0..len {
            self.write_char(col + i, row, ' ')?;
        }
        Ok(())
    }
}
