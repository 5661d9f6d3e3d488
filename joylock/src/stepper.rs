//! 4-phase stepper motor sequencer.

use joylock_fpro::gpo::GpoOutput;
use joylock_fpro::FproResult;
use std::fmt::{Debug, Formatter};
use std::thread;
use std::time::Duration;

/// Rotation sense for one full stroke.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Rotation {
    Clockwise,
    CounterClockwise,
}

/// Drives the motor coils one phase at a time through a [GpoOutput].
///
/// A stroke blocks for `steps * step_delay`; the delay bounds the
/// motor's slew rate. There is no mid-stroke cancellation: a half-step
/// would leave the bolt in an undefined position.
pub struct Stepper<'a> {
    coils: &'a dyn GpoOutput,
    phase: usize,
    steps: u32,
    step_delay: Duration,
}

impl<'a> Stepper<'a> {
    const PHASES: [u32; 4] = [0x01, 0x02, 0x04, 0x08];

    pub fn new(coils: &'a dyn GpoOutput, steps: u32, step_delay: Duration) -> Self {
        Stepper {
            coils,
            phase: 0,
            steps,
            step_delay,
        }
    }

    /// Runs one full stroke, then de-energizes the coils so the motor
    /// does not sit on holding current. The phase index persists across
    /// strokes.
    pub fn run(&mut self, rotation: Rotation) -> FproResult<()> {
        let count = Self::PHASES.len();
        for _ in 0..self.steps {
            self.coils.write(Self::PHASES[self.phase])?;
            self.phase = match rotation {
                Rotation::Clockwise => (self.phase + 1) % count,
                Rotation::CounterClockwise => (self.phase + count - 1) % count,
            };
            thread::sleep(self.step_delay);
        }
        self.coils.write(0x00)
    }
}

impl Debug for Stepper<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Stepper({:?}, {} steps)", self.coils, self.steps)
    }
}
