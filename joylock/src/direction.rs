//! Decoding of raw joystick samples into discrete direction events.

use crate::config::Thresholds;
use joylock_fpro::jstk::JoystickSample;

/// A discrete joystick deflection.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Converts the [Direction] to its display character.
    pub fn to_char(self) -> char {
        match self {
            Direction::Up => 'U',
            Direction::Down => 'D',
            Direction::Left => 'L',
            Direction::Right => 'R',
        }
    }
}

/// Turns continuously polled analog samples into edge-triggered
/// direction events.
///
/// The caller re-samples the stick every tick, so a held deflection
/// would repeat forever; the decoder latches the last emitted direction
/// and suppresses it until the stick returns to center.
#[derive(Debug)]
pub struct DirectionDecoder {
    thresholds: Thresholds,
    last: Option<Direction>,
}

impl DirectionDecoder {
    pub fn new(thresholds: Thresholds) -> Self {
        DirectionDecoder {
            thresholds,
            last: None,
        }
    }

    /// Classifies one sample without touching the latch.
    ///
    /// The horizontal axis is checked first, so a hard diagonal always
    /// resolves to Left/Right. Implausible frames and the dead zone
    /// both classify as no direction.
    pub fn classify(&self, sample: JoystickSample) -> Option<Direction> {
        if !sample.plausible() {
            return None;
        }

        let t = &self.thresholds;
        if sample.x > t.x_right {
            Some(Direction::Right)
        } else if sample.x < t.x_left {
            Some(Direction::Left)
        } else if sample.y > t.y_up {
            Some(Direction::Up)
        } else if sample.y < t.y_down {
            Some(Direction::Down)
        } else {
            None
        }
    }

    /// Decodes one sample into at most one direction event.
    pub fn decode(&mut self, sample: JoystickSample) -> Option<Direction> {
        if !sample.plausible() {
            // A glitched frame is not a return to center.
            return None;
        }

        match self.classify(sample) {
            Some(dir) if self.last != Some(dir) => {
                self.last = Some(dir);
                Some(dir)
            }
            Some(_) => None,
            None => {
                self.last = None;
                None
            }
        }
    }
}
