//! The module for the main app state and logic.

use crate::config::Config;
use crate::direction::{Direction, DirectionDecoder};
use crate::history::ComboHistory;
use crate::stepper::{Rotation, Stepper};
use crate::utils::DisplayExt;
use joylock_fpro::gpo::GpoOutput;
use joylock_fpro::jstk::{Joystick, JoystickSample};
use joylock_fpro::osd::CharDisplay;
use joylock_fpro::ps2::KeyInput;
use joylock_fpro::FproResult;
use log::{debug, info, warn};
use std::time::{Duration, Instant};

pub const COMBO_MIN: usize = 4;
pub const COMBO_MAX: usize = 9;

/// Loop cadence while showing the menu or waiting locked.
const MENU_TICK: Duration = Duration::from_millis(30);
/// Tighter cadence while waiting on length or combo entry.
const ENTRY_TICK: Duration = Duration::from_millis(10);

const NOTICE_DURATION: Duration = Duration::from_millis(300);

// OSD layout (80x30 grid).
const COMBO_COL: usize = 5;
const COMBO_ROW: usize = 0;
const MENU_COL: usize = 5;
const MENU_ROW: usize = 2;
const STROKE_COL: usize = 40;
const STROKE_ROW: usize = 19;
const STATUS_COL: usize = 35;
const STATUS_ROW: usize = 20;
const NOTICE_COL: usize = 35;
const NOTICE_ROW: usize = 22;
const LABEL_COL: usize = 30;
const LABEL_ROW: usize = 24;
const PROMPT_COL: usize = 30;
const PROMPT_ROW: usize = 25;
const ENTRY_COL: usize = 30;
const ENTRY_ROW: usize = 26;

fn combo_length_from_key(ch: char) -> Option<usize> {
    let length = ch.to_digit(10)? as usize;
    (COMBO_MIN..=COMBO_MAX).contains(&length).then_some(length)
}

/// The main app state struct.
pub struct App<'a> {
    /// The current state of the app.
    state: AppState,
    /// The OSD the app renders to.
    osd: &'a mut dyn CharDisplay,
    /// The keyboard used for menu navigation.
    keyboard: &'a mut dyn KeyInput,
    /// The joystick used for combination entry.
    joystick: &'a mut dyn Joystick,
    /// The sequencer driving the bolt motor.
    stepper: Stepper<'a>,
    decoder: DirectionDecoder,
    /// Rolling record of the most recent direction events.
    history: ComboHistory,
    /// The target sequence. Its length is the combo length.
    combo: Vec<Direction>,
    locked: bool,
    notice: Option<Notice>,
}

/// Enum that can represent the different states of the application.
#[derive(Debug)]
enum AppState {
    /// The initial state, drawing the first full screen.
    Starting,
    /// Unlocked, showing the menu.
    Menu,
    /// Waiting for a single combo-length digit.
    AwaitingLength,
    /// Collecting joystick deflections for a new combo.
    Capturing {
        entered: Vec<Direction>,
        expected: usize,
        /// Set after each accepted entry; cleared once the stick has
        /// returned to center, so one deflection cannot register twice.
        awaiting_center: bool,
    },
    /// Locked, waiting for the correct sequence plus the unlock key.
    Locked,
}

#[derive(Debug)]
struct Notice {
    shown_at: Instant,
    width: usize,
}

impl<'a> App<'a> {
    /// Creates a new instance of the App.
    pub fn new(
        config: &Config,
        osd: &'a mut dyn CharDisplay,
        keyboard: &'a mut dyn KeyInput,
        joystick: &'a mut dyn Joystick,
        coils: &'a dyn GpoOutput,
    ) -> App<'a> {
        let combo = vec![
            Direction::Up,
            Direction::Down,
            Direction::Left,
            Direction::Right,
        ];
        let mut history = ComboHistory::new(combo.len());
        history.seed(&combo);

        App {
            state: AppState::Starting,
            osd,
            keyboard,
            joystick,
            stepper: Stepper::new(
                coils,
                config.motor.steps,
                Duration::from_millis(config.motor.step_delay_ms),
            ),
            decoder: DirectionDecoder::new(config.thresholds),
            history,
            combo,
            locked: false,
            notice: None,
        }
    }

    pub fn locked(&self) -> bool {
        self.locked
    }

    /// How long the control loop should sleep before the next tick.
    pub fn tick_interval(&self) -> Duration {
        match self.state {
            AppState::AwaitingLength | AppState::Capturing { .. } => ENTRY_TICK,
            _ => MENU_TICK,
        }
    }

    /// Runs one tick: samples the joystick, polls at most one keyboard
    /// character and steps the state machine.
    pub fn update(&mut self) -> FproResult<()> {
        self.expire_notice()?;

        let sample = self.joystick.sample()?;
        let event = self.decoder.decode(sample);
        let key = self.keyboard.try_read_char()?;

        match self.state {
            AppState::Starting => {
                info!("Starting lock system");
                self.draw_status()?;
                self.draw_combo_line()?;
                self.draw_menu()?;
                self.draw_history()?;
                self.log_menu();
                self.state = AppState::Menu;
            }
            AppState::Menu => {
                if let Some(dir) = event {
                    self.record(dir)?;
                }
                match key {
                    Some('1') => self.begin_length_entry()?,
                    Some('2') => {
                        self.clear_menu()?;
                        self.osd.write_str(LABEL_COL, LABEL_ROW, "Set new combo:")?;
                        self.begin_capture(self.combo.len())?;
                    }
                    Some('3') => self.lock()?,
                    _ => {}
                }
            }
            AppState::AwaitingLength => match key {
                Some(ch) => {
                    if let Some(length) = combo_length_from_key(ch) {
                        info!("New combo length: {}", length);
                        self.begin_capture(length)?;
                    } else {
                        warn!("Invalid length.");
                        self.show_notice("Invalid length.")?;
                    }
                }
                None => {}
            },
            AppState::Capturing { .. } => self.step_capture(sample, event)?,
            AppState::Locked => {
                if let Some(dir) = event {
                    self.record(dir)?;
                }
                match key {
                    Some('3') => self.try_unlock()?,
                    Some('1') | Some('2') => {
                        // Reprogramming requires unlocking first.
                        debug!("Menu key ignored while locked");
                    }
                    _ => {}
                }
            }
        }

        Ok(())
    }

    /// Logs one direction event into the rolling history. The lock is
    /// always listening, locked or not, so the correct sequence can be
    /// walked in before pressing the unlock key.
    fn record(&mut self, dir: Direction) -> FproResult<()> {
        info!("Joystick: {}", dir.to_char());
        self.history.append(dir);
        self.draw_history()
    }

    fn begin_length_entry(&mut self) -> FproResult<()> {
        info!("Enter new length (4-9): ");
        self.clear_menu()?;
        self.osd.clear_region(LABEL_COL, LABEL_ROW, 30)?;
        self.osd.clear_region(PROMPT_COL, PROMPT_ROW, 30)?;
        self.osd.write_str(PROMPT_COL, PROMPT_ROW, "Enter new length (4-9):")?;
        self.osd.clear_region(ENTRY_COL, ENTRY_ROW, 30)?;
        self.state = AppState::AwaitingLength;
        Ok(())
    }

    fn begin_capture(&mut self, expected: usize) -> FproResult<()> {
        self.osd.clear_region(PROMPT_COL, PROMPT_ROW, 30)?;
        self.osd.write_str(PROMPT_COL, PROMPT_ROW, "Enter ")?;
        self.osd
            .write_char(PROMPT_COL + 6, PROMPT_ROW, (b'0' + expected as u8) as char)?;
        self.osd.write_str(PROMPT_COL + 8, PROMPT_ROW, "directions")?;
        self.osd.clear_region(ENTRY_COL, ENTRY_ROW, 30)?;
        self.state = AppState::Capturing {
            entered: Vec::with_capacity(expected),
            expected,
            awaiting_center: false,
        };
        Ok(())
    }

    /// Advances a combo capture by one tick. An edge event is accepted
    /// only once the stick has been seen centered since the previous
    /// accepted entry.
    fn step_capture(
        &mut self,
        sample: JoystickSample,
        event: Option<Direction>,
    ) -> FproResult<()> {
        let centered = sample.plausible() && self.decoder.classify(sample).is_none();

        let AppState::Capturing {
            entered,
            expected,
            awaiting_center,
        } = &mut self.state
        else {
            return Ok(());
        };
        let expected = *expected;

        if centered {
            *awaiting_center = false;
        }

        let accepted = match event {
            Some(dir) if !*awaiting_center => {
                debug!("Captured: {}", dir.to_char());
                entered.push(dir);
                *awaiting_center = true;
                Some(entered.clone())
            }
            _ => None,
        };

        let Some(entered) = accepted else {
            return Ok(());
        };

        self.draw_capture_progress(&entered, expected)?;

        if entered.len() == expected {
            self.commit_combo(entered)?;
        }

        Ok(())
    }

    /// Installs a freshly captured combo as the target and seeds the
    /// history with it. Stray keystrokes pressed during the capture are
    /// drained so they cannot leak into the menu.
    fn commit_combo(&mut self, combo: Vec<Direction>) -> FproResult<()> {
        self.history.reset(combo.len());
        self.history.seed(&combo);
        self.combo = combo;
        self.drain_keyboard()?;

        info!("New combo set.");
        self.log_menu();
        self.clear_menu()?;
        self.osd.clear_region(LABEL_COL, LABEL_ROW, 30)?;
        self.draw_menu()?;
        self.draw_combo_line()?;
        self.draw_history()?;
        self.state = AppState::Menu;
        Ok(())
    }

    fn lock(&mut self) -> FproResult<()> {
        info!("LOCKING...");
        self.osd.write_str(STROKE_COL, STROKE_ROW, "LOCKING...  ")?;

        self.history.invalidate();
        self.stepper.run(Rotation::Clockwise)?;
        self.locked = true;

        self.osd.clear_region(STROKE_COL, STROKE_ROW, 12)?;
        self.draw_status()?;
        self.draw_history()?;
        // Do not leave the combination on screen while locked.
        self.osd.clear_region(COMBO_COL, COMBO_ROW, 34)?;
        self.clear_menu()?;
        self.draw_unlock_prompt()?;
        info!("System locked.");
        self.state = AppState::Locked;
        Ok(())
    }

    fn try_unlock(&mut self) -> FproResult<()> {
        if !self.history.matches(&self.combo) {
            warn!("Wrong combo.");
            self.show_notice("Wrong combo.")?;
            return Ok(());
        }

        info!("UNLOCKING...");
        self.osd.write_str(STROKE_COL, STROKE_ROW, "UNLOCKING...")?;
        self.stepper.run(Rotation::CounterClockwise)?;
        self.locked = false;

        self.osd.clear_region(STROKE_COL, STROKE_ROW, 12)?;
        self.draw_status()?;
        self.log_menu();
        self.clear_menu()?;
        self.draw_menu()?;
        self.draw_combo_line()?;
        self.draw_history()?;
        self.state = AppState::Menu;
        Ok(())
    }

    fn drain_keyboard(&mut self) -> FproResult<()> {
        while self.keyboard.try_read_char()?.is_some() {}
        Ok(())
    }

    fn show_notice(&mut self, text: &str) -> FproResult<()> {
        if let Some(old) = self.notice.take() {
            self.osd.clear_region(NOTICE_COL, NOTICE_ROW, old.width)?;
        }
        self.osd.write_str(NOTICE_COL, NOTICE_ROW, text)?;
        self.notice = Some(Notice {
            shown_at: Instant::now(),
            width: text.len(),
        });
        Ok(())
    }

    fn expire_notice(&mut self) -> FproResult<()> {
        match &self.notice {
            Some(notice) if notice.shown_at.elapsed() >= NOTICE_DURATION => {
                let width = notice.width;
                self.notice = None;
                self.osd.clear_region(NOTICE_COL, NOTICE_ROW, width)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn log_menu(&self) {
        let combo: String = self
            .combo
            .iter()
            .flat_map(|dir| [dir.to_char(), ' '])
            .collect();
        info!("Current combo ({}): {}", self.combo.len(), combo.trim_end());
        info!("--- Lock System Menu ---");
        info!("1: Set combo length (4-9) and define combo");
        info!("2: Set new combination");
        info!("3: Lock the system");
    }

    fn draw_status(&mut self) -> FproResult<()> {
        let msg = if self.locked {
            "Lock Status: Locked    "
        } else {
            "Lock Status: Unlocked  "
        };
        self.osd.write_str(STATUS_COL, STATUS_ROW, msg)
    }

    fn draw_combo_line(&mut self) -> FproResult<()> {
        self.osd.clear_region(COMBO_COL, COMBO_ROW, 34)?;
        self.osd.write_str(COMBO_COL, COMBO_ROW, "Current combo:")?;
        for (i, dir) in self.combo.iter().enumerate() {
            self.osd
                .write_char(COMBO_COL + 15 + i * 2, COMBO_ROW, dir.to_char())?;
        }
        Ok(())
    }

    fn draw_menu(&mut self) -> FproResult<()> {
        self.osd.write_str(MENU_COL, MENU_ROW, "--- Lock System Menu ---")?;
        self.osd
            .write_str(MENU_COL, MENU_ROW + 1, "1: Set combo length (4-9)")?;
        self.osd
            .write_str(MENU_COL, MENU_ROW + 2, "2: Set new combination")?;
        self.osd
            .write_str(MENU_COL, MENU_ROW + 3, "3: Lock the system")?;
        Ok(())
    }

    fn draw_unlock_prompt(&mut self) -> FproResult<()> {
        self.osd.write_str(MENU_COL, MENU_ROW, "--- Lock System Menu ---")?;
        self.osd
            .write_str(MENU_COL, MENU_ROW + 1, "Enter correct combination")?;
        self.osd
            .write_str(MENU_COL, MENU_ROW + 2, "3: Unlock the system")?;
        Ok(())
    }

    fn clear_menu(&mut self) -> FproResult<()> {
        for row in 0..=4 {
            self.osd.clear_region(MENU_COL, MENU_ROW + row, 30)?;
        }
        Ok(())
    }

    fn draw_history(&mut self) -> FproResult<()> {
        self.osd.clear_region(PROMPT_COL, PROMPT_ROW, 30)?;
        self.osd
            .write_str(PROMPT_COL, PROMPT_ROW, "Current Combination Length: ")?;
        self.osd.write_char(
            PROMPT_COL + 28,
            PROMPT_ROW,
            (b'0' + self.history.capacity() as u8) as char,
        )?;

        self.osd.clear_region(ENTRY_COL, ENTRY_ROW, 2 * COMBO_MAX)?;
        for (i, slot) in self.history.entries().into_iter().enumerate() {
            let ch = slot.map_or('-', Direction::to_char);
            self.osd.write_char(ENTRY_COL + i * 2, ENTRY_ROW, ch)?;
        }
        Ok(())
    }

    fn draw_capture_progress(
        &mut self,
        entered: &[Direction],
        expected: usize,
    ) -> FproResult<()> {
        self.osd.clear_region(ENTRY_COL, ENTRY_ROW, expected * 2)?;
        for (i, dir) in entered.iter().enumerate() {
            self.osd
                .write_char(ENTRY_COL + i * 2, ENTRY_ROW, dir.to_char())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direction::Direction::*;
    use joylock_fpro::FproError;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::rc::Rc;

    const CENTER: JoystickSample = JoystickSample { x: 500, y: 500 };

    fn sample_for(dir: Direction) -> JoystickSample {
        match dir {
            Up => JoystickSample { x: 500, y: 900 },
            Down => JoystickSample { x: 500, y: 100 },
            Left => JoystickSample { x: 50, y: 500 },
            Right => JoystickSample { x: 900, y: 500 },
        }
    }

    fn test_config() -> Config {
        let mut config = Config::default();
        config.motor.steps = 4;
        config.motor.step_delay_ms = 0;
        config
    }

    /// Joystick fed from a script; advances the shared tick counter so
    /// the keyboard fake knows when each press becomes available.
    #[derive(Debug)]
    struct ScriptedJoystick {
        samples: VecDeque<JoystickSample>,
        tick: Rc<Cell<usize>>,
    }

    impl Joystick for ScriptedJoystick {
        fn sample(&mut self) -> FproResult<JoystickSample> {
            self.tick.set(self.tick.get() + 1);
            Ok(self.samples.pop_front().unwrap_or(CENTER))
        }
    }

    /// Keyboard FIFO whose presses arrive at scripted ticks. Polling
    /// past the arrival tick pops them; earlier polls see nothing, so
    /// draining cannot swallow presses from the future.
    #[derive(Debug)]
    struct ScriptedKeys {
        presses: VecDeque<(usize, char)>,
        tick: Rc<Cell<usize>>,
    }

    impl KeyInput for ScriptedKeys {
        fn try_read_char(&mut self) -> FproResult<Option<char>> {
            match self.presses.front() {
                Some(&(at, ch)) if at <= self.tick.get() => {
                    self.presses.pop_front();
                    Ok(Some(ch))
                }
                _ => Ok(None),
            }
        }
    }

    #[derive(Debug)]
    struct GridDisplay {
        cells: Vec<Vec<char>>,
    }

    impl GridDisplay {
        fn new() -> Self {
            GridDisplay {
                cells: vec![vec![' '; 80]; 30],
            }
        }

        fn row_text(&self, row: usize) -> String {
            let text: String = self.cells[row].iter().collect();
            text.trim().to_string()
        }
    }

    impl CharDisplay for GridDisplay {
        fn columns(&self) -> usize {
            80
        }

        fn rows(&self) -> usize {
            30
        }

        fn write_char(&mut self, col: usize, row: usize, ch: char) -> FproResult<()> {
            if col >= self.columns() || row >= self.rows() {
                return Err(FproError::InvalidArgument);
            }
            self.cells[row][col] = ch;
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct RecordingCoils {
        writes: RefCell<Vec<u32>>,
    }

    impl GpoOutput for RecordingCoils {
        fn write(&self, bits: u32) -> FproResult<()> {
            self.writes.borrow_mut().push(bits);
            Ok(())
        }
    }

    struct Outcome {
        locked: bool,
        grid: GridDisplay,
        coil_writes: Vec<u32>,
    }

    /// Builds one tick-aligned input script: every entry adds exactly
    /// one joystick sample, and key presses are pinned to the tick of
    /// the sample they accompany.
    #[derive(Default)]
    struct Script {
        samples: Vec<JoystickSample>,
        presses: Vec<(usize, char)>,
    }

    impl Script {
        fn idle(mut self, ticks: usize) -> Self {
            for _ in 0..ticks {
                self.samples.push(CENTER);
            }
            self
        }

        fn key(mut self, ch: char) -> Self {
            self.samples.push(CENTER);
            self.presses.push((self.samples.len(), ch));
            self
        }

        /// A press arriving while the previous tick's input is still
        /// being processed (no tick of its own).
        fn key_during(mut self, ch: char) -> Self {
            self.presses.push((self.samples.len(), ch));
            self
        }

        fn enter(mut self, dirs: &[Direction]) -> Self {
            for &dir in dirs {
                self.samples.push(sample_for(dir));
                self.samples.push(CENTER);
            }
            self
        }

        fn run(self) -> Outcome {
            let config = test_config();
            let ticks = self.samples.len() + 2;
            let tick = Rc::new(Cell::new(0));
            let mut joystick = ScriptedJoystick {
                samples: self.samples.into(),
                tick: tick.clone(),
            };
            let mut keyboard = ScriptedKeys {
                presses: self.presses.into(),
                tick,
            };
            let mut grid = GridDisplay::new();
            let coils = RecordingCoils::default();

            let locked = {
                let mut app = App::new(&config, &mut grid, &mut keyboard, &mut joystick, &coils);
                for _ in 0..ticks {
                    app.update().unwrap();
                }
                app.locked()
            };

            Outcome {
                locked,
                grid,
                coil_writes: coils.writes.into_inner(),
            }
        }
    }

    /// Script with the startup tick already burned.
    fn script() -> Script {
        Script::default().idle(1)
    }

    #[test]
    fn startup_draws_menu_and_status() {
        let outcome = script().run();
        assert!(!outcome.locked);
        assert_eq!(outcome.grid.row_text(2), "--- Lock System Menu ---");
        assert_eq!(outcome.grid.row_text(20), "Lock Status: Unlocked");
        assert!(outcome.grid.row_text(0).starts_with("Current combo:"));
        assert_eq!(
            outcome.grid.row_text(25),
            "Current Combination Length: 4"
        );
    }

    #[test]
    fn locking_engages_motor_and_hides_combo() {
        let outcome = script().key('3').run();
        assert!(outcome.locked);
        assert_eq!(outcome.coil_writes, vec![0x01, 0x02, 0x04, 0x08, 0x00]);
        assert_eq!(outcome.grid.row_text(20), "Lock Status: Locked");
        assert_eq!(outcome.grid.row_text(3), "Enter correct combination");
        // The combination must not stay on screen while locked.
        assert_eq!(outcome.grid.row_text(0), "");
    }

    #[test]
    fn unlocks_with_correct_combo() {
        let outcome = script()
            .key('3')
            .enter(&[Up, Down, Left, Right])
            .key('3')
            .run();
        assert!(!outcome.locked);
        assert_eq!(outcome.grid.row_text(20), "Lock Status: Unlocked");
        // One lock stroke and one unlock stroke, both released.
        assert_eq!(outcome.coil_writes.len(), 10);
        assert_eq!(outcome.coil_writes.last(), Some(&0x00));
    }

    #[test]
    fn wrong_combo_stays_locked() {
        let outcome = script()
            .key('3')
            .enter(&[Up, Down, Left, Left])
            .key('3')
            .run();
        assert!(outcome.locked);
        assert_eq!(outcome.grid.row_text(22), "Wrong combo.");
        // Only the lock stroke ran.
        assert_eq!(outcome.coil_writes.len(), 5);
    }

    #[test]
    fn relocking_requires_a_fresh_entry() {
        // The history is seeded with the combo at startup, but locking
        // invalidates it, so an immediate unlock attempt must fail.
        let outcome = script().key('3').key('3').run();
        assert!(outcome.locked);
    }

    #[test]
    fn reprogrammed_combo_unlocks() {
        let combo = [Left, Left, Right, Right];
        let outcome = script()
            .key('2')
            .enter(&combo)
            .key('3')
            .enter(&combo)
            .key('3')
            .run();
        assert!(!outcome.locked);
    }

    #[test]
    fn old_combo_is_rejected_after_length_change() {
        let outcome = script()
            .key('1')
            .key('6')
            .enter(&[Up, Down, Left, Right, Up, Down])
            .key('3')
            .enter(&[Up, Down, Left, Right])
            .key('3')
            .run();
        assert!(outcome.locked);
    }

    #[test]
    fn new_length_combo_unlocks() {
        let combo = [Up, Down, Left, Right, Up, Down];
        let outcome = script()
            .key('1')
            .key('6')
            .enter(&combo)
            .key('3')
            .enter(&combo)
            .key('3')
            .run();
        assert!(!outcome.locked);
    }

    #[test]
    fn invalid_length_digit_is_reprompted() {
        let combo = [Up, Up, Up, Up, Up];
        let outcome = script()
            .key('1')
            .key('0')
            .key('5')
            .enter(&combo)
            .key('3')
            .enter(&combo)
            .key('3')
            .run();
        assert!(!outcome.locked);
        assert_eq!(outcome.grid.row_text(22), "Invalid length.");
    }

    #[test]
    fn stray_keys_during_capture_are_discarded() {
        let outcome = script()
            .key('2')
            .enter(&[Left, Left])
            .key_during('3')
            .enter(&[Right, Right])
            .idle(2)
            .run();
        // The '3' pressed mid-capture must not lock after the commit.
        assert!(!outcome.locked);
        assert!(outcome.coil_writes.is_empty());
    }

    #[test]
    fn menu_keys_are_ignored_while_locked() {
        let outcome = script()
            .key('3')
            .key('1')
            .key('2')
            .enter(&[Up, Down, Left, Right])
            .key('3')
            .run();
        // '1'/'2' must not have opened a capture flow; the entry above
        // went into the history and the unlock succeeded.
        assert!(!outcome.locked);
    }

    #[test]
    fn length_keys_accept_the_full_range() {
        assert_eq!(combo_length_from_key('4'), Some(4));
        assert_eq!(combo_length_from_key('9'), Some(9));
        assert_eq!(combo_length_from_key('3'), None);
        assert_eq!(combo_length_from_key('0'), None);
        assert_eq!(combo_length_from_key('x'), None);
    }
}
