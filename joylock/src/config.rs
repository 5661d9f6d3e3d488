use dotenv::var;
use serde::{Deserialize, Serialize};
use std::env::var_os;
use std::ffi::OsStr;
use std::path::Path;

/// Tuning configuration. The combination itself is deliberately not
/// stored here; it lives only in memory.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    pub thresholds: Thresholds,
    pub motor: MotorConfig,
}

/// Joystick deflection thresholds on the 10-bit axes. Readings between
/// `x_left`..=`x_right` and `y_down`..=`y_up` are the dead zone.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct Thresholds {
    pub x_right: u16,
    pub x_left: u16,
    pub y_up: u16,
    pub y_down: u16,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct MotorConfig {
    /// Micro-steps per lock/unlock stroke.
    pub steps: u32,
    /// Delay between micro-steps, in milliseconds.
    pub step_delay_ms: u64,
}

impl Config {
    pub fn try_load() -> Option<Self> {
        let config_str = var_os("CONFIG_FILE");
        let config_str: &OsStr = config_str.as_deref().unwrap_or(OsStr::new("config.json"));
        let config_path = Path::new(config_str);
        if config_path.exists() {
            let file = std::fs::File::open(config_path).ok()?;
            let reader = std::io::BufReader::new(file);
            serde_json::from_reader(reader).ok()
        } else {
            None
        }
    }

    pub fn save(&self) -> std::io::Result<()> {
        let config_str = var("CONFIG_FILE").unwrap_or_else(|_| "config.json".to_string());
        let config_path = Path::new(&config_str);
        let file = std::fs::File::create(config_path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer(writer, self)?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            thresholds: Thresholds::default(),
            motor: MotorConfig::default(),
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            x_right: 750,
            x_left: 100,
            y_up: 800,
            y_down: 250,
        }
    }
}

impl Default for MotorConfig {
    fn default() -> Self {
        MotorConfig {
            steps: 512,
            step_delay_ms: 5,
        }
    }
}
