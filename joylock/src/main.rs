mod app;
mod config;
mod direction;
mod history;
mod stepper;
mod utils;

use crate::app::App;
use crate::config::Config;
use dotenv::dotenv;
use joylock_fpro::bridge::MmioBridge;
use joylock_fpro::gpo::MmioGpo;
use joylock_fpro::jstk::PmodJstk;
use joylock_fpro::osd::MmioOsd;
use joylock_fpro::ps2::MmioPs2;
use joylock_fpro::spi::MmioSpi;
use log::{debug, info};
use std::env::var;
use std::thread;

fn parse_addr(addr_str: &str) -> eyre::Result<u64> {
    let trimmed = addr_str.trim();
    let value = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16)?,
        None => trimmed.parse()?,
    };
    Ok(value)
}

fn main() -> eyre::Result<()> {
    // Initialize environment and logger
    dotenv()?;
    pretty_env_logger::init();

    info!("JoyLock starting...");

    // Get the address map from env
    let bridge_base = parse_addr(&var("JOYLOCK_BRIDGE_BASE")?)?;
    let osd_base = parse_addr(&var("JOYLOCK_OSD_BASE")?)?;
    let spi_slot_no: usize = var("JOYLOCK_SLOT_JSTK_SPI")?.parse()?;
    let ps2_slot_no: usize = var("JOYLOCK_SLOT_PS2")?.parse()?;
    let motor_slot_no: usize = var("JOYLOCK_SLOT_MOTOR")?.parse()?;

    info!("Bridge @ {:#x}, OSD @ {:#x}", bridge_base, osd_base);
    info!(
        "Slots @ JSTK SPI: {}, PS/2: {}, Motor: {}",
        spi_slot_no, ps2_slot_no, motor_slot_no
    );

    debug!("Initializing bridge...");
    let bridge = MmioBridge::new_mem(bridge_base)?;
    debug!("{:?} initialized.", bridge);

    debug!("Initializing peripherals...");
    let mut spi = MmioSpi::new(bridge.slot(spi_slot_no)?)?;
    let mut joystick = PmodJstk::new(&mut spi, 0);
    let mut keyboard = MmioPs2::new(bridge.slot(ps2_slot_no)?);
    let motor = MmioGpo::new(bridge.slot(motor_slot_no)?);

    let mut osd = MmioOsd::new_mem(osd_base)?;
    osd.clear()?;

    debug!("{:?} initialized.", joystick);
    debug!("{:?} initialized.", keyboard);
    debug!("{:?} initialized.", motor);

    debug!("Trying to load config...");
    let config = if let Some(config) = Config::try_load() {
        info!("Config loaded.");
        config
    } else {
        info!("Config not found. Using default");
        let config = Config::default();
        config.save()?;
        info!("Default config saved.");
        config
    };

    info!("JoyLock initialized.");

    let mut app = App::new(&config, &mut osd, &mut keyboard, &mut joystick, &motor);

    info!("Starting main loop...");

    loop {
        app.update()?;
        thread::sleep(app.tick_interval());
    }
}
