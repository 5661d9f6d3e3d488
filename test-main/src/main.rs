use dotenv::dotenv;
use joylock_fpro::bridge::MmioBridge;
use joylock_fpro::gpo::{GpoOutput, MmioGpo};
use joylock_fpro::jstk::{Joystick, PmodJstk};
use joylock_fpro::osd::{CharDisplay, MmioOsd};
use joylock_fpro::ps2::{KeyInput, MmioPs2};
use joylock_fpro::spi::MmioSpi;
use log::info;
use std::env::var;
use std::thread::sleep;
use std::time::Duration;
use sysinfo::System;

fn main() -> eyre::Result<()> {
    dotenv().ok();
    pretty_env_logger::init();

    const UNKNOWN_STR: &str = "???";

    info!(
        "Hello, {}!",
        System::name().as_deref().unwrap_or(UNKNOWN_STR)
    );
    info!(
        "System ver {} kernel ver {}",
        System::long_os_version().as_deref().unwrap_or(UNKNOWN_STR),
        System::kernel_version().as_deref().unwrap_or(UNKNOWN_STR),
    );
    info!(
        "Hostname {}",
        System::host_name().as_deref().unwrap_or(UNKNOWN_STR)
    );
    info!("Architecture {}", System::cpu_arch());

    let bridge_base =
        u64::from_str_radix(var("JOYLOCK_BRIDGE_BASE")?.trim_start_matches("0x"), 16)?;
    let osd_base = u64::from_str_radix(var("JOYLOCK_OSD_BASE")?.trim_start_matches("0x"), 16)?;

    let bridge = MmioBridge::new_mem(bridge_base)?;
    info!("{:?} mapped.", bridge);

    let mut spi = MmioSpi::new(bridge.slot(var("JOYLOCK_SLOT_JSTK_SPI")?.parse()?)?)?;
    let mut joystick = PmodJstk::new(&mut spi, 0);
    let mut keyboard = MmioPs2::new(bridge.slot(var("JOYLOCK_SLOT_PS2")?.parse()?)?);
    let motor = MmioGpo::new(bridge.slot(var("JOYLOCK_SLOT_MOTOR")?.parse()?)?);

    let mut osd = MmioOsd::new_mem(osd_base)?;
    osd.clear()?;
    for (i, ch) in "joylock bringup".chars().enumerate() {
        osd.write_char(i, 0, ch)?;
    }

    // Walk the coils through one full cycle so the wiring can be heard.
    for bits in [0x01u32, 0x02, 0x04, 0x08, 0x00] {
        motor.write(bits)?;
        sleep(Duration::from_millis(250));
    }

    let mut frame = 0u32;

    loop {
        let sample = joystick.sample()?;
        if frame % 10 == 0 {
            info!("jstk x={:4} y={:4}", sample.x, sample.y);
        }

        if let Some(ch) = keyboard.try_read_char()? {
            info!("key: {:?}", ch);
        }

        sleep(Duration::from_millis(50));
        frame += 1;
    }
}
