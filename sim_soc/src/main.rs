/**
 * @file main.rs
 * @date 19/10/2026
 * @brief Entry point of the SoC simulation driver.
 */
use anyhow::Context;

mod config;
mod soc;
mod xip;

use soc::SimSoc;

const CONFIG_PATH: &str = "sim_soc.toml";

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let config = config::SimConfig::parse(CONFIG_PATH)?;
    log::info!("Config: {:?}", config);

    let mut soc = SimSoc::new(config.fetch_address);

    if let Some(image) = config.flash_image.as_deref() {
        soc.flash
            .borrow_mut()
            .load_image(image, config.flash_offset, config.image_base)
            .with_context(|| format!("Failed to load the flash image {image}"))?;
    }

    if let Some(output) = config.monitor_output.as_deref() {
        soc.monitor.borrow_mut().set_output(output)?;
    }

    soc.reset();

    while config.cycles == 0 || soc.cycles() < config.cycles {
        soc.cycle();
    }

    log::info!(
        "Stopped after {} cycles, {} words fetched, {} bus transactions",
        soc.cycles(),
        soc.fetched(),
        soc.monitor.borrow().transactions()
    );
    Ok(())
}
