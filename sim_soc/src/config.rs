/**
 * @file config.rs
 * @date 19/10/2026
 * @brief Configuration handling for the simulation driver.
 */
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
pub struct SimConfig {
    /// Raw binary or UF2 image written into the flash before reset.
    pub flash_image: Option<String>,
    pub flash_offset: usize,
    /// Address UF2 block targets are relative to.
    pub image_base: u32,
    /// Transaction log of the bus monitor.
    pub monitor_output: Option<String>,
    /// First flash address fetched after reset.
    pub fetch_address: u32,
    /// Clock cycles to run, 0 runs until interrupted.
    pub cycles: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            flash_image: None,
            flash_offset: 0x0010_0000,
            image_base: 0,
            monitor_output: None,
            fetch_address: 0x0010_0000,
            cycles: 0,
        }
    }
}

impl SimConfig {
    pub fn parse(path: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Config::try_from(&SimConfig::default())?)
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("SIM_SOC").try_parsing(true))
            .build()?
            .try_deserialize()
    }
}
