//! Processor configuration
//!
//! Wiring-independent settings: where the display lives on the bus, how
//! fast to clock it, and where the ROM image sits in serial flash.

use sh1107_hal::BusSpeed;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::rom::{HEADER_LEN, ROM_CAPACITY};

/// Default SH1107 bus address (SA0 low)
pub const DEFAULT_ADDRESS: u8 = 0x3C;

/// Default location of the ROM image in serial flash
pub const DEFAULT_FLASH_ROM_BASE: u32 = 0x0010_0000;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Address does not fit in 7 bits
    InvalidAddress,
    /// Bus clock the display does not support
    UnsupportedSpeed,
    /// ROM image longer than local memory
    RomTooLarge,
    /// ROM image shorter than its header
    RomTooSmall,
    /// TOML parsing failed
    #[cfg(feature = "toml")]
    TomlParse,
}

/// Processor configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ProcessorConfig {
    /// 7-bit display address
    pub address: u8,
    /// Bus clock in Hz
    pub bus_frequency: u32,
    /// Flash address of the ROM image
    pub flash_rom_base: u32,
    /// ROM image length in bytes
    pub rom_length: u16,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            bus_frequency: BusSpeed::FAST.frequency,
            flash_rom_base: DEFAULT_FLASH_ROM_BASE,
            rom_length: ROM_CAPACITY as u16,
        }
    }
}

impl ProcessorConfig {
    /// Configuration for an image of `rom_length` bytes, defaults otherwise
    pub fn with_rom_length(rom_length: u16) -> Self {
        Self {
            rom_length,
            ..Self::default()
        }
    }

    pub fn bus_speed(&self) -> BusSpeed {
        BusSpeed {
            frequency: self.bus_frequency,
        }
    }

    /// Check the configuration for values the processor cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.address > 0x7F {
            return Err(ConfigError::InvalidAddress);
        }
        if !self.bus_speed().is_supported() {
            return Err(ConfigError::UnsupportedSpeed);
        }
        if usize::from(self.rom_length) > ROM_CAPACITY {
            return Err(ConfigError::RomTooLarge);
        }
        if usize::from(self.rom_length) < HEADER_LEN {
            return Err(ConfigError::RomTooSmall);
        }
        Ok(())
    }

    /// Parse and validate a TOML document
    ///
    /// Missing keys take their default values.
    #[cfg(feature = "toml")]
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input).map_err(|_| ConfigError::TomlParse)?;
        config.validate()?;
        Ok(config)
    }
}
