//! Device configuration loading and validation.
//!
//! Configuration is a single TOML file naming the device variant, the GPIO
//! chip to bind to, and the line offsets for that variant:
//!
//! ```toml
//! variant = "led"
//! chip = "/dev/gpiochip0"
//! device_name = "rpi_led"
//! device_dir = "/run/pindrv"
//!
//! [led]
//! lines = [17, 27, 22]
//! ```
//!
//! The LCD variant instead carries the four named HD44780 control groups:
//!
//! ```toml
//! [lcd]
//! rs = 5
//! rw = 6
//! en = 13
//! data = [16, 19, 20, 21]
//! ```

use crate::error::DriverError;
use crate::gpio::PinDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Maximum number of output lines in one pin set (bitmask width).
pub const MAX_LINES: usize = 64;

/// Which physical device the pin set drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceVariant {
    /// Array of LEDs, one-hot selected by write commands.
    Led,
    /// HD44780-style LCD control lines (no write protocol defined).
    Lcd,
}

/// Line offsets for the LED variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedPins {
    /// Chip offsets of the LED lines, in declared (acquisition) order.
    pub lines: Vec<u32>,
}

/// Line offsets for the LCD variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LcdPins {
    /// Register-select line
    pub rs: u32,
    /// Read/write line
    pub rw: u32,
    /// Enable line
    pub en: u32,
    /// Data bus lines, in declared order
    pub data: Vec<u32>,
}

/// Top-level device configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device variant to drive.
    pub variant: DeviceVariant,
    /// GPIO character device to bind to.
    #[serde(default = "default_chip")]
    pub chip: PathBuf,
    /// Name of the exposed device entry.
    pub device_name: String,
    /// Directory the device entry is created in.
    #[serde(default = "default_device_dir")]
    pub device_dir: PathBuf,
    /// LED variant pins (required when `variant = "led"`).
    pub led: Option<LedPins>,
    /// LCD variant pins (required when `variant = "lcd"`).
    pub lcd: Option<LcdPins>,
}

fn default_chip() -> PathBuf {
    PathBuf::from("/dev/gpiochip0")
}

fn default_device_dir() -> PathBuf {
    PathBuf::from("/run/pindrv")
}

impl DeviceConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, DriverError> {
        info!("Loading configuration from {:?}", path);

        let content = fs::read_to_string(path).map_err(|e| {
            DriverError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config: DeviceConfig = toml::from_str(&content).map_err(|e| {
            DriverError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        config.validate()?;

        info!(
            "Loaded config: variant={:?}, {} output lines, device '{}'",
            config.variant,
            config.pin_count(),
            config.device_name
        );

        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    /// Returns `DriverError::Config` if the variant section is missing, the
    /// line set is empty or exceeds [`MAX_LINES`], offsets repeat, or the
    /// device name is empty.
    pub fn validate(&self) -> Result<(), DriverError> {
        if self.device_name.is_empty() {
            return Err(DriverError::Config("device_name must not be empty".into()));
        }

        let offsets = match self.variant {
            DeviceVariant::Led => {
                let led = self.led.as_ref().ok_or_else(|| {
                    DriverError::Config("variant \"led\" requires a [led] section".into())
                })?;
                if led.lines.is_empty() {
                    return Err(DriverError::Config("[led] lines must not be empty".into()));
                }
                led.lines.clone()
            }
            DeviceVariant::Lcd => {
                let lcd = self.lcd.as_ref().ok_or_else(|| {
                    DriverError::Config("variant \"lcd\" requires a [lcd] section".into())
                })?;
                if lcd.data.is_empty() {
                    return Err(DriverError::Config("[lcd] data must not be empty".into()));
                }
                let mut offsets = vec![lcd.rs, lcd.rw, lcd.en];
                offsets.extend_from_slice(&lcd.data);
                offsets
            }
        };

        if offsets.len() > MAX_LINES {
            return Err(DriverError::Config(format!(
                "{} output lines configured, at most {} supported",
                offsets.len(),
                MAX_LINES
            )));
        }

        let mut seen = HashSet::new();
        for offset in &offsets {
            if !seen.insert(offset) {
                return Err(DriverError::Config(format!(
                    "Duplicate line offset: {}",
                    offset
                )));
            }
        }

        Ok(())
    }

    /// Number of output lines in the configured pin set.
    pub fn pin_count(&self) -> usize {
        self.pin_descriptors().len()
    }

    /// Pin descriptors in declared acquisition order.
    ///
    /// LED variant: `led0..ledN`. LCD variant: `rs`, `rw`, `en`, then
    /// `data0..dataN` (the order the original hardware description names
    /// them in).
    pub fn pin_descriptors(&self) -> Vec<PinDescriptor> {
        match self.variant {
            DeviceVariant::Led => self
                .led
                .iter()
                .flat_map(|led| led.lines.iter().enumerate())
                .map(|(i, &offset)| PinDescriptor::new(format!("led{i}"), offset))
                .collect(),
            DeviceVariant::Lcd => {
                let Some(lcd) = self.lcd.as_ref() else {
                    return Vec::new();
                };
                let mut descriptors = vec![
                    PinDescriptor::new("rs", lcd.rs),
                    PinDescriptor::new("rw", lcd.rw),
                    PinDescriptor::new("en", lcd.en),
                ];
                descriptors.extend(
                    lcd.data
                        .iter()
                        .enumerate()
                        .map(|(i, &offset)| PinDescriptor::new(format!("data{i}"), offset)),
                );
                descriptors
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn led_toml() -> &'static str {
        r#"
            variant = "led"
            chip = "/dev/gpiochip0"
            device_name = "rpi_led"

            [led]
            lines = [17, 27, 22]
        "#
    }

    fn lcd_toml() -> &'static str {
        r#"
            variant = "lcd"
            device_name = "rpi_lcd"

            [lcd]
            rs = 5
            rw = 6
            en = 13
            data = [16, 19, 20, 21]
        "#
    }

    #[test]
    fn parse_led_config() {
        let config: DeviceConfig = toml::from_str(led_toml()).expect("should parse");
        config.validate().expect("should validate");
        assert_eq!(config.variant, DeviceVariant::Led);
        assert_eq!(config.pin_count(), 3);
        assert_eq!(config.device_dir, PathBuf::from("/run/pindrv"));
    }

    #[test]
    fn parse_lcd_config() {
        let config: DeviceConfig = toml::from_str(lcd_toml()).expect("should parse");
        config.validate().expect("should validate");
        assert_eq!(config.variant, DeviceVariant::Lcd);
        assert_eq!(config.pin_count(), 7);
    }

    #[test]
    fn led_descriptors_in_declared_order() {
        let config: DeviceConfig = toml::from_str(led_toml()).unwrap();
        let descriptors = config.pin_descriptors();
        assert_eq!(descriptors.len(), 3);
        assert_eq!(descriptors[0], PinDescriptor::new("led0", 17));
        assert_eq!(descriptors[1], PinDescriptor::new("led1", 27));
        assert_eq!(descriptors[2], PinDescriptor::new("led2", 22));
    }

    #[test]
    fn lcd_descriptors_named_groups_first() {
        let config: DeviceConfig = toml::from_str(lcd_toml()).unwrap();
        let descriptors = config.pin_descriptors();
        let names: Vec<&str> = descriptors.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["rs", "rw", "en", "data0", "data1", "data2", "data3"]
        );
    }

    #[test]
    fn missing_variant_section_rejected() {
        let config: DeviceConfig = toml::from_str(
            r#"
                variant = "led"
                device_name = "x"
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_line_set_rejected() {
        let config: DeviceConfig = toml::from_str(
            r#"
                variant = "led"
                device_name = "x"

                [led]
                lines = []
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn duplicate_offsets_rejected() {
        let config: DeviceConfig = toml::from_str(
            r#"
                variant = "led"
                device_name = "x"

                [led]
                lines = [17, 17]
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn oversized_line_set_rejected() {
        let lines: Vec<u32> = (0..65).collect();
        let config = DeviceConfig {
            variant: DeviceVariant::Led,
            chip: default_chip(),
            device_name: "x".into(),
            device_dir: default_device_dir(),
            led: Some(LedPins { lines }),
            lcd: None,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_device_name_rejected() {
        let mut config: DeviceConfig = toml::from_str(led_toml()).unwrap();
        config.device_name.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("device.toml");
        std::fs::write(&path, led_toml()).expect("write config");

        let config = DeviceConfig::load(&path).expect("should load");
        assert_eq!(config.device_name, "rpi_led");
    }

    #[test]
    fn load_rejects_missing_file() {
        let result = DeviceConfig::load(Path::new("/nonexistent/device.toml"));
        assert!(matches!(result, Err(DriverError::Config(_))));
    }
}
