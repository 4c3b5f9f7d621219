use crate::prelude::*;
use crate::transport::{serial, usb};

use serde::Deserialize;
use serde_with::{serde_as, DurationMilliSeconds};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub device: Device,

    #[serde(default)]
    pub server: Server,

    #[serde(default = "Config::default_loglevel")]
    pub loglevel: String,
}

// DeviceKind {{{
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    #[default]
    Usb,
    Serial,
    Pseudo,
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DeviceKind::Usb => "usb",
            DeviceKind::Serial => "serial",
            DeviceKind::Pseudo => "pseudo",
        };
        write!(f, "{}", s)
    }
} // }}}

// Device {{{
#[serde_as]
#[derive(Clone, Debug, Deserialize)]
pub struct Device {
    #[serde(default)]
    pub kind: DeviceKind,

    /// I/O budget per round trip, zero disables it
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(default = "Config::default_device_timeout")]
    pub timeout: Duration,

    #[serde(default)]
    pub usb: Usb,

    #[serde(default)]
    pub serial: Serial,
}

impl Default for Device {
    fn default() -> Self {
        Self {
            kind: DeviceKind::default(),
            timeout: Config::default_device_timeout(),
            usb: Usb::default(),
            serial: Serial::default(),
        }
    }
}

impl Device {
    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
} // }}}

// Usb {{{
#[derive(Clone, Debug, Deserialize)]
pub struct Usb {
    #[serde(default = "Config::default_usb_vendor_id")]
    pub vendor_id: u16,

    #[serde(default = "Config::default_usb_product_id")]
    pub product_id: u16,

    pub path: Option<String>,
}

impl Default for Usb {
    fn default() -> Self {
        Self {
            vendor_id: usb::VENDOR_ID,
            product_id: usb::PRODUCT_ID,
            path: None,
        }
    }
} // }}}

// Serial {{{
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, clap::ValueEnum)]
pub enum StopBits {
    #[default]
    #[serde(rename = "1")]
    #[value(name = "1")]
    One,

    #[serde(rename = "1.5")]
    #[value(name = "1.5")]
    OneAndHalf,

    #[serde(rename = "2")]
    #[value(name = "2")]
    Two,
}

impl std::fmt::Display for StopBits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StopBits::One => "1",
            StopBits::OneAndHalf => "1.5",
            StopBits::Two => "2",
        };
        write!(f, "{}", s)
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
    Mark,
    Space,
}

impl std::fmt::Display for Parity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Parity::None => "none",
            Parity::Odd => "odd",
            Parity::Even => "even",
            Parity::Mark => "mark",
            Parity::Space => "space",
        };
        write!(f, "{}", s)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Serial {
    #[serde(default = "Config::default_serial_path")]
    pub path: String,

    #[serde(default = "Config::default_serial_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "Config::default_serial_data_bits")]
    pub data_bits: u8,

    #[serde(default)]
    pub stop_bits: StopBits,

    #[serde(default)]
    pub parity: Parity,
}

impl Default for Serial {
    fn default() -> Self {
        Self {
            path: Config::default_serial_path(),
            baud_rate: Config::default_serial_baud_rate(),
            data_bits: Config::default_serial_data_bits(),
            stop_bits: StopBits::default(),
            parity: Parity::default(),
        }
    }
} // }}}

// Server {{{
#[serde_as]
#[derive(Clone, Debug, Deserialize)]
pub struct Server {
    #[serde(default = "Config::default_server_host")]
    pub host: String,

    #[serde(default = "Config::default_server_port")]
    pub port: u16,

    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(default = "Config::default_cache_timeout")]
    pub cache_timeout: Duration,

    /// minimum pause between two device executions
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(default)]
    pub delay: Duration,

    #[serde(default = "Config::default_device_error_limit")]
    pub device_error_limit: u32,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            host: Config::default_server_host(),
            port: Config::default_server_port(),
            cache_timeout: Config::default_cache_timeout(),
            delay: Duration::ZERO,
            device_error_limit: Config::default_device_error_limit(),
        }
    }
}

impl Server {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn cache_timeout(&self) -> Duration {
        self.cache_timeout
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn device_error_limit(&self) -> u32 {
        self.device_error_limit
    }
} // }}}

#[derive(Debug)]
pub struct ConfigWrapper {
    config: Arc<Mutex<Config>>,
}

impl Clone for ConfigWrapper {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
        }
    }
}

impl ConfigWrapper {
    pub fn new(file: String) -> anyhow::Result<Self> {
        let config = Config::new(file)?;

        Ok(Self::from_config(config))
    }

    pub fn from_config(config: Config) -> Self {
        Self {
            config: Arc::new(Mutex::new(config)),
        }
    }

    fn config(&self) -> MutexGuard<'_, Config> {
        self.config
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn device(&self) -> Device {
        self.config().device.clone()
    }

    pub fn set_device_kind(&self, kind: DeviceKind) {
        self.config().device.kind = kind;
    }

    pub fn server(&self) -> Server {
        self.config().server.clone()
    }

    pub fn loglevel(&self) -> String {
        self.config().loglevel.clone()
    }

    pub fn log(&self) {
        self.config().log();
    }
}

impl Config {
    pub fn new(file: String) -> anyhow::Result<Self> {
        info!("Reading configuration from {}", file);

        let content = std::fs::read_to_string(&file)
            .map_err(|err| file_error!("error reading {}: {}", file, err))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let serial = &self.device.serial;
        if !serial::is_valid_baud_rate(serial.baud_rate) {
            bail!(
                "serial.baud_rate {} is not one of {:?}",
                serial.baud_rate,
                serial::BAUD_RATES
            );
        }

        if !(5..=8).contains(&serial.data_bits) {
            bail!("serial.data_bits must be between 5 and 8, got {}", serial.data_bits);
        }

        let usb = &self.device.usb;
        if usb.path.is_none() && (usb.vendor_id == 0 || usb.product_id == 0) {
            bail!("usb.vendor_id and usb.product_id must be non-zero");
        }

        if self.server.port == 0 {
            bail!("server.port must be non-zero");
        }

        Ok(())
    }

    pub fn log(&self) {
        info!("Configuration loaded successfully:");
        info!("  Device: {}", self.device.kind);
        info!("    Timeout: {}ms", self.device.timeout.as_millis());
        match self.device.kind {
            DeviceKind::Usb => match &self.device.usb.path {
                Some(path) => info!("    Path: {}", path),
                None => info!(
                    "    Vendor/Product: {:04x}:{:04x}",
                    self.device.usb.vendor_id, self.device.usb.product_id
                ),
            },
            DeviceKind::Serial => {
                let serial = &self.device.serial;
                info!("    Path: {}", serial.path);
                info!(
                    "    Line: {} {}{}{}",
                    serial.baud_rate, serial.data_bits, serial.parity, serial.stop_bits
                );
            }
            DeviceKind::Pseudo => {}
        }
        info!("  Server: {}", self.server.listen_addr());
        info!("    Cache Timeout: {}ms", self.server.cache_timeout.as_millis());
        info!("    Delay: {}ms", self.server.delay.as_millis());
        info!("    Device Error Limit: {}", self.server.device_error_limit);
        info!("  Log Level: {}", self.loglevel);
    }

    fn default_loglevel() -> String {
        "info".to_string()
    }

    fn default_device_timeout() -> Duration {
        crate::transport::Device::TIMEOUT
    }

    fn default_usb_vendor_id() -> u16 {
        usb::VENDOR_ID
    }

    fn default_usb_product_id() -> u16 {
        usb::PRODUCT_ID
    }

    fn default_serial_path() -> String {
        "/dev/ttyUSB0".to_string()
    }

    fn default_serial_baud_rate() -> u32 {
        2400
    }

    fn default_serial_data_bits() -> u8 {
        8
    }

    fn default_server_host() -> String {
        "127.0.0.1".to_string()
    }

    fn default_server_port() -> u16 {
        8305
    }

    fn default_cache_timeout() -> Duration {
        Duration::from_millis(1000)
    }

    fn default_device_error_limit() -> u32 {
        10
    }
}
