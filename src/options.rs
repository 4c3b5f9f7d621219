use crate::config::{self, DeviceKind, Parity, StopBits};
use crate::format::Format;

use clap::Parser;
use std::time::Duration;

/// inverterd - serves P18 inverter queries over TCP
#[derive(Debug, Parser)]
#[clap(author, version)]
pub struct Options {
    /// Config file to read
    #[clap(short = 'c', long = "config", default_value = "config.yaml")]
    pub config_file: String,

    /// Log at debug level regardless of the config
    #[clap(short = 'v', long)]
    pub verbose: bool,

    /// Override the configured device kind
    #[clap(long, value_enum)]
    pub device: Option<DeviceKind>,
}

impl Options {
    pub fn new() -> Self {
        Self::parse()
    }
}

/// inverterctl - runs one P18 command against a locally attached inverter
#[derive(Debug, Parser)]
#[clap(author, version)]
pub struct CtlOptions {
    #[clap(long, value_enum, default_value_t = DeviceKind::Usb)]
    pub device: DeviceKind,

    /// I/O timeout in milliseconds, 0 disables it
    #[clap(long, default_value_t = 1000)]
    pub timeout: u64,

    #[clap(short = 'v', long)]
    pub verbose: bool,

    /// Output format [default: table]
    #[clap(long, value_enum)]
    pub format: Option<Format>,

    /// USB vendor id, 4 hex digits
    #[clap(long, value_parser = parse_hex_id)]
    pub usb_vendor_id: Option<u16>,

    /// USB product id, 4 hex digits
    #[clap(long, value_parser = parse_hex_id)]
    pub usb_device_id: Option<u16>,

    /// HID device path, overrides the ids
    #[clap(long)]
    pub usb_path: Option<String>,

    #[clap(long)]
    pub serial_name: Option<String>,

    #[clap(long)]
    pub serial_baud_rate: Option<u32>,

    #[clap(long)]
    pub serial_data_bits: Option<u8>,

    #[clap(long, value_enum)]
    pub serial_stop_bits: Option<StopBits>,

    #[clap(long, value_enum)]
    pub serial_parity: Option<Parity>,

    /// Send this string to the device as-is and print the reply
    #[clap(long, value_parser = parse_raw, conflicts_with = "format")]
    pub raw: Option<String>,

    /// Command name, e.g. get-status
    #[clap(required_unless_present = "raw")]
    pub command: Option<String>,

    /// Command arguments
    pub args: Vec<String>,
}

impl CtlOptions {
    pub fn new() -> Self {
        Self::parse()
    }

    pub fn output_format(&self) -> Format {
        self.format.unwrap_or_default()
    }

    /// Device settings from the defaults with every given flag applied.
    pub fn device_settings(&self) -> config::Device {
        let mut device = config::Device {
            kind: self.device,
            timeout: Duration::from_millis(self.timeout),
            ..config::Device::default()
        };

        if let Some(id) = self.usb_vendor_id {
            device.usb.vendor_id = id;
        }
        if let Some(id) = self.usb_device_id {
            device.usb.product_id = id;
        }
        if let Some(path) = &self.usb_path {
            device.usb.path = Some(path.clone());
        }

        if let Some(path) = &self.serial_name {
            device.serial.path = path.clone();
        }
        if let Some(baud_rate) = self.serial_baud_rate {
            device.serial.baud_rate = baud_rate;
        }
        if let Some(data_bits) = self.serial_data_bits {
            device.serial.data_bits = data_bits;
        }
        if let Some(stop_bits) = self.serial_stop_bits {
            device.serial.stop_bits = stop_bits;
        }
        if let Some(parity) = self.serial_parity {
            device.serial.parity = parity;
        }

        device
    }
}

fn parse_hex_id(s: &str) -> Result<u16, String> {
    if s.len() != 4 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(format!("{:?} is not a 4 digit hex id", s));
    }
    u16::from_str_radix(s, 16).map_err(|e| e.to_string())
}

fn parse_raw(s: &str) -> Result<String, String> {
    if s.len() > 128 {
        return Err("raw command is longer than 128 characters".to_string());
    }
    Ok(s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctl(args: &[&str]) -> Result<CtlOptions, clap::Error> {
        CtlOptions::try_parse_from(std::iter::once("inverterctl").chain(args.iter().copied()))
    }

    #[test]
    fn hex_ids() {
        assert_eq!(parse_hex_id("0665"), Ok(0x0665));
        assert!(parse_hex_id("665").is_err());
        assert!(parse_hex_id("06g5").is_err());
    }

    #[test]
    fn command_with_arguments() {
        let options = ctl(&["--device", "pseudo", "get-year-generated", "2024"]).unwrap();
        assert_eq!(options.command.as_deref(), Some("get-year-generated"));
        assert_eq!(options.args, vec!["2024".to_string()]);
        assert_eq!(options.output_format(), Format::Table);
        assert_eq!(options.device_settings().kind, DeviceKind::Pseudo);
    }

    #[test]
    fn raw_conflicts_with_format() {
        assert!(ctl(&["--raw", "^P005PI", "--format", "json"]).is_err());
        assert!(ctl(&["--raw", "^P005PI"]).is_ok());
        assert!(ctl(&["--raw", &"x".repeat(129)]).is_err());
        assert!(ctl(&[]).is_err());
    }

    #[test]
    fn serial_overrides() {
        let options = ctl(&[
            "--device", "serial",
            "--serial-name", "/dev/ttyS1",
            "--serial-baud-rate", "9600",
            "--serial-stop-bits", "2",
            "--serial-parity", "even",
            "get-status",
        ])
        .unwrap();

        let device = options.device_settings();
        assert_eq!(device.serial.path, "/dev/ttyS1");
        assert_eq!(device.serial.baud_rate, 9600);
        assert_eq!(device.serial.stop_bits, StopBits::Two);
        assert_eq!(device.serial.parity, Parity::Even);
    }
}
