mod common;
use common::*;

use p18_bridge::config::{DeviceKind, Parity, StopBits};
use p18_bridge::prelude::*;

fn write_config(content: &str) -> anyhow::Result<tempfile::NamedTempFile> {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(content.as_bytes())?;
    Ok(file)
}

#[test]
fn empty_document_takes_defaults() -> anyhow::Result<()> {
    common_setup();
    let config = Config::from_yaml("{}")?;

    assert_eq!(config.device.kind, DeviceKind::Usb);
    assert_eq!(config.device.timeout, Device::TIMEOUT);
    assert_eq!(config.device.usb.vendor_id, 0x0665);
    assert_eq!(config.device.usb.product_id, 0x5161);
    assert_eq!(config.device.serial.path, "/dev/ttyUSB0");
    assert_eq!(config.device.serial.baud_rate, 2400);
    assert_eq!(config.device.serial.data_bits, 8);
    assert_eq!(config.device.serial.stop_bits, StopBits::One);
    assert_eq!(config.device.serial.parity, Parity::None);
    assert_eq!(config.server.listen_addr(), "127.0.0.1:8305");
    assert_eq!(config.server.cache_timeout, Duration::from_millis(1000));
    assert_eq!(config.server.delay, Duration::ZERO);
    assert_eq!(config.server.device_error_limit, 10);
    assert_eq!(config.loglevel, "info");

    Ok(())
}

#[test]
fn reads_file() -> anyhow::Result<()> {
    common_setup();
    let file = write_config(
        r#"
device:
  kind: serial
  timeout: 250
  serial:
    path: /dev/ttyS3
    baud_rate: 9600
    stop_bits: "1.5"
    parity: even
server:
  host: 0.0.0.0
  port: 9000
  cache_timeout: 0
  delay: 150
  device_error_limit: 3
loglevel: debug
"#,
    )?;

    let config = ConfigWrapper::new(file.path().display().to_string())?;

    let device = config.device();
    assert_eq!(device.kind(), DeviceKind::Serial);
    assert_eq!(device.timeout(), Duration::from_millis(250));
    assert_eq!(device.serial.path, "/dev/ttyS3");
    assert_eq!(device.serial.baud_rate, 9600);
    assert_eq!(device.serial.stop_bits, StopBits::OneAndHalf);
    assert_eq!(device.serial.parity, Parity::Even);

    let server = config.server();
    assert_eq!(server.listen_addr(), "0.0.0.0:9000");
    assert_eq!(server.cache_timeout(), Duration::ZERO);
    assert_eq!(server.delay(), Duration::from_millis(150));
    assert_eq!(server.device_error_limit(), 3);
    assert_eq!(config.loglevel(), "debug");

    Ok(())
}

#[test]
fn device_kind_override() -> anyhow::Result<()> {
    let config = ConfigWrapper::from_config(Config::from_yaml("device:\n  kind: usb\n")?);

    config.set_device_kind(DeviceKind::Pseudo);
    assert_eq!(config.device().kind(), DeviceKind::Pseudo);

    Ok(())
}

#[test]
fn missing_file() {
    let err = ConfigWrapper::new("/nonexistent/p18-bridge.yaml".to_string()).unwrap_err();
    assert!(err.to_string().contains("error reading /nonexistent/p18-bridge.yaml"));
}

#[test]
fn rejects_invalid_values() {
    let cases = [
        ("device:\n  serial:\n    baud_rate: 1234\n", "serial.baud_rate 1234"),
        ("device:\n  serial:\n    data_bits: 9\n", "serial.data_bits"),
        ("device:\n  usb:\n    vendor_id: 0\n", "usb.vendor_id"),
        ("server:\n  port: 0\n", "server.port"),
    ];

    for (yaml, expected) in cases {
        let err = Config::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains(expected), "{}: {}", yaml, err);
    }

    assert!(Config::from_yaml("device:\n  kind: bluetooth\n").is_err());
    assert!(Config::from_yaml("device:\n  serial:\n    parity: sometimes\n").is_err());
}

#[test]
fn usb_path_skips_id_check() -> anyhow::Result<()> {
    let config = Config::from_yaml("device:\n  usb:\n    vendor_id: 0\n    path: /dev/hidraw0\n")?;
    assert_eq!(config.device.usb.path.as_deref(), Some("/dev/hidraw0"));
    Ok(())
}
