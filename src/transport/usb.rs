use crate::prelude::*;
use crate::transport::RawIo;

use std::time::Duration;

pub const VENDOR_ID: u16 = 0x0665;
pub const PRODUCT_ID: u16 = 0x5161;

/// The inverter's HID interface moves 8 bytes per report.
pub const REPORT_SIZE: usize = 8;

pub struct UsbTransport {
    #[cfg(feature = "usb")]
    device: hidapi::HidDevice,
}

impl UsbTransport {
    #[cfg(feature = "usb")]
    pub fn open(settings: &config::Usb) -> Result<Self> {
        let api = hidapi::HidApi::new()
            .map_err(|err| Error::Device(format!("hidapi initialization failure: {}", err)))?;

        let device = match &settings.path {
            Some(path) => {
                let path = std::ffi::CString::new(path.as_str())
                    .map_err(|_| Error::Device(format!("invalid device path {:?}", path)))?;
                api.open_path(&path)
            }
            None => api.open(settings.vendor_id, settings.product_id),
        }
        .map_err(|err| Error::Device(format!("failed to create hidapi device: {}", err)))?;

        Ok(Self { device })
    }

    #[cfg(not(feature = "usb"))]
    pub fn open(_settings: &config::Usb) -> Result<Self> {
        Err(Error::Device("usb support not compiled in".to_string()))
    }
}

/// Lays `data` out as one output report: report id 0, then up to
/// [`REPORT_SIZE`] bytes, zero padded. Returns the report and how many
/// bytes of `data` it carries.
pub fn output_report(data: &[u8]) -> ([u8; REPORT_SIZE + 1], usize) {
    let mut report = [0u8; REPORT_SIZE + 1];
    let size = data.len().min(REPORT_SIZE);
    report[1..=size].copy_from_slice(&data[..size]);
    (report, size)
}

#[cfg(feature = "usb")]
impl RawIo for UsbTransport {
    fn read(&mut self, buf: &mut [u8], timeout: Option<Duration>) -> Result<usize> {
        let size = buf.len().min(REPORT_SIZE);
        let timeout = timeout
            .map(|t| t.as_millis().min(i32::MAX as u128) as i32)
            .unwrap_or(-1);

        self.device
            .read_timeout(&mut buf[..size], timeout)
            .map_err(|err| Error::Device(format!("hid read failed: {}", err)))
    }

    fn write(&mut self, data: &[u8], _timeout: Option<Duration>) -> Result<usize> {
        let (report, size) = output_report(data);

        let written = self
            .device
            .write(&report)
            .map_err(|err| Error::Device(format!("hid write failed: {}", err)))?;

        Ok(written.min(size))
    }
}

#[cfg(not(feature = "usb"))]
impl RawIo for UsbTransport {
    fn read(&mut self, _buf: &mut [u8], _timeout: Option<Duration>) -> Result<usize> {
        Err(Error::Device("usb support not compiled in".to_string()))
    }

    fn write(&mut self, _data: &[u8], _timeout: Option<Duration>) -> Result<usize> {
        Err(Error::Device("usb support not compiled in".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_report_is_zero_padded() {
        let (report, size) = output_report(b"^P005GS");
        assert_eq!(size, 7);
        assert_eq!(report, [0, b'^', b'P', b'0', b'0', b'5', b'G', b'S', 0]);
    }

    #[test]
    fn long_data_is_truncated_to_report() {
        let (report, size) = output_report(b"^P007PIRI\x12\x34\r");
        assert_eq!(size, REPORT_SIZE);
        assert_eq!(&report[1..], b"^P007PIR");
        assert_eq!(report[0], 0);
    }
}
