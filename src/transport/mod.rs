pub mod crc;
mod device;
pub mod pseudo;
pub mod serial;
pub mod usb;

use crate::prelude::*;

use enum_dispatch::*;
use std::time::Duration;

pub use device::{Device, Flags};
pub use pseudo::{Exchange, History, PseudoTransport};
pub use serial::SerialTransport;
pub use usb::UsbTransport;

/// Raw byte I/O against one physical (or pretend) inverter link.
///
/// `timeout` is the budget left for this call; `None` means block for as
/// long as it takes. Returning `Ok(0)` is allowed and means "nothing yet".
#[enum_dispatch]
pub trait RawIo {
    fn read(&mut self, buf: &mut [u8], timeout: Option<Duration>) -> Result<usize>;
    fn write(&mut self, data: &[u8], timeout: Option<Duration>) -> Result<usize>;
}

#[enum_dispatch(RawIo)]
pub enum Transport {
    Usb(UsbTransport),
    Serial(SerialTransport),
    Pseudo(PseudoTransport),
}

impl Transport {
    pub fn open(settings: &config::Device) -> Result<Self> {
        let transport = match settings.kind {
            config::DeviceKind::Usb => Transport::Usb(UsbTransport::open(&settings.usb)?),
            config::DeviceKind::Serial => {
                Transport::Serial(SerialTransport::open(&settings.serial)?)
            }
            config::DeviceKind::Pseudo => Transport::Pseudo(PseudoTransport::new()),
        };

        info!("opened {} device", settings.kind);

        Ok(transport)
    }
}

/// Classic 16-bytes-per-row dump, used for frame tracing at debug level.
pub fn hexdump(data: &[u8]) -> String {
    data.chunks(16)
        .enumerate()
        .map(|(row, chunk)| {
            let hex: Vec<String> = chunk.iter().map(|b| format!("{:02x}", b)).collect();
            let ascii: String = chunk
                .iter()
                .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
                .collect();
            format!("{:08x}  {:<47}  |{}|", row * 16, hex.join(" "), ascii)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hexdump_rows() {
        let dump = hexdump(b"^P005GS\x58\x14\r");
        assert_eq!(
            dump,
            "00000000  5e 50 30 30 35 47 53 58 14 0d                    |^P005GSX..|"
        );
        assert_eq!(hexdump(&[0u8; 17]).lines().count(), 2);
    }
}
