use crate::prelude::*;
use crate::config::{Parity, StopBits};
use crate::transport::RawIo;

use std::time::Duration;

pub const BAUD_RATES: [u32; 10] = [110, 300, 1200, 2400, 4800, 9600, 19200, 38400, 57600, 115200];

// serialport has no "wait forever"; a day is as good as it gets.
#[cfg(feature = "serial")]
const UNLIMITED: Duration = Duration::from_secs(24 * 60 * 60);

pub fn is_valid_baud_rate(baud_rate: u32) -> bool {
    BAUD_RATES.contains(&baud_rate)
}

pub struct SerialTransport {
    #[cfg(feature = "serial")]
    port: Box<dyn serialport::SerialPort>,
}

impl SerialTransport {
    #[cfg(feature = "serial")]
    pub fn open(settings: &config::Serial) -> Result<Self> {
        use serialport::{ClearBuffer, DataBits, FlowControl, SerialPort as _};

        if !is_valid_baud_rate(settings.baud_rate) {
            return Err(Error::Device(format!(
                "invalid baud rate {}",
                settings.baud_rate
            )));
        }

        let data_bits = match settings.data_bits {
            5 => DataBits::Five,
            6 => DataBits::Six,
            7 => DataBits::Seven,
            8 => DataBits::Eight,
            n => return Err(Error::Device(format!("invalid data bits {}", n))),
        };

        let stop_bits = match settings.stop_bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
            StopBits::OneAndHalf => {
                return Err(Error::Device(
                    "1.5 stop bits are not supported by the serial driver".to_string(),
                ))
            }
        };

        let parity = match settings.parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
            Parity::Mark | Parity::Space => {
                return Err(Error::Device(format!(
                    "{} parity is not supported by the serial driver",
                    settings.parity
                )))
            }
        };

        debug!(
            "opening {} at {} baud, {} data bits, {} stop bits, {} parity",
            settings.path, settings.baud_rate, settings.data_bits, settings.stop_bits, settings.parity
        );

        let port = serialport::new(&settings.path, settings.baud_rate)
            .data_bits(data_bits)
            .stop_bits(stop_bits)
            .parity(parity)
            .flow_control(FlowControl::None)
            .timeout(Device::TIMEOUT)
            .open()
            .map_err(|err| Error::Device(format!("failed to open {}: {}", settings.path, err)))?;

        port.clear(ClearBuffer::All)
            .map_err(|err| Error::Device(format!("failed to flush {}: {}", settings.path, err)))?;

        Ok(Self { port })
    }

    #[cfg(not(feature = "serial"))]
    pub fn open(_settings: &config::Serial) -> Result<Self> {
        Err(Error::Device("serial support not compiled in".to_string()))
    }

    // an already expired deadline must not turn into the driver's 0 = "block"
    #[cfg(feature = "serial")]
    fn apply_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        let timeout = timeout
            .map(|t| t.max(Duration::from_millis(1)))
            .unwrap_or(UNLIMITED);

        self.port
            .set_timeout(timeout)
            .map_err(|err| Error::Device(format!("failed to set timeout: {}", err)))
    }
}

#[cfg(feature = "serial")]
impl RawIo for SerialTransport {
    fn read(&mut self, buf: &mut [u8], timeout: Option<Duration>) -> Result<usize> {
        use std::io::Read;

        self.apply_timeout(timeout)?;

        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(err) if err.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => Ok(0),
            Err(err) => Err(Error::Device(format!("failed to read: {}", err))),
        }
    }

    fn write(&mut self, data: &[u8], timeout: Option<Duration>) -> Result<usize> {
        self.apply_timeout(timeout)?;

        match self.port.write(data) {
            Ok(n) => Ok(n),
            Err(err) if err.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => Ok(0),
            Err(err) => Err(Error::Device(format!("failed to write: {}", err))),
        }
    }
}

#[cfg(not(feature = "serial"))]
impl RawIo for SerialTransport {
    fn read(&mut self, _buf: &mut [u8], _timeout: Option<Duration>) -> Result<usize> {
        Err(Error::Device("serial support not compiled in".to_string()))
    }

    fn write(&mut self, _data: &[u8], _timeout: Option<Duration>) -> Result<usize> {
        Err(Error::Device("serial support not compiled in".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_baud_rates() {
        assert!(is_valid_baud_rate(2400));
        assert!(is_valid_baud_rate(115200));
        assert!(!is_valid_baud_rate(2401));
        assert!(!is_valid_baud_rate(0));
    }

    #[test]
    fn rejects_unsupported_framing() {
        let settings = config::Serial {
            path: "/dev/null".to_string(),
            stop_bits: StopBits::OneAndHalf,
            ..config::Serial::default()
        };
        assert!(matches!(SerialTransport::open(&settings), Err(Error::Device(_))));

        let settings = config::Serial {
            path: "/dev/null".to_string(),
            parity: Parity::Mark,
            ..config::Serial::default()
        };
        assert!(matches!(SerialTransport::open(&settings), Err(Error::Device(_))));
    }
}
