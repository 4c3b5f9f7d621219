use crate::prelude::*;
use crate::transport::{crc, hexdump, RawIo};

use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Flags {
    pub write_crc: bool,
    pub read_crc: bool,
    pub verify_crc: bool,
}

impl Default for Flags {
    fn default() -> Self {
        Self {
            write_crc: true,
            read_crc: true,
            verify_crc: true,
        }
    }
}

impl Flags {
    /// What the one-shot CLI uses: plain requests, checked responses.
    pub fn read_only_crc() -> Self {
        Self {
            write_crc: false,
            ..Self::default()
        }
    }
}

/// Frames requests, collects `\r`-terminated responses and keeps the clock.
///
/// Owns the transport; there is exactly one of these per physical device.
pub struct Device {
    transport: Transport,
    flags: Flags,
    timeout: Duration,
    started: Instant,
}

impl Device {
    pub const TIMEOUT: Duration = Duration::from_millis(1000);

    pub fn new(transport: Transport) -> Self {
        Self {
            transport,
            flags: Flags::default(),
            timeout: Self::TIMEOUT,
            started: Instant::now(),
        }
    }

    pub fn with_flags(mut self, flags: Flags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.set_timeout(timeout);
        self
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sets the budget and restarts the clock. Zero means unlimited.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
        self.started = Instant::now();
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// `None` when unlimited, otherwise what remains of the budget (never negative).
    pub fn time_left(&self) -> Option<Duration> {
        if self.timeout.is_zero() {
            return None;
        }

        Some(self.timeout.saturating_sub(self.elapsed()))
    }

    fn expired(&self) -> bool {
        self.time_left() == Some(Duration::ZERO)
    }

    /// One request/response round trip. Returns the payload length written
    /// into `buf`, terminator and checksum excluded.
    pub fn run(&mut self, payload: &[u8], buf: &mut [u8]) -> Result<usize> {
        self.set_timeout(self.timeout);

        self.send(payload)?;

        if self.expired() {
            return Err(Error::Timeout(format!(
                "sending already took {} ms",
                self.elapsed().as_millis()
            )));
        }

        self.recv(buf)
    }

    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        let mut frame = Vec::with_capacity(payload.len() + crc::SIZE + 1);
        frame.extend_from_slice(payload);

        if self.flags.write_crc {
            frame.extend_from_slice(&crc::calculate(payload).to_be_bytes());
        }
        frame.push(b'\r');

        debug!(
            "writing {} byte{}\n{}",
            frame.len(),
            if frame.len() > 1 { "s" } else { "" },
            hexdump(&frame)
        );

        self.write_loop(&frame)
    }

    fn write_loop(&mut self, mut data: &[u8]) -> Result<()> {
        loop {
            let written = self.transport.write(data, self.time_left())?;
            trace!("bytes written={}", written);

            if written >= data.len() {
                return Ok(());
            }

            if self.expired() {
                return Err(Error::Timeout(format!(
                    "data writing already took {} ms",
                    self.elapsed().as_millis()
                )));
            }

            data = &data[written..];
        }
    }

    pub fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
        let read = self.read_loop(buf)?;

        debug!(
            "got {} byte{}\n{}",
            read,
            if read > 1 { "s" } else { "" },
            hexdump(&buf[..read])
        );

        let min_size = if self.flags.read_crc { crc::SIZE + 1 } else { 1 };
        if read < min_size {
            return Err(Error::InvalidData("response is too small".to_string()));
        }

        let data_size = read - min_size;

        if self.flags.read_crc {
            let actual = crc::read(&buf[data_size..]);
            let expected = crc::calculate(&buf[..data_size]);

            if self.flags.verify_crc && actual != expected {
                return Err(Error::InvalidData(format!(
                    "crc is invalid: expected {:#06x}, got {:#06x}",
                    expected, actual
                )));
            }
        }

        Ok(data_size)
    }

    /// Reads until `\r`; the returned count includes the terminator.
    fn read_loop(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut size = 0;

        loop {
            if size >= buf.len() {
                return Err(Error::InvalidData(
                    "input buffer is not large enough".to_string(),
                ));
            }

            let read = self.transport.read(&mut buf[size..], self.time_left())?;
            trace!("bytes read={}", read);

            if let Some(pos) = buf[size..size + read].iter().position(|&b| b == b'\r') {
                return Ok(size + pos + 1);
            }
            size += read;

            if self.expired() {
                return Err(Error::Timeout(format!(
                    "data reading already took {} ms",
                    self.elapsed().as_millis()
                )));
            }
        }
    }
}
