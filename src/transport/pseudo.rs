use crate::prelude::*;
use crate::transport::{crc, RawIo};

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

// How long a read waits for a response that never comes.
const IDLE_POLL: Duration = Duration::from_millis(10);

// Canned answers per get mnemonic, payload only (no `^Dnnn` header).
const FIXTURES: &[(&str, &str)] = &[
    ("PI", "18"),
    ("T", "20241019123045"),
    ("ET", "00238800"),
    ("EY", "00120000"),
    ("EM", "00009800"),
    ("ED", "00000420"),
    ("ID", "1496332110100452"),
    ("VFW", "00072,00030,00000"),
    ("PIRI", "2300,217,2300,500,217,5000,5000,480,500,570,420,576,540,2,30,060,0,1,1,6,0,0,0,1,2,00"),
    ("GS", "0000,000,2300,500,0115,0018,002,500,000,000,000,000,078,019,000,000,0000,0000,0000,0000,0,0,0,1,2,2,0,0"),
    ("MOD", "05"),
    ("FWS", "00,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0"),
    ("FLAG", "1,0,1,0,1,1,1,1,0"),
    ("DI", "2300,500,0,408,540,564,460,540,060,30,0,0,1,0,0,0,1,0,0,1,1,0,1,1"),
    ("MCHGCR", "010,020,030,040,050,060,070,080,090,100,110,120"),
    ("MUCHGCR", "002,010,020,030,040,050,060,070,080,090,100"),
    ("PRI", "0,14,96332110100452000000,1,060,030,0"),
    ("PGS", "1,5,00,2300,500,2300,500,0115,0018,00230,00036,002,004,500,000,012,024,078,0230,0000,1801,0000,2,1,1,1,2,0,038"),
    ("ACCT", "2300,0600"),
    ("ACLT", "0000,0000"),
];

/// Wraps a get payload into a `^Dnnn` frame. The declared length covers the
/// payload plus the checksum and terminator that follow it on the wire.
pub fn get_frame(payload: &str) -> String {
    format!("^D{:03}{}", payload.len() + crc::SIZE + 1, payload)
}

fn fixture_for(frame: &[u8]) -> Vec<u8> {
    if frame.starts_with(b"^S") {
        return b"^1".to_vec();
    }

    let body = frame.get(5..).unwrap_or_default();
    FIXTURES
        .iter()
        .filter(|(mnemonic, _)| body.starts_with(mnemonic.as_bytes()))
        .max_by_key(|(mnemonic, _)| mnemonic.len())
        .map(|(_, payload)| get_frame(payload).into_bytes())
        .unwrap_or_else(|| b"^0".to_vec())
}

/// One complete request seen by the pseudo transport.
#[derive(Clone, Debug)]
pub struct Exchange {
    pub at: Instant,
    pub frame: Vec<u8>,
}

/// Shared view of everything a [`PseudoTransport`] has received; stays
/// usable after the transport itself has been handed to a `Device`.
#[derive(Clone, Debug, Default)]
pub struct History(Arc<Mutex<Vec<Exchange>>>);

impl History {
    fn push(&self, frame: Vec<u8>) {
        if let Ok(mut exchanges) = self.0.lock() {
            exchanges.push(Exchange {
                at: Instant::now(),
                frame,
            });
        }
    }

    pub fn exchanges(&self) -> Vec<Exchange> {
        self.0.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.exchanges().into_iter().map(|e| e.frame).collect()
    }

    pub fn len(&self) -> usize {
        self.0.lock().map(|e| e.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Loopback transport answering from canned fixtures, for running without
/// hardware. Explicitly queued responses take priority over the fixtures.
pub struct PseudoTransport {
    append_crc: bool,
    queued: VecDeque<Vec<u8>>,
    incoming: Vec<u8>,
    pending: VecDeque<u8>,
    write_chunk: Option<usize>,
    history: History,
}

impl Default for PseudoTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl PseudoTransport {
    pub fn new() -> Self {
        Self {
            append_crc: true,
            queued: VecDeque::new(),
            incoming: Vec::new(),
            pending: VecDeque::new(),
            write_chunk: None,
            history: History::default(),
        }
    }

    pub fn without_crc(mut self) -> Self {
        self.append_crc = false;
        self
    }

    /// Accepts at most `size` bytes per write, like a link with a small
    /// output buffer.
    pub fn with_write_chunk(mut self, size: usize) -> Self {
        self.write_chunk = Some(size.max(1));
        self
    }

    pub fn history(&self) -> History {
        self.history.clone()
    }

    /// Queues a response payload (`^D...`, `^1`, ...); checksum and
    /// terminator are added when it is served.
    pub fn push_response(&mut self, payload: &str) {
        let mut framed = payload.as_bytes().to_vec();
        if self.append_crc {
            framed.extend_from_slice(&crc::calculate(payload.as_bytes()).to_be_bytes());
        }
        framed.push(b'\r');
        self.queued.push_back(framed);
    }

    /// Queues bytes served exactly as given.
    pub fn push_raw(&mut self, bytes: Vec<u8>) {
        self.queued.push_back(bytes);
    }

    fn respond(&mut self, frame: Vec<u8>) {
        let response = match self.queued.pop_front() {
            Some(response) => response,
            None => {
                let payload = fixture_for(&frame);
                let mut framed = payload.clone();
                if self.append_crc {
                    framed.extend_from_slice(&crc::calculate(&payload).to_be_bytes());
                }
                framed.push(b'\r');
                framed
            }
        };

        self.history.push(frame);
        self.pending = response.into();
    }
}

impl RawIo for PseudoTransport {
    /// Behaves like a silent device when nothing is pending: waits out a
    /// slice of the budget and reports no data.
    fn read(&mut self, buf: &mut [u8], timeout: Option<Duration>) -> Result<usize> {
        if self.pending.is_empty() {
            std::thread::sleep(timeout.map_or(IDLE_POLL, |t| t.min(IDLE_POLL)));
            return Ok(0);
        }

        let count = buf.len().min(self.pending.len());
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..count)) {
            *slot = byte;
        }

        Ok(count)
    }

    fn write(&mut self, data: &[u8], _timeout: Option<Duration>) -> Result<usize> {
        let data = match self.write_chunk {
            Some(size) => &data[..data.len().min(size)],
            None => data,
        };

        for &byte in data {
            if byte == b'\r' {
                let frame = std::mem::take(&mut self.incoming);
                debug!("pseudo device got frame {:?}", String::from_utf8_lossy(&frame));
                self.respond(frame);
            } else {
                self.incoming.push(byte);
            }
        }

        Ok(data.len())
    }
}
