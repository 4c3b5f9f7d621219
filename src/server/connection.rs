use crate::prelude::*;
use crate::p18::registry;
use crate::server::{Session, Shutdown};

use bytes::{Buf, BytesMut};
use std::fmt;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::codec::Decoder;

const END_OF_TRANSMISSION: u8 = 0x04;
const MAX_REQUEST_SIZE: usize = 2048;

/// One unit of client input.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Line {
    Request(String),
    /// A request outgrew the buffer; the rest of it up to CRLF is dropped.
    Oversized,
    /// The client sent EOT and wants the connection closed.
    End,
}

/// Splits the byte stream into CRLF-terminated requests.
#[derive(Debug, Default)]
pub struct LineDecoder {
    discarding: bool,
}

impl LineDecoder {
    /// Drops everything buffered except a trailing `\r`, which may be the
    /// first half of the terminator.
    fn drop_buffered(src: &mut BytesMut) {
        let keep = usize::from(src.last() == Some(&b'\r'));
        src.advance(src.len() - keep);
    }
}

impl Decoder for LineDecoder {
    type Item = Line;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if !self.discarding && src.first() == Some(&END_OF_TRANSMISSION) {
                src.clear();
                return Ok(Some(Line::End));
            }

            match src.windows(2).position(|w| w == b"\r\n") {
                Some(pos) if self.discarding => {
                    src.advance(pos + 2);
                    self.discarding = false;
                }
                Some(pos) if pos >= MAX_REQUEST_SIZE => {
                    src.advance(pos + 2);
                    return Ok(Some(Line::Oversized));
                }
                Some(pos) => {
                    let line = String::from_utf8_lossy(&src[..pos]).into_owned();
                    src.advance(pos + 2);
                    return Ok(Some(Line::Request(line)));
                }
                None if self.discarding => {
                    Self::drop_buffered(src);
                    return Ok(None);
                }
                None if src.len() >= MAX_REQUEST_SIZE => {
                    self.discarding = true;
                    Self::drop_buffered(src);
                    return Ok(Some(Line::Oversized));
                }
                None => return Ok(None),
            }
        }
    }

    /// An unterminated request at end of stream still counts.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }

        if self.discarding || src.is_empty() {
            src.clear();
            return Ok(None);
        }

        let line = String::from_utf8_lossy(&src[..]).into_owned();
        src.clear();
        Ok(Some(Line::Request(line)))
    }
}

/// `ok` or `err`, an optional body, and always a blank line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Reply {
    ok: bool,
    body: String,
}

impl Reply {
    pub fn ok(body: String) -> Self {
        Self { ok: true, body }
    }

    pub fn err(body: String) -> Self {
        Self { ok: false, body }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", if self.ok { "ok" } else { "err" })?;
        if !self.body.is_empty() {
            write!(f, "\r\n{}", self.body)?;
        }
        write!(f, "\r\n\r\n")
    }
}

pub struct Connection {
    stream: TcpStream,
    addr: SocketAddr,
    session: Session,
    shutdown: Shutdown,
    format: Format,
    version: u32,
}

impl Connection {
    pub fn new(stream: TcpStream, addr: SocketAddr, session: Session, shutdown: Shutdown) -> Self {
        Self {
            stream,
            addr,
            session,
            shutdown,
            format: Format::Json,
            version: 1,
        }
    }

    /// Serves requests until the client leaves. Once shutdown is triggered
    /// the request being processed is still answered, but no new input is
    /// read.
    pub async fn run(mut self) -> anyhow::Result<()> {
        let mut buf = BytesMut::with_capacity(MAX_REQUEST_SIZE);
        let mut decoder = LineDecoder::default();
        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            while let Some(line) = decoder.decode(&mut buf)? {
                match line {
                    Line::End => return Ok(()),
                    Line::Oversized => {
                        let err = Error::InvalidArgument(format!(
                            "request exceeds {} bytes",
                            MAX_REQUEST_SIZE
                        ));
                        let reply = self.error_reply(err);
                        self.send(reply).await?;
                    }
                    Line::Request(request) => self.respond(&request).await?,
                }
            }

            if self.shutdown.is_triggered() {
                debug!("{}: closing for shutdown", self.addr);
                return Ok(());
            }

            let read = tokio::select! {
                _ = shutdown_rx.recv() => {
                    debug!("{}: closing for shutdown", self.addr);
                    return Ok(());
                }
                read = self.stream.read_buf(&mut buf) => read?,
            };

            if read == 0 {
                if let Some(Line::Request(request)) = decoder.decode_eof(&mut buf)? {
                    self.respond(&request).await?;
                }
                return Ok(());
            }
        }
    }

    async fn respond(&mut self, request: &str) -> anyhow::Result<()> {
        let reply = self.process(request).await;
        self.send(reply).await
    }

    async fn send(&mut self, reply: Reply) -> anyhow::Result<()> {
        self.stream.write_all(reply.to_string().as_bytes()).await?;
        Ok(())
    }

    pub async fn process(&mut self, request: &str) -> Reply {
        match self.handle(request).await {
            Ok(body) => Reply::ok(body),
            Err(err) => self.error_reply(err),
        }
    }

    fn error_reply(&self, err: Error) -> Reply {
        warn!("{}: {}", self.addr, err);
        Reply::err(format::render(&Response::error(err.to_string()), self.format))
    }

    async fn handle(&mut self, request: &str) -> Result<String> {
        let mut tokens = request.split(' ').filter(|t| !t.is_empty());
        let token = tokens.next().unwrap_or_default();
        let args: Vec<String> = tokens.map(String::from).collect();

        match token {
            "v" => {
                expect_args(&args, 1)?;
                if args[0].parse::<u32>().ok() != Some(1) {
                    return Err(Error::InvalidArgument("invalid protocol version".to_string()));
                }
                self.version = 1;
                debug!("{}: protocol version {}", self.addr, self.version);
                Ok(String::new())
            }

            "format" => {
                expect_args(&args, 1)?;
                self.format = args[0].parse()?;
                Ok(String::new())
            }

            "exec" => {
                if args.is_empty() {
                    return Err(Error::InvalidArgument(
                        "invalid arguments count: expected 1, got 0".to_string(),
                    ));
                }

                let (kind, args) = registry::validate(&args[0], &args[1..])?;
                let response = self.session.execute(kind, args).await?;
                Ok(format::render(&response, self.format))
            }

            "raw" => Err(Error::Runtime("not implemented".to_string())),

            other => Err(Error::InvalidArgument(format!("invalid token: {}", other))),
        }
    }
}

fn expect_args(args: &[String], count: usize) -> Result<()> {
    if args.len() != count {
        return Err(Error::InvalidArgument(format!(
            "invalid arguments count: expected {}, got {}",
            count,
            args.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(input: &[u8]) -> Vec<Line> {
        let mut buf = BytesMut::from(input);
        let mut decoder = LineDecoder::default();
        let mut lines = Vec::new();
        while let Some(line) = decoder.decode_eof(&mut buf).unwrap() {
            lines.push(line);
        }
        lines
    }

    #[test]
    fn splits_on_crlf() {
        assert_eq!(
            decode_all(b"v 1\r\nexec get-status\r\nformat json"),
            vec![
                Line::Request("v 1".to_string()),
                Line::Request("exec get-status".to_string()),
                Line::Request("format json".to_string()),
            ]
        );
    }

    #[test]
    fn waits_for_terminator() {
        let mut buf = BytesMut::from(&b"exec get-st"[..]);
        assert_eq!(LineDecoder::default().decode(&mut buf).unwrap(), None);
        assert_eq!(buf.len(), 11);
    }

    #[test]
    fn end_of_transmission() {
        assert_eq!(decode_all(b"\x04v 1\r\n"), vec![Line::End]);
    }

    #[test]
    fn oversized_request_is_skipped_up_to_crlf() {
        let mut decoder = LineDecoder::default();
        let mut buf = BytesMut::from(&vec![b'a'; MAX_REQUEST_SIZE][..]);

        assert_eq!(decoder.decode(&mut buf).unwrap(), Some(Line::Oversized));
        assert!(buf.is_empty());

        buf.extend_from_slice(b"aaaa\r");
        assert_eq!(decoder.decode(&mut buf).unwrap(), None);
        assert_eq!(&buf[..], b"\r");

        buf.extend_from_slice(b"\nv 1\r\n");
        assert_eq!(
            decoder.decode(&mut buf).unwrap(),
            Some(Line::Request("v 1".to_string()))
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn oversized_tail_at_eof_is_dropped() {
        let mut input = vec![b'a'; MAX_REQUEST_SIZE + 10];
        input.extend_from_slice(b"\r\nv 1");
        assert_eq!(
            decode_all(&input),
            vec![Line::Oversized, Line::Request("v 1".to_string())]
        );
    }

    #[test]
    fn reply_layout() {
        assert_eq!(Reply::ok(String::new()).to_string(), "ok\r\n\r\n");
        assert_eq!(Reply::err("boom".to_string()).to_string(), "err\r\nboom\r\n\r\n");
    }
}
