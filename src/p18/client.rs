use crate::prelude::*;

const BUFFER_SIZE: usize = 256;

/// Executes typed commands against one device.
pub struct Client {
    device: Device,
}

impl Client {
    pub fn new(device: Device) -> Self {
        Self { device }
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut Device {
        &mut self.device
    }

    /// Packs and frames `kind`, performs one round trip and decodes the
    /// answer. `args` are expected to be normalized by the registry already.
    pub fn execute(&mut self, kind: CommandKind, args: &[String]) -> Result<Response> {
        let frame = kind.frame(args)?;
        debug!("executing {:?} as {}", kind, frame);

        let mut buf = [0u8; BUFFER_SIZE];
        let size = self.device.run(frame.as_bytes(), &mut buf)?;

        Response::decode(kind, &buf[..size])
    }

    /// Sends `command` verbatim and returns whatever came back.
    pub fn run_raw(&mut self, command: &str) -> Result<Vec<u8>> {
        let mut buf = [0u8; BUFFER_SIZE];
        let size = self.device.run(command.as_bytes(), &mut buf)?;

        Ok(buf[..size].to_vec())
    }
}
