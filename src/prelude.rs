pub use anyhow::{anyhow, bail};
pub use log::{debug, error, info, trace, warn};
pub use std::io::Write;
pub use tokio::sync::broadcast;

pub use crate::config::{self, Config, ConfigWrapper};
pub use crate::error::{Error, Result};
pub use crate::format::{self, Format};
pub use crate::p18::{self, CommandKind, Response};
pub use crate::transport::{self, Device, Transport};
pub use crate::{file_error, file_error_with_source};
