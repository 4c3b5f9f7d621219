//! The P18 command set: command kinds and their wire form, the validating
//! name registry, response records and the client that ties them to a device.

pub mod client;
pub mod command;
pub mod fields;
pub mod registry;
pub mod response;
pub mod types;

pub use client::Client;
pub use command::CommandKind;
pub use response::{Record, Response};
