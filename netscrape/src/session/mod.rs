//! Device sessions: the command-execution boundary used by the collector.
//!
//! [`SessionConnector`] and [`DeviceSession`] are the seams the collector is
//! written against. [`SshConnector`] is the production implementation; tests
//! substitute scripted fakes.

mod platform;
mod response;
mod ssh;
mod transcript;

pub use platform::DevicePlatform;
pub use response::Response;
pub use ssh::{SessionSettings, SshConnector, SshSession};
pub use transcript::SessionLog;

use std::future::Future;

use crate::error::Result;
use crate::inventory::DeviceTarget;

/// Opens authenticated sessions to devices.
pub trait SessionConnector: Send + Sync + 'static {
    /// The session type produced by this connector.
    type Session: DeviceSession;

    /// Connect and authenticate. Failures here leave the device with no records.
    fn connect(&self, target: &DeviceTarget) -> impl Future<Output = Result<Self::Session>> + Send;
}

/// An open command channel to one device.
pub trait DeviceSession: Send {
    /// Enter privileged mode.
    fn enable(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Paging and terminal commands to send once privileged.
    fn prime_commands(&self) -> Vec<String>;

    /// Send a command and wait for the prompt.
    ///
    /// A command the device rejects still returns `Ok`, with
    /// [`Response::failure_message`] set. `Err` means the session itself broke.
    fn send_command(&mut self, command: &str) -> impl Future<Output = Result<Response>> + Send;

    /// Close the session.
    fn disconnect(self) -> impl Future<Output = Result<()>> + Send;
}
