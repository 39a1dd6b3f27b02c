//! SSH transport layer wrapping russh.
//!
//! Connection setup, authentication and shell channel creation.

pub mod config;
mod ssh;

pub use config::{AuthMethod, HostKeyPolicy, SshConfig};
pub use ssh::SshTransport;
