//! Interactive shell channel: write lines, read until a pattern.

use std::time::Duration;

use log::trace;
use regex::bytes::Regex;
use russh::client::Msg;
use russh::{Channel, ChannelMsg};

use super::buffer::PromptBuffer;
use crate::error::{ChannelError, Result};

/// A PTY shell on one device with pattern-based reads.
pub struct ShellChannel {
    channel: Channel<Msg>,
    buffer: PromptBuffer,
}

impl ShellChannel {
    pub fn new(channel: Channel<Msg>, search_depth: usize) -> Self {
        Self {
            channel,
            buffer: PromptBuffer::new(search_depth),
        }
    }

    /// Send `line` followed by a newline.
    pub async fn write_line(&mut self, line: &str) -> Result<()> {
        let data = format!("{line}\n");
        self.channel
            .data(data.as_bytes())
            .await
            .map_err(ChannelError::Ssh)?;
        Ok(())
    }

    /// Read until `pattern` matches the buffer tail, returning the output
    /// up to and including the match.
    pub async fn read_until(&mut self, pattern: &Regex, timeout: Duration) -> Result<Vec<u8>> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if let Some(end) = self.buffer.find_in_tail(pattern) {
                return Ok(self.buffer.split_through(end));
            }

            let msg = tokio::time::timeout_at(deadline, self.channel.wait())
                .await
                .map_err(|_| ChannelError::PatternTimeout(timeout))?;

            match msg {
                Some(ChannelMsg::Data { ref data }) => {
                    trace!("shell: {} bytes", data.len());
                    self.buffer.extend(data);
                }
                Some(ChannelMsg::ExtendedData { ref data, .. }) => self.buffer.extend(data),
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                    return Err(ChannelError::Closed.into());
                }
                Some(_) => {}
            }
        }
    }

    /// Discard anything buffered so far.
    pub fn discard_pending(&mut self) {
        self.buffer.clear();
    }

    /// Close the channel.
    pub async fn close(self) -> Result<()> {
        self.channel.close().await.map_err(ChannelError::Ssh)?;
        Ok(())
    }
}
