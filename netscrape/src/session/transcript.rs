//! Per-device session transcripts.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::warn;

/// Raw shell output of one device session, appended to `log_<host>.txt`.
///
/// A write error disables the transcript for the rest of the session; the
/// session itself carries on.
pub struct SessionLog {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl SessionLog {
    /// Create (or truncate) the transcript for `host` in `dir`.
    pub fn create(dir: &Path, host: &str) -> io::Result<Self> {
        let path = dir.join(file_name(host));
        let file = File::create(&path)?;
        Ok(Self {
            path,
            writer: Some(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&mut self, data: &[u8]) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        if let Err(e) = writer.write_all(data) {
            warn!("Session log {} disabled: {}", self.path.display(), e);
            self.writer = None;
        }
    }

    pub fn flush(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            if let Err(e) = writer.flush() {
                warn!("Session log {} not flushed: {}", self.path.display(), e);
            }
        }
    }
}

/// `log_<host>.txt`, with characters that are unsafe in file names replaced.
fn file_name(host: &str) -> String {
    let host: String = host
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c => c,
        })
        .collect();
    format!("log_{host}.txt")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("10.0.0.1"), "log_10.0.0.1.txt");
        assert_eq!(file_name("fe80::1"), "log_fe80__1.txt");
    }

    #[test]
    fn test_transcript_written() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = SessionLog::create(dir.path(), "sw-1").unwrap();
        log.record(b"ERS-4850#show interface name\n");
        log.record(b"1/1  server\nERS-4850#");
        log.flush();

        let text = std::fs::read_to_string(dir.path().join("log_sw-1.txt")).unwrap();
        assert_eq!(text, "ERS-4850#show interface name\n1/1  server\nERS-4850#");
        assert_eq!(log.path(), dir.path().join("log_sw-1.txt"));
    }

    #[test]
    fn test_missing_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SessionLog::create(&dir.path().join("absent"), "sw-1").is_err());
    }
}
