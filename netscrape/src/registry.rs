//! Process-wide set of discovered VRF IDs.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::{PoisonError, RwLock};

/// Deduplicated VRF IDs written concurrently by router collectors.
///
/// Each insert and snapshot holds the lock only for its own duration. A
/// collector that inserts and then snapshots sees its own inserts; nothing is
/// promised about the interleaving with other devices.
#[derive(Debug, Default)]
pub struct VrfRegistry {
    ids: RwLock<HashSet<String>>,
}

impl VrfRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a VRF ID. Returns `true` if it was not already present.
    pub fn add(&self, vrf_id: impl Into<String>) -> bool {
        self.ids
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(vrf_id.into())
    }

    /// Current IDs, ascending by numeric value.
    ///
    /// IDs that are not integers sort after all numeric ones, lexically.
    pub fn snapshot(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .ids
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect();
        ids.sort_by(|a, b| numeric_order(a, b));
        ids
    }

    pub fn len(&self) -> usize {
        self.ids.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the snapshot as one ID per line, replacing `path`.
    pub fn write_snapshot(&self, path: &Path) -> io::Result<()> {
        let mut text = String::new();
        for id in self.snapshot() {
            text.push_str(&id);
            text.push('\n');
        }
        fs::write(path, text)
    }
}

fn numeric_order(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_add_is_idempotent() {
        let registry = VrfRegistry::new();
        assert!(registry.add("1"));
        assert!(!registry.add("1"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_snapshot_is_numeric() {
        let registry = VrfRegistry::new();
        for id in ["10", "2", "1", "0"] {
            registry.add(id);
        }
        assert_eq!(registry.snapshot(), vec!["0", "1", "2", "10"]);
    }

    #[test]
    fn test_non_numeric_ids_sort_last() {
        let registry = VrfRegistry::new();
        for id in ["mgmt", "3", "blue"] {
            registry.add(id);
        }
        assert_eq!(registry.snapshot(), vec!["3", "blue", "mgmt"]);
    }

    #[test]
    fn test_concurrent_writers() {
        let registry = Arc::new(VrfRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for id in 0..50 {
                        registry.add(((id + worker) % 60).to_string());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.len(), 57);
        assert_eq!(registry.snapshot().first().map(String::as_str), Some("0"));
    }

    #[test]
    fn test_write_snapshot_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Vrf_List.txt");
        fs::write(&path, "stale\nlines\nfrom\nbefore\n").unwrap();

        let registry = VrfRegistry::new();
        registry.add("20");
        registry.add("3");
        registry.write_snapshot(&path).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "3\n20\n");
    }
}
