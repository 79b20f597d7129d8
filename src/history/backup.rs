use crate::error::HistoryError;
use std::fs;
use std::path::{Path, PathBuf};

/// Numbered snapshot slots `1..=capacity`, newest in slot 1.
///
/// Slot `i` always holds an older snapshot than slot `i - 1`. Rotation
/// shifts every occupied slot up by one (the snapshot in `capacity` is
/// overwritten) before the new snapshot lands in slot 1.
#[derive(Debug, Clone)]
pub struct BackupSet {
    dir: PathBuf,
    capacity: usize,
}

/// A single `from -> to` slot move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotMove {
    pub from: usize,
    pub to: usize,
}

impl BackupSet {
    pub fn new(dir: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            dir: dir.into(),
            capacity: capacity.max(1),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn slot_path(&self, slot: usize) -> PathBuf {
        self.dir.join(format!("backup{slot}.json"))
    }

    /// Occupied slot numbers in ascending order.
    pub fn occupied_slots(&self) -> Vec<usize> {
        (1..=self.capacity)
            .filter(|&slot| self.slot_path(slot).is_file())
            .collect()
    }

    /// Moves needed to free slot 1, highest slot first.
    pub fn rotation_plan(&self, occupied: impl Fn(usize) -> bool) -> Vec<SlotMove> {
        (1..self.capacity)
            .rev()
            .filter(|&slot| occupied(slot))
            .map(|slot| SlotMove {
                from: slot,
                to: slot + 1,
            })
            .collect()
    }

    /// Shift existing snapshots up one slot and copy `source` into slot 1.
    ///
    /// Any failed move aborts before slot 1 is written, so the newest
    /// existing snapshot is never overwritten without having been moved.
    pub fn rotate_in(&self, source: &Path) -> Result<(), HistoryError> {
        fs::create_dir_all(&self.dir).map_err(|e| HistoryError::BackupRotation {
            slot: 0,
            message: format!("create {}: {e}", self.dir.display()),
        })?;

        let plan = self.rotation_plan(|slot| self.slot_path(slot).is_file());
        for SlotMove { from, to } in plan {
            fs::rename(self.slot_path(from), self.slot_path(to)).map_err(|e| {
                HistoryError::BackupRotation {
                    slot: from,
                    message: e.to_string(),
                }
            })?;
        }

        let first = self.slot_path(1);
        if self.capacity > 1 && first.exists() {
            return Err(HistoryError::BackupRotation {
                slot: 1,
                message: "slot 1 still occupied after shifting".into(),
            });
        }

        let staging = self.dir.join(".backup1.json.tmp");
        fs::copy(source, &staging)
            .and_then(|_| fs::rename(&staging, &first))
            .map_err(|e| {
                let _ = fs::remove_file(&staging);
                HistoryError::BackupRotation {
                    slot: 1,
                    message: format!("copy {}: {e}", source.display()),
                }
            })?;

        tracing::debug!(
            dir = %self.dir.display(),
            occupied = self.occupied_slots().len(),
            "backup rotated"
        );
        Ok(())
    }
}
