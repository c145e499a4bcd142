// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Keeps the latest model snapshot plus exactly one backup.
//
// Every save rotates before writing:
//
//   seq2seq.bak.mpk   ← deleted
//   seq2seq.mpk       → renamed to seq2seq.bak.mpk
//   (new snapshot)    → written to seq2seq.mpk
//
// so a crash half-way through a save always leaves the previous
// snapshot intact as the backup.
//
// File layout:
//   checkpoints/
//     seq2seq.mpk        ← latest weights
//     seq2seq.bak.mpk    ← the weights before that
//     train_config.json  ← model hyperparameters
//
// Burn's CompactRecorder insists on the `.mpk` extension, so both
// file names carry it.
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::train_use_case::TrainConfig;
use crate::domain::traits::Persistable;

pub const CHECKPOINT_FILE: &str = "seq2seq.mpk";
pub const BACKUP_FILE: &str = "seq2seq.bak.mpk";
const CONFIG_FILE: &str = "train_config.json";

/// Manages the checkpoint and its single backup.
/// All files are stored in the configured directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.dir.join(CHECKPOINT_FILE)
    }

    pub fn backup_path(&self) -> PathBuf {
        self.dir.join(BACKUP_FILE)
    }

    pub fn has_checkpoint(&self) -> bool {
        self.checkpoint_path().exists()
    }

    /// Rotate the current snapshot to the backup slot, then write
    /// `model` as the new current snapshot.
    pub fn save<M: Persistable>(&self, model: &M) -> Result<()> {
        let current = self.checkpoint_path();
        let backup  = self.backup_path();

        if current.exists() {
            if backup.exists() {
                fs::remove_file(&backup)
                    .with_context(|| format!("Cannot remove old backup '{}'", backup.display()))?;
            }
            fs::rename(&current, &backup).with_context(|| {
                format!("Cannot move '{}' to '{}'", current.display(), backup.display())
            })?;
        }

        model.save(&current)?;
        tracing::info!("Saved checkpoint '{}'", current.display());
        Ok(())
    }

    /// Restore the current snapshot through `restore`.
    ///
    /// `Ok(None)` when no snapshot exists yet; an unreadable
    /// snapshot is an error, the backup is never tried silently.
    pub fn load<M, F>(&self, restore: F) -> Result<Option<M>>
    where
        F: FnOnce(&Path) -> Result<M>,
    {
        let current = self.checkpoint_path();
        if !current.exists() {
            tracing::debug!("No checkpoint at '{}'", current.display());
            return Ok(None);
        }
        tracing::info!("Loading checkpoint '{}'", current.display());
        restore(&current).map(Some)
    }

    /// Save the training configuration to JSON, so a later run can
    /// rebuild the same model before loading weights into it.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    /// `Ok(None)` if no config was saved yet.
    pub fn load_config(&self) -> Result<Option<TrainConfig>> {
        let path = self.dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read config from '{}'", path.display()))?;
        let cfg = serde_json::from_str(&json)
            .with_context(|| format!("Malformed config '{}'", path.display()))?;
        Ok(Some(cfg))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;

    /// Writes its generation number as the snapshot body.
    struct Snapshot(u32);

    impl Persistable for Snapshot {
        fn save(&self, path: &Path) -> Result<()> {
            fs::write(path, self.0.to_string())?;
            Ok(())
        }
    }

    fn read(path: &Path) -> Result<u32> {
        Ok(fs::read_to_string(path)?.parse()?)
    }

    fn manager(name: &str) -> CheckpointManager {
        let dir = std::env::temp_dir().join(format!("seq2seq-ckpt-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        CheckpointManager::new(dir).unwrap()
    }

    fn files(m: &CheckpointManager) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(m.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_first_save_has_no_backup() {
        let m = manager("first");
        m.save(&Snapshot(1)).unwrap();
        assert_eq!(files(&m), vec![CHECKPOINT_FILE.to_string()]);
        assert_eq!(read(&m.checkpoint_path()).unwrap(), 1);
        let _ = fs::remove_dir_all(m.dir());
    }

    #[test]
    fn test_keeps_exactly_one_backup() {
        let m = manager("rotate");
        for generation in 1..=5 {
            m.save(&Snapshot(generation)).unwrap();
        }
        assert_eq!(files(&m), vec![BACKUP_FILE.to_string(), CHECKPOINT_FILE.to_string()]);
        assert_eq!(read(&m.checkpoint_path()).unwrap(), 5);
        assert_eq!(read(&m.backup_path()).unwrap(), 4);
        let _ = fs::remove_dir_all(m.dir());
    }

    #[test]
    fn test_failed_write_keeps_previous_as_backup() {
        struct Broken;
        impl Persistable for Broken {
            fn save(&self, _path: &Path) -> Result<()> {
                bail!("disk full")
            }
        }

        let m = manager("broken");
        m.save(&Snapshot(7)).unwrap();
        assert!(m.save(&Broken).is_err());
        assert!(!m.has_checkpoint());
        assert_eq!(read(&m.backup_path()).unwrap(), 7);
        let _ = fs::remove_dir_all(m.dir());
    }

    #[test]
    fn test_load_absent_and_present() {
        let m = manager("load");
        assert!(m.load(read).unwrap().is_none());

        m.save(&Snapshot(3)).unwrap();
        assert_eq!(m.load(read).unwrap(), Some(3));
        let _ = fs::remove_dir_all(m.dir());
    }

    #[test]
    fn test_corrupt_checkpoint_is_an_error() {
        let m = manager("corrupt");
        fs::write(m.checkpoint_path(), "not a number").unwrap();
        assert!(m.load(read).is_err());
        let _ = fs::remove_dir_all(m.dir());
    }

    #[test]
    fn test_config_round_trip() {
        let m = manager("config");
        assert!(m.load_config().unwrap().is_none());

        let cfg = TrainConfig { hidden_width: 64, ..TrainConfig::default() };
        m.save_config(&cfg).unwrap();
        let back = m.load_config().unwrap().unwrap();
        assert_eq!(back.hidden_width, 64);
        assert_eq!(back.row_size, cfg.row_size);
        let _ = fs::remove_dir_all(m.dir());
    }
}
