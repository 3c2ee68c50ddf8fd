//! Numbered, size-based rotation of the log file

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;

use crate::logger::config::RotationConfig;

pub struct RotationManager {
    config: RotationConfig,
}

impl RotationManager {
    pub fn new(config: RotationConfig) -> Self {
        Self { config }
    }

    pub fn should_rotate(&self, current_file_size: u64) -> bool {
        current_file_size >= self.config.max_size
    }

    /// Shifts `app.log.N` to `app.log.N+1`, drops the oldest and moves the
    /// active file to `app.log.1` (gzipped when compression is on).
    pub fn rotate(&self, current_path: &Path) -> io::Result<()> {
        let max_files = self.config.max_files;

        for candidate in self.variants(current_path, max_files) {
            if candidate.exists() {
                fs::remove_file(&candidate)?;
            }
        }

        for index in (1..max_files).rev() {
            for (from, to) in self
                .variants(current_path, index)
                .into_iter()
                .zip(self.variants(current_path, index + 1))
            {
                if from.exists() {
                    fs::rename(&from, &to)?;
                }
            }
        }

        if current_path.exists() {
            let first = rotated_path(current_path, 1);
            fs::rename(current_path, &first)?;
            if self.config.compress {
                compress_file(&first)?;
            }
        }

        Ok(())
    }

    fn variants(&self, base: &Path, index: usize) -> [PathBuf; 2] {
        let plain = rotated_path(base, index);
        let gz = gz_path(&plain);
        [plain, gz]
    }
}

fn rotated_path(base: &Path, index: usize) -> PathBuf {
    let name = base.file_name().unwrap_or_default().to_string_lossy();
    base.with_file_name(format!("{}.{}", name, index))
}

fn gz_path(path: &Path) -> PathBuf {
    let name = path.file_name().unwrap_or_default().to_string_lossy();
    path.with_file_name(format!("{}.gz", name))
}

/// Replaces `path` with `path.gz`.
fn compress_file(path: &Path) -> io::Result<()> {
    let input = fs::read(path)?;
    let mut encoder = GzEncoder::new(File::create(gz_path(path))?, Compression::default());
    encoder.write_all(&input)?;
    encoder.finish()?;
    fs::remove_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use proptest::prelude::*;
    use std::io::Read;
    use tempfile::tempdir;

    fn manager(max_files: usize, compress: bool) -> RotationManager {
        RotationManager::new(RotationConfig {
            max_size: 1024,
            max_files,
            compress,
        })
    }

    #[test]
    fn test_rotation_shifts_numbered_files() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("app.log");
        let manager = manager(2, false);

        fs::write(&log, "first").unwrap();
        manager.rotate(&log).unwrap();
        fs::write(&log, "second").unwrap();
        manager.rotate(&log).unwrap();
        fs::write(&log, "third").unwrap();
        manager.rotate(&log).unwrap();

        assert!(!log.exists());
        assert_eq!(fs::read_to_string(dir.path().join("app.log.1")).unwrap(), "third");
        assert_eq!(fs::read_to_string(dir.path().join("app.log.2")).unwrap(), "second");
        assert!(!dir.path().join("app.log.3").exists());
    }

    #[test]
    fn test_rotation_compresses_when_enabled() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("app.log");
        fs::write(&log, "cycle finished").unwrap();

        manager(3, true).rotate(&log).unwrap();

        let gz = dir.path().join("app.log.1.gz");
        assert!(gz.exists());
        assert!(!dir.path().join("app.log.1").exists());

        let mut decoded = String::new();
        GzDecoder::new(File::open(gz).unwrap())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, "cycle finished");
    }

    proptest! {
        #[test]
        fn property_rotation_triggers_at_max_size(
            current_size in 0u64..10_000_000u64,
            max_size in 1u64..10_000_000u64
        ) {
            let manager = RotationManager::new(RotationConfig { max_size, max_files: 5, compress: false });
            prop_assert_eq!(manager.should_rotate(current_size), current_size >= max_size);
        }
    }
}
