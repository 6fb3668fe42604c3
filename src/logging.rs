use crate::error::Result;
use env_logger::{Builder, Env, Target};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

static LOG_FILE: Mutex<Option<File>> = Mutex::new(None);

// Rotate once the log passes 5 MB
const MAX_LOG_SIZE: u64 = 5 * 1024 * 1024;
// Rotated generations kept next to the live log
const KEPT_GENERATIONS: usize = 3;

const DEFAULT_FILTER: &str = "warn,referral_client=info,referral_cli=info";

fn generation_path(log_file_path: &Path, generation: usize) -> PathBuf {
    let mut name = log_file_path.as_os_str().to_owned();
    name.push(format!(".{generation}"));
    PathBuf::from(name)
}

/// Shifts `log` to `log.1`, `log.1` to `log.2` and so on, dropping the oldest.
fn rotate_if_needed(log_file_path: &Path) -> Result<()> {
    let too_big = fs::metadata(log_file_path)
        .map(|m| m.len() > MAX_LOG_SIZE)
        .unwrap_or(false);
    if !too_big {
        return Ok(());
    }

    let oldest = generation_path(log_file_path, KEPT_GENERATIONS);
    if oldest.exists() {
        fs::remove_file(&oldest)?;
    }

    for generation in (1..KEPT_GENERATIONS).rev() {
        let from = generation_path(log_file_path, generation);
        if from.exists() {
            fs::rename(&from, generation_path(log_file_path, generation + 1))?;
        }
    }

    fs::rename(log_file_path, generation_path(log_file_path, 1))?;
    Ok(())
}

/// Log to stderr and to `log_file_path`. `RUST_LOG` overrides the filter.
pub fn init_logging(log_file_path: &Path) -> Result<()> {
    rotate_if_needed(log_file_path)?;

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;
    *LOG_FILE.lock().unwrap_or_else(|e| e.into_inner()) = Some(log_file);

    let mut builder = Builder::from_env(Env::default().default_filter_or(DEFAULT_FILTER));
    builder.target(Target::Stderr);
    builder.format(|buf, record| {
        let line = format!(
            "[{}] {} {}: {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.target(),
            record.args()
        );

        writeln!(buf, "{line}")?;

        if let Ok(mut guard) = LOG_FILE.lock() {
            if let Some(file) = guard.as_mut() {
                writeln!(file, "{line}").ok();
                file.flush().ok();
            }
        }

        Ok(())
    });

    builder.try_init().map_err(|e| {
        crate::error::ClientError::Other(format!("Logger already initialized: {e}"))
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_rotation_keeps_bounded_generations() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let log = temp_dir.path().join("referral-cli.log");

        for generation in 1..=KEPT_GENERATIONS {
            fs::write(generation_path(&log, generation), format!("gen {generation}")).unwrap();
        }
        let big = vec![b'x'; (MAX_LOG_SIZE + 1) as usize];
        fs::write(&log, &big).unwrap();

        rotate_if_needed(&log).unwrap();

        assert!(!log.exists());
        assert_eq!(fs::metadata(generation_path(&log, 1)).unwrap().len(), MAX_LOG_SIZE + 1);
        assert_eq!(fs::read_to_string(generation_path(&log, 2)).unwrap(), "gen 1");
        assert_eq!(fs::read_to_string(generation_path(&log, 3)).unwrap(), "gen 2");
        assert!(!generation_path(&log, KEPT_GENERATIONS + 1).exists());
    }

    #[test]
    fn test_small_log_is_not_rotated() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let log = temp_dir.path().join("referral-cli.log");
        fs::write(&log, "short").unwrap();

        rotate_if_needed(&log).unwrap();

        assert!(log.exists());
        assert!(!generation_path(&log, 1).exists());
    }
}
