//! Filesystem step runner: error classification and retry of transient failures.

use std::io::{self, ErrorKind};
use std::path::Path;
use std::thread;
use std::time::Duration;

use crate::config::DbConfig;
use crate::error::{Result, StructDbError};

/// Whether an I/O failure is worth repeating unchanged.
pub fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
    )
}

/// Maps a failed filesystem `step` on `path` to a [`StructDbError`].
pub fn classify_io_error(error: io::Error, step: &str, path: &Path) -> StructDbError {
    if error.kind() == ErrorKind::NotFound {
        return StructDbError::NotFound {
            searched: path.display().to_string(),
        };
    }
    let message = format!("{} {}: {}", step, path.display(), error);
    if error.kind() == ErrorKind::StorageFull {
        StructDbError::DiskFull(message)
    } else if is_transient(&error) {
        StructDbError::TransientIoError(message)
    } else {
        StructDbError::IoError(message)
    }
}

/// How often a single filesystem step is repeated while it fails transiently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    /// Run every step exactly once.
    pub const NONE: RetryPolicy = RetryPolicy {
        max_retries: 0,
        delay: Duration::ZERO,
    };

    pub fn from_config(config: &DbConfig) -> Self {
        Self {
            max_retries: config.persistence_max_retries,
            delay: Duration::from_millis(config.persistence_retry_delay_ms),
        }
    }

    /// Runs `op`, repeating it on transient errors until the retries are used up.
    ///
    /// Only the failing step is repeated, so a save that already wrote its temp
    /// file retries just the rename.
    pub fn run<T, F>(&self, step: &str, path: &Path, mut op: F) -> Result<T>
    where
        F: FnMut() -> io::Result<T>,
    {
        let mut attempt = 0;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if is_transient(&e) && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        "{} {} failed (attempt {}/{}): {}",
                        step,
                        path.display(),
                        attempt,
                        self.max_retries,
                        e
                    );
                    if !self.delay.is_zero() {
                        thread::sleep(self.delay);
                    }
                }
                Err(e) => return Err(classify_io_error(e, step, path)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            delay: Duration::ZERO,
        }
    }

    #[test]
    fn test_classify_io_error() {
        let path = Path::new("db/structdb.dat");

        let err = classify_io_error(io::Error::from(ErrorKind::NotFound), "read", path);
        assert!(matches!(err, StructDbError::NotFound { searched } if searched == "db/structdb.dat"));

        let err = classify_io_error(io::Error::from(ErrorKind::Interrupted), "write", path);
        assert!(matches!(err, StructDbError::TransientIoError(_)));

        let err = classify_io_error(io::Error::from(ErrorKind::PermissionDenied), "rename", path);
        assert!(matches!(err, StructDbError::IoError(msg) if msg.starts_with("rename db/structdb.dat")));
    }

    #[test]
    fn test_transient_step_is_repeated() {
        let calls = Cell::new(0);
        let result = policy(3).run("rename", Path::new("x"), || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(io::Error::from(ErrorKind::Interrupted))
            } else {
                Ok(42)
            }
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_retries_run_out() {
        let calls = Cell::new(0);
        let result: Result<()> = policy(2).run("write", Path::new("x"), || {
            calls.set(calls.get() + 1);
            Err(io::Error::from(ErrorKind::TimedOut))
        });
        assert!(matches!(result, Err(StructDbError::TransientIoError(_))));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_permanent_error_runs_once() {
        let calls = Cell::new(0);
        let result: Result<()> = policy(5).run("write", Path::new("x"), || {
            calls.set(calls.get() + 1);
            Err(io::Error::from(ErrorKind::PermissionDenied))
        });
        assert!(matches!(result, Err(StructDbError::IoError(_))));
        assert_eq!(calls.get(), 1);

        let calls = Cell::new(0);
        let _ = RetryPolicy::NONE.run("write", Path::new("x"), || {
            calls.set(calls.get() + 1);
            Err::<(), _>(io::Error::from(ErrorKind::Interrupted))
        });
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_policy_from_config() {
        let config = DbConfig {
            persistence_max_retries: 7,
            persistence_retry_delay_ms: 25,
            ..DbConfig::default()
        };
        assert_eq!(
            RetryPolicy::from_config(&config),
            RetryPolicy {
                max_retries: 7,
                delay: Duration::from_millis(25)
            }
        );
    }
}
