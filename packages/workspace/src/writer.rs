//! # Source Writer
//!
//! Formats generated text and replaces files atomically. Each write is
//! announced to the self-edit filter first so the watcher does not report
//! it back as an outside change.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use tessera_common::FileSystem;

use crate::config::{Config, FormatterConfig};
use crate::diff::CodeDiff;
use crate::errors::WriteError;
use crate::self_edit::SelfEditFilter;

pub trait Formatter: Send + Sync {
    fn format(&self, path: &Path, source: &str) -> Result<String, WriteError>;
}

/// Leaves text unchanged
pub struct NoopFormatter;

impl Formatter for NoopFormatter {
    fn format(&self, _path: &Path, source: &str) -> Result<String, WriteError> {
        Ok(source.to_string())
    }
}

/// Pipes the text through an external command (stdin to stdout)
pub struct ExternalFormatter {
    config: FormatterConfig,
}

impl ExternalFormatter {
    pub fn new(config: FormatterConfig) -> Self {
        Self { config }
    }
}

impl Formatter for ExternalFormatter {
    fn format(&self, path: &Path, source: &str) -> Result<String, WriteError> {
        let error = |message: String| WriteError::Format {
            path: path.to_path_buf(),
            message,
        };

        let mut child = Command::new(&self.config.command)
            .args(self.config.args_for(path))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| error(format!("{}: {}", self.config.command, e)))?;

        // Input is fed from another thread while the output is collected
        let stdin = child.stdin.take();
        let input = source.to_string();
        let feeder = std::thread::spawn(move || match stdin {
            Some(mut stdin) => stdin.write_all(input.as_bytes()),
            None => Ok(()),
        });

        let output = child
            .wait_with_output()
            .map_err(|e| error(format!("waiting for {}: {}", self.config.command, e)))?;

        match feeder.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(error(format!("writing input: {}", e))),
            Err(_) => return Err(error("input thread panicked".to_string())),
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(error(format!("{} exited with {}: {}", self.config.command, output.status, stderr.trim())));
        }
        let stdout = String::from_utf8(output.stdout)
            .map_err(|_| error("formatter output is not UTF-8".to_string()))?;
        if stdout.trim().is_empty() && !source.trim().is_empty() {
            return Err(error("formatter produced no output".to_string()));
        }
        Ok(stdout)
    }
}

pub fn formatter_for(config: &Config) -> Arc<dyn Formatter> {
    match &config.formatter {
        Some(formatter) => Arc::new(ExternalFormatter::new(formatter.clone())),
        None => Arc::new(NoopFormatter),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileWriteResult {
    pub path: PathBuf,
    /// False when the formatter failed and the unformatted text was written
    pub formatted: bool,
    pub result: Result<(), WriteError>,
}

impl FileWriteResult {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteReport {
    pub results: Vec<FileWriteResult>,
}

impl WriteReport {
    /// True only if every file was written
    pub fn success(&self) -> bool {
        self.results.iter().all(FileWriteResult::is_ok)
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileWriteResult> {
        self.results.iter().filter(|result| !result.is_ok())
    }
}

pub struct SourceWriter {
    fs: Arc<dyn FileSystem>,
    filter: Arc<SelfEditFilter>,
    formatter: Arc<dyn Formatter>,
}

impl SourceWriter {
    pub fn new(fs: Arc<dyn FileSystem>, filter: Arc<SelfEditFilter>, formatter: Arc<dyn Formatter>) -> Self {
        Self { fs, filter, formatter }
    }

    /// Format and persist one diff
    pub fn write_one(&self, diff: &CodeDiff) -> FileWriteResult {
        let (text, formatted) = match self.formatter.format(&diff.path, &diff.generated) {
            Ok(text) => (text, true),
            Err(e) => {
                tracing::warn!("{}; writing unformatted text", e);
                (diff.generated.clone(), false)
            }
        };

        let token = self.filter.register(&diff.path, &text);
        let result = match self.fs.write_atomic(&diff.path, &text) {
            Ok(()) => {
                tracing::info!(path = %diff.path.display(), "wrote file");
                Ok(())
            }
            Err(e) => {
                self.filter.cancel(&token);
                tracing::warn!(path = %diff.path.display(), "Failed to write file: {}", e);
                Err(WriteError::Io {
                    path: diff.path.clone(),
                    message: e.to_string(),
                })
            }
        };

        FileWriteResult {
            path: diff.path.clone(),
            formatted,
            result,
        }
    }

    /// Write every diff; a failed file does not stop the others
    pub fn write(&self, diffs: &[CodeDiff]) -> WriteReport {
        WriteReport {
            results: diffs.iter().map(|diff| self.write_one(diff)).collect(),
        }
    }
}
