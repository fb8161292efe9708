//! Loading contestant entry points.
//!
//! A submission module exposes two entry points, `prep_env` and `forecast`.
//! [`ScriptLoader`] runs each call in its own subprocess, started in the
//! module's directory, so nothing a submission does leaks into the
//! evaluator's process state:
//!
//! - `<interpreter> <script> prep_env` prints one JSON object on stdout.
//! - `<interpreter> <script> forecast` reads the [`Settings`] JSON on stdin
//!   and prints a `turbines × timesteps × variables` JSON array on stdout.
//!
//! stderr is inherited so contestant logs reach the evaluation log.

use std::collections::BTreeMap;
use std::fs::{self, Metadata};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, error};

use crate::config::LoaderConfig;
use crate::data::Prediction;
use crate::settings::Settings;

/// Why a module could not be loaded.
///
/// The three kinds let a caller tell "missing" from "broken" from "failed
/// for another reason".
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("module not found: {0}")]
    ModuleNotFound(String),
    #[error("import failed: {0}")]
    ImportFailure(String),
    #[error("{0}")]
    LoaderFailure(String),
}

/// A failed entry-point call.
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("failed to run `{entry}` of {}: {source}", .path.display())]
    Io {
        entry: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("`{entry}` of {} exited with {status}", .path.display())]
    Exited {
        entry: &'static str,
        path: PathBuf,
        status: ExitStatus,
    },
    #[error("`{entry}` of {} produced malformed JSON: {source}", .path.display())]
    Protocol {
        entry: &'static str,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// Failure reported by an in-process [`SubmissionModule`]
    /// implementation that has no subprocess status to report.
    #[error("`{entry}` failed: {message}")]
    Failed {
        entry: &'static str,
        message: String,
    },
}

/// The two entry points every submission provides.
pub trait SubmissionModule {
    /// Returns the contestant's experimental settings.
    fn prep_env(&mut self) -> Result<Map<String, Value>, ModuleError>;

    /// Forecasts one test case described by `settings`.
    fn forecast(&mut self, settings: &Settings) -> Result<Prediction, ModuleError>;
}

/// Resolves a file path into a callable [`SubmissionModule`].
pub trait ModuleLoader {
    /// # Errors
    ///
    /// Returns `ModuleNotFound` when `path` does not exist, `ImportFailure`
    /// when it exists but is not loadable, and `LoaderFailure` otherwise.
    fn load(&self, path: &Path) -> Result<Box<dyn SubmissionModule>, LoaderError>;
}

/// Loads entry-point scripts and runs them as subprocesses.
#[derive(Debug, Clone)]
pub struct ScriptLoader {
    interpreters: BTreeMap<String, String>,
}

impl ScriptLoader {
    /// Creates a loader with an interpreter per file extension.
    pub fn new(interpreters: BTreeMap<String, String>) -> Self {
        Self { interpreters }
    }

    pub fn from_config(config: &LoaderConfig) -> Self {
        Self::new(config.interpreters.clone())
    }

    fn resolve(&self, path: &Path) -> Result<ScriptModule, LoaderError> {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let metadata = match fs::metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(LoaderError::ModuleNotFound(format!(
                    "No module named '{stem}' in {}",
                    parent_dir(path).display()
                )));
            }
            Err(e) => return Err(import_error(&e, path)),
        };
        if !metadata.is_file() {
            return Err(LoaderError::ImportFailure(format!(
                "cannot import '{stem}': {} is not a file",
                path.display()
            )));
        }
        if stem.is_empty() {
            return Err(LoaderError::ImportFailure(format!(
                "cannot derive a module name from {}",
                path.display()
            )));
        }

        let script = fs::canonicalize(path).map_err(|e| import_error(&e, path))?;
        let interpreter = script
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| self.interpreters.get(ext))
            .cloned();
        if interpreter.is_none() && !is_executable(&metadata) {
            return Err(LoaderError::ImportFailure(format!(
                "cannot import '{stem}': no interpreter registered for {} and it is not executable",
                path.display()
            )));
        }

        let dir = parent_dir(&script).to_path_buf();
        Ok(ScriptModule {
            interpreter,
            script,
            dir,
        })
    }
}

impl Default for ScriptLoader {
    fn default() -> Self {
        Self::from_config(&LoaderConfig::default())
    }
}

impl ModuleLoader for ScriptLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn SubmissionModule>, LoaderError> {
        match self.resolve(path) {
            Ok(module) => {
                debug!(path = %path.display(), interpreter = ?module.interpreter, "module loaded");
                Ok(Box::new(module))
            }
            Err(e) => {
                error!(path = %path.display(), error = ?e, "failed to load module");
                Err(e)
            }
        }
    }
}

fn import_error(error: &io::Error, path: &Path) -> LoaderError {
    LoaderError::LoaderFailure(format!(
        "IMPORT ERROR: {error}. Load module [path: {}]",
        path.display()
    ))
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

#[cfg(unix)]
fn is_executable(metadata: &Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &Metadata) -> bool {
    false
}

/// A submission script invoked once per entry-point call.
#[derive(Debug, Clone)]
pub struct ScriptModule {
    interpreter: Option<String>,
    script: PathBuf,
    dir: PathBuf,
}

impl ScriptModule {
    pub fn script(&self) -> &Path {
        &self.script
    }

    fn call(&self, entry: &'static str, input: Option<&[u8]>) -> Result<Vec<u8>, ModuleError> {
        let io_err = |source: io::Error| ModuleError::Io {
            entry,
            path: self.script.clone(),
            source,
        };

        let mut cmd = match &self.interpreter {
            Some(program) => {
                let mut c = Command::new(program);
                c.arg(&self.script);
                c
            }
            None => Command::new(&self.script),
        };
        cmd.arg(entry)
            .current_dir(&self.dir)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        debug!(entry, script = %self.script.display(), "invoking entry point");
        let mut child = cmd.spawn().map_err(io_err)?;

        if let (Some(bytes), Some(mut stdin)) = (input, child.stdin.take()) {
            match stdin.write_all(bytes) {
                // the module may exit without reading its input
                Err(e) if e.kind() != io::ErrorKind::BrokenPipe => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(io_err(e));
                }
                _ => {}
            }
        }

        let output = child.wait_with_output().map_err(io_err)?;
        if !output.status.success() {
            return Err(ModuleError::Exited {
                entry,
                path: self.script.clone(),
                status: output.status,
            });
        }
        Ok(output.stdout)
    }

    fn protocol_err(&self, entry: &'static str, source: serde_json::Error) -> ModuleError {
        ModuleError::Protocol {
            entry,
            path: self.script.clone(),
            source,
        }
    }
}

impl SubmissionModule for ScriptModule {
    fn prep_env(&mut self) -> Result<Map<String, Value>, ModuleError> {
        let stdout = self.call("prep_env", None)?;
        serde_json::from_slice(&stdout).map_err(|e| self.protocol_err("prep_env", e))
    }

    fn forecast(&mut self, settings: &Settings) -> Result<Prediction, ModuleError> {
        let input = serde_json::to_vec(settings).map_err(|e| self.protocol_err("forecast", e))?;
        let stdout = self.call("forecast", Some(&input))?;
        serde_json::from_slice(&stdout).map_err(|e| self.protocol_err("forecast", e))
    }
}
