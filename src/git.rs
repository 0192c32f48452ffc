//! # Version-Control Oracle
//!
//! The oracle answers one question about a path that has gone missing from
//! the working tree: was it ever under version control? The answer decides
//! whether a specification may be pruned, so every failure mode collapses
//! to [`VcsStatus::Unknown`], which callers must treat as "not enough
//! evidence".
//!
//! [`GitOracle`] shells out to the system `git` binary. Each invocation runs
//! under a timeout and is killed when it expires. The reconciler only asks
//! about suspected orphans, so the number of git processes is bounded by
//! the number of missing sources, not by the size of the tree.

use std::cell::{Cell, OnceCell};
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};
use serde::Serialize;

use crate::error::{Error, Result};

/// What version control knows about a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VcsStatus {
    /// Tracked and present in the working tree.
    Tracked,
    /// Tracked at some point, absent from the working tree now.
    TrackedThenDeleted,
    /// No trace of the path in the index or in history.
    NeverTracked,
    /// No repository, git unavailable, or the query failed or timed out.
    Unknown,
}

impl VcsStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VcsStatus::Tracked => "tracked",
            VcsStatus::TrackedThenDeleted => "tracked-then-deleted",
            VcsStatus::NeverTracked => "never-tracked",
            VcsStatus::Unknown => "unknown",
        }
    }
}

/// Answers version-control questions about workspace paths
pub trait VcsOracle {
    /// Classify an absolute path inside the workspace.
    fn classify(&self, path: &Path) -> VcsStatus;

    /// Number of external queries issued so far.
    fn queries(&self) -> usize {
        0
    }
}

/// Oracle used when version control is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoVcs;

impl VcsOracle for NoVcs {
    fn classify(&self, _path: &Path) -> VcsStatus {
        VcsStatus::Unknown
    }
}

/// Map-backed oracle for tests and embedding
#[derive(Debug, Default)]
pub struct StaticOracle {
    answers: HashMap<PathBuf, VcsStatus>,
    fallback: Option<VcsStatus>,
    asked: Cell<usize>,
}

impl StaticOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `status` for this exact path.
    pub fn with(mut self, path: impl Into<PathBuf>, status: VcsStatus) -> Self {
        self.answers.insert(path.into(), status);
        self
    }

    /// Answer `status` for every path without an explicit entry.
    pub fn with_fallback(mut self, status: VcsStatus) -> Self {
        self.fallback = Some(status);
        self
    }
}

impl VcsOracle for StaticOracle {
    fn classify(&self, path: &Path) -> VcsStatus {
        self.asked.set(self.asked.get() + 1);
        self.answers
            .get(path)
            .copied()
            .or(self.fallback)
            .unwrap_or(VcsStatus::Unknown)
    }

    fn queries(&self) -> usize {
        self.asked.get()
    }
}

/// Oracle backed by the system `git` binary
#[derive(Debug)]
pub struct GitOracle {
    workdir: PathBuf,
    timeout: Duration,
    toplevel: OnceCell<Option<PathBuf>>,
    issued: Cell<usize>,
}

impl GitOracle {
    /// Create an oracle for the repository enclosing `workdir`.
    ///
    /// Repository detection is deferred to the first query so a run without
    /// suspected orphans never spawns git.
    pub fn new(workdir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            workdir: workdir.into(),
            timeout,
            toplevel: OnceCell::new(),
            issued: Cell::new(0),
        }
    }

    /// Root of the enclosing repository, if any.
    pub fn toplevel(&self) -> Option<&Path> {
        self.toplevel
            .get_or_init(|| {
                match self.git(&self.workdir, &["rev-parse", "--show-toplevel"]) {
                    Ok(out) if out.success => {
                        let root = PathBuf::from(out.stdout.trim());
                        debug!("Detected git repository at {}", root.display());
                        Some(root)
                    }
                    Ok(_) => {
                        debug!("{} is not inside a git repository", self.workdir.display());
                        None
                    }
                    Err(err) => {
                        warn!("Cannot query git: {}", err);
                        None
                    }
                }
            })
            .as_deref()
    }

    fn git(&self, cwd: &Path, args: &[&str]) -> Result<GitOutput> {
        self.issued.set(self.issued.get() + 1);
        run_git(cwd, args, self.timeout)
    }

    fn try_classify(&self, path: &Path) -> Result<VcsStatus> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workdir.join(path)
        };
        // Pathspecs are resolved against the working directory, which keeps
        // symlinked temp roots from looking like paths outside the repository.
        let relative = absolute.strip_prefix(&self.workdir).unwrap_or(&absolute);
        let spec = relative.to_string_lossy().replace('\\', "/");
        let present = absolute.exists();

        if present {
            let in_index = self.git(&self.workdir, &["ls-files", "--error-unmatch", "--", &spec])?;
            return Ok(if in_index.success {
                VcsStatus::Tracked
            } else {
                VcsStatus::NeverTracked
            });
        }

        // A missing path only counts as deleted when some commit contained
        // it. Staged-only paths never reached history.
        let history = self.git(
            &self.workdir,
            &["log", "--all", "--format=%H", "-n", "1", "--", &spec],
        )?;
        if !history.success {
            return Err(Error::GitCommand {
                command: "log".to_string(),
                stderr: history.stderr,
            });
        }

        Ok(if history.stdout.trim().is_empty() {
            VcsStatus::NeverTracked
        } else {
            VcsStatus::TrackedThenDeleted
        })
    }
}

impl VcsOracle for GitOracle {
    fn classify(&self, path: &Path) -> VcsStatus {
        if self.toplevel().is_none() {
            return VcsStatus::Unknown;
        }

        match self.try_classify(path) {
            Ok(status) => {
                debug!("{} is {}", path.display(), status.as_str());
                status
            }
            Err(err) => {
                warn!("Treating {} as unknown: {}", path.display(), err);
                VcsStatus::Unknown
            }
        }
    }

    fn queries(&self) -> usize {
        self.issued.get()
    }
}

struct GitOutput {
    success: bool,
    stdout: String,
    stderr: String,
}

/// Run git with a hard deadline, killing the process when it expires.
fn run_git(cwd: &Path, args: &[&str], timeout: Duration) -> Result<GitOutput> {
    let command = args.first().copied().unwrap_or_default().to_string();

    let mut child = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .env("GIT_TERMINAL_PROMPT", "0")
        // Identifiers such as `pages/[id].tsx` are paths, not globs.
        .env("GIT_LITERAL_PATHSPECS", "1")
        .env("LC_ALL", "C")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| Error::GitCommand {
            command: command.clone(),
            stderr: e.to_string(),
        })?;

    // Drain the pipes on helper threads so a chatty child cannot block on a
    // full pipe while we wait for it.
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let started = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if started.elapsed() >= timeout => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::GitCommand {
                    command,
                    stderr: format!("timed out after {}s", timeout.as_secs_f64()),
                });
            }
            Ok(None) => thread::sleep(Duration::from_millis(10)),
            Err(e) => {
                return Err(Error::GitCommand {
                    command,
                    stderr: e.to_string(),
                })
            }
        }
    };

    let collect = |handle: Option<thread::JoinHandle<String>>| {
        handle.and_then(|h| h.join().ok()).unwrap_or_default()
    };

    Ok(GitOutput {
        success: status.success(),
        stdout: collect(stdout),
        stderr: collect(stderr),
    })
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}
