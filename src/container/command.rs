//! Persisted command records
//!
//! A record lives at `<container>/.docker/run/exec/<name>/`:
//!
//! - `cmd`: the program path and arguments, NUL-joined
//! - `env/<KEY>`: one file per environment entry, holding the value
//! - `wd`: working directory, relative to the container root
//!
//! The on-disk record is the source of truth. Loading restores the command
//! line and working directory; the environment is written but not read back.

use std::io;
use std::path::PathBuf;
use std::process::{self, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use super::types::Container;
use crate::error::{MkError, Result};
use crate::util::fs::{create_dir_all, mk_unique_dir, read_file, write_file};

/// Command namespace inside a container.
pub const EXEC_DIR: &str = ".docker/run/exec";

const CMDLINE_SEPARATOR: &str = "\0";

/// How long `run_forwarded` keeps copying output after the process exited.
const DRAIN_GRACE: Duration = Duration::from_millis(200);

/// A named process invocation scoped to a container
#[derive(Debug, Clone)]
pub struct Command {
    /// Record name; empty until one is allocated by `store`
    pub name: String,
    /// Program to execute
    pub path: String,
    /// Arguments, not including the program
    pub args: Vec<String>,
    /// Extra `KEY=VALUE` entries, applied after the container's base environment
    pub env: Vec<String>,
    /// Working directory relative to the container root
    pub dir: String,
    container: Container,
}

impl Command {
    pub(crate) fn new<I, S>(container: Container, name: &str, path: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            env: Vec::new(),
            dir: String::new(),
            container,
        }
    }

    /// The container this record belongs to
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Path of `segments` inside this record's directory.
    pub fn record_path(&self, segments: &[&str]) -> PathBuf {
        let mut parts = vec![EXEC_DIR, self.name.as_str()];
        parts.extend_from_slice(segments);
        self.container.path(parts)
    }

    /// Write the record to disk, claiming a name first if it has none.
    pub fn store(&mut self) -> Result<()> {
        self.lock_name()?;
        debug!(
            "Storing {}:{} on {}",
            self.container.id,
            self.name,
            self.record_path(&[]).display()
        );

        let mut cmdline = Vec::with_capacity(self.args.len() + 1);
        cmdline.push(self.path.as_str());
        cmdline.extend(self.args.iter().map(String::as_str));
        write_file(&self.record_path(&["cmd"]), &cmdline.join(CMDLINE_SEPARATOR))?;

        for entry in &self.env {
            let (key, value) = split_env(entry);
            write_file(&self.record_path(&["env", key]), value)?;
        }

        write_file(&self.record_path(&["wd"]), &self.dir)?;
        Ok(())
    }

    /// Reload the command line and working directory from disk.
    pub fn load(&mut self) -> Result<()> {
        let cmdline = read_file(&self.record_path(&["cmd"])).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                MkError::not_found("command", self.name.clone())
            } else {
                MkError::Io(e)
            }
        })?;
        let mut parts = cmdline.split(CMDLINE_SEPARATOR);
        self.path = parts.next().unwrap_or_default().to_string();
        self.args = parts.map(str::to_string).collect();

        // TODO: read env/ back once entries can be told apart from the base environment
        match read_file(&self.record_path(&["wd"])) {
            Ok(wd) => self.dir = wd,
            Err(_) => debug!("No working directory for {}:{}", self.container.id, self.name),
        }
        Ok(())
    }

    fn lock_name(&mut self) -> Result<()> {
        if !self.name.is_empty() {
            return Ok(create_dir_all(&self.record_path(&[]))?);
        }
        self.name = mk_unique_dir(&self.container.path([EXEC_DIR]))?;
        Ok(())
    }

    /// Build the process: working directory resolved under the container
    /// root, environment reset to the base environment plus `env`.
    fn prepare(&self) -> process::Command {
        let mut command = process::Command::new(&self.path);
        command
            .args(&self.args)
            .current_dir(self.container.path([&self.dir]))
            .stdin(Stdio::null())
            .env_clear();
        for entry in self.container.base_env().iter().chain(&self.env) {
            let (key, value) = split_env(entry);
            command.env(key, value);
        }
        command
    }

    /// Run in the foreground with inherited output, blocking until exit.
    pub fn run(&self) -> Result<()> {
        debug!("Running {}:{}: {} {:?}", self.container.id, self.name, self.path, self.args);
        let status = self.prepare().status()?;
        self.check(status)
    }

    /// Run with stdout and stderr copied to this process's own streams,
    /// blocking until exit.
    pub fn run_forwarded(&self) -> Result<()> {
        debug!("Attaching to stdout and stderr of {}:{}", self.container.id, self.name);
        let mut child = self
            .prepare()
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let (done_tx, done_rx) = mpsc::channel();
        let mut copiers = 0;
        if let Some(mut out) = child.stdout.take() {
            let done = done_tx.clone();
            thread::spawn(move || {
                let _ = io::copy(&mut out, &mut io::stdout());
                let _ = done.send(());
            });
            copiers += 1;
        }
        if let Some(mut err) = child.stderr.take() {
            let done = done_tx.clone();
            thread::spawn(move || {
                let _ = io::copy(&mut err, &mut io::stderr());
                let _ = done.send(());
            });
            copiers += 1;
        }
        drop(done_tx);

        debug!("Waiting for {}:{}", self.container.id, self.name);
        let status = child.wait()?;

        // Background processes left behind may keep the pipes open; their
        // copiers are detached once the grace period runs out.
        let deadline = Instant::now() + DRAIN_GRACE;
        for _ in 0..copiers {
            let left = deadline.saturating_duration_since(Instant::now());
            if done_rx.recv_timeout(left).is_err() {
                debug!("Output of {}:{} still open after exit, detaching", self.container.id, self.name);
                break;
            }
        }
        self.check(status)
    }

    fn check(&self, status: ExitStatus) -> Result<()> {
        if status.success() {
            Ok(())
        } else {
            Err(MkError::Process {
                name: self.path.clone(),
                status,
            })
        }
    }
}

/// Split `KEY=VALUE` on the first `=`; an entry without one has an empty value.
pub fn split_env(entry: &str) -> (&str, &str) {
    entry.split_once('=').unwrap_or((entry, ""))
}
