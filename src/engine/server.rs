//! Engine: container namespace and control socket
//!
//! The engine owns the root container (c0) and serves newline-delimited
//! operations on `<root>/.docker/engine/ctl`. Every connection gets its own
//! thread and its own [`Chain`]. The first failing operation ends the
//! connection: its error is written back as a single line, then the socket
//! is closed. A connection that runs to EOF is closed without output.

use std::fs;
use std::io::{self, BufRead, BufReader, Write};
use std::net::Shutdown;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::chain::Chain;
use super::delegate::{Delegate, SelfExec};
use super::signals;
use crate::container::Container;
use crate::error::{MkError, Result};
use crate::logging::LogConfig;
use crate::util::fs::{create_dir_all, mk_unique_dir, read_file};

/// Engine state directory inside the root container.
pub const ENGINE_DIR: &str = ".docker/engine";

/// Container namespace inside the engine directory.
pub const CONTAINERS_DIR: &str = "containers";

const ACCEPT_POLL: Duration = Duration::from_millis(50);

pub struct Engine {
    c0: Container,
    log: LogConfig,
    delegate: Option<Box<dyn Delegate>>,
    shutdown: Arc<AtomicBool>,
}

impl Engine {
    /// Create an engine over the root container. Without a delegate only
    /// built-in operations are available.
    pub fn new(c0: Container, log: LogConfig) -> Self {
        Self {
            c0,
            log,
            delegate: None,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_delegate(mut self, delegate: impl Delegate + 'static) -> Self {
        self.delegate = Some(Box::new(delegate));
        self
    }

    /// Delegate generic operations to `program --engine <op> ...`.
    pub fn with_self_exec(self, program: PathBuf) -> Self {
        let exec = SelfExec::new(program, self.log);
        self.with_delegate(exec)
    }

    /// The root container (c0)
    pub fn root(&self) -> &Container {
        &self.c0
    }

    pub fn delegate(&self) -> Option<&dyn Delegate> {
        self.delegate.as_deref()
    }

    /// `<c0>/.docker/engine/<segments...>`
    pub fn path(&self, segments: &[&str]) -> PathBuf {
        let mut parts = vec![ENGINE_DIR];
        parts.extend_from_slice(segments);
        self.c0.path(parts)
    }

    pub fn socket_path(&self) -> PathBuf {
        self.path(&["ctl"])
    }

    /// Engine identity token written at bootstrap.
    pub fn id(&self) -> Result<String> {
        Ok(read_file(&self.path(&["id"]))?.trim().to_string())
    }

    /// Flag that stops `listen_and_serve` when set, like a caught signal.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn chain(&self) -> Chain<'_> {
        Chain::new(self)
    }

    /// Look up an existing container. Never creates anything.
    pub fn get(&self, name: &str) -> Result<Container> {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\0']) {
            return Err(MkError::not_found("container", name));
        }
        let root = self.path(&[CONTAINERS_DIR, name]);
        match fs::metadata(&root) {
            Ok(meta) if meta.is_dir() => Ok(Container::new(name, root)),
            Ok(_) => Err(MkError::not_found("container", format!("{} (not a directory)", name))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(MkError::not_found("container", name)),
            Err(e) => Err(e.into()),
        }
    }

    /// Allocate a new, empty container.
    pub fn create(&self) -> Result<Container> {
        let id = mk_unique_dir(&self.path(&[CONTAINERS_DIR]))?;
        let root = self.path(&[CONTAINERS_DIR, &id]);
        debug!("Created new container: {} at root {}", id, root.display());
        Ok(Container::new(id, root))
    }

    /// Remove the control socket. Missing sockets are ignored.
    pub fn cleanup(&self) {
        debug!("Cleaning up engine");
        if let Err(e) = fs::remove_file(self.socket_path()) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("Failed to remove {}: {}", self.socket_path().display(), e);
            }
        }
    }

    /// Bind the control socket and serve connections until a signal is
    /// caught or the shutdown handle is set.
    ///
    /// `ready` is notified once the socket accepts connections; it is
    /// dropped without a message if binding fails. Errors from `accept` are
    /// fatal and returned to the caller.
    pub fn listen_and_serve(self: &Arc<Self>, ready: Option<Sender<()>>) -> Result<()> {
        let listener = self.bind()?;
        debug!("Setting up signals");
        signals::install()?;
        listener.set_nonblocking(true)?;

        if let Some(ready) = ready {
            debug!("Synchronizing");
            let _ = ready.send(());
        }
        match self.id() {
            Ok(id) => info!("Engine {} listening on {}", id, self.socket_path().display()),
            Err(_) => info!("Listening on {}", self.socket_path().display()),
        }

        loop {
            if let Some(sig) = signals::caught() {
                info!("Caught {}. Closing socket", sig);
                break;
            }
            if self.shutdown.load(Ordering::SeqCst) {
                info!("Shutdown requested. Closing socket");
                break;
            }
            let conn = match listener.accept() {
                Ok((conn, _)) => conn,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL);
                    continue;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(MkError::Socket(format!(
                        "accept on {}: {}",
                        self.socket_path().display(),
                        e
                    )))
                }
            };
            if let Err(e) = conn.set_nonblocking(false) {
                warn!("Dropping connection: {}", e);
                continue;
            }
            debug!("Received connection");
            let engine = Arc::clone(self);
            thread::spawn(move || {
                if let Err(e) = engine.serve(conn) {
                    debug!("Connection ended with error: {}", e);
                }
            });
        }

        drop(listener);
        self.cleanup();
        Ok(())
    }

    /// Bind the control socket, replacing a stale socket file once.
    fn bind(&self) -> Result<UnixListener> {
        let path = self.socket_path();
        if let Some(parent) = path.parent() {
            create_dir_all(parent)?;
        }
        let err = match UnixListener::bind(&path) {
            Ok(listener) => return Ok(listener),
            Err(e) => e,
        };
        if UnixStream::connect(&path).is_ok() {
            return Err(MkError::Socket(format!("{}: {}", path.display(), err)));
        }
        warn!("Cleaning up leftover unix socket {}", path.display());
        let _ = fs::remove_file(&path);
        UnixListener::bind(&path).map_err(|e| MkError::Socket(format!("{}: {}", path.display(), e)))
    }

    /// Run one connection's operations through a fresh chain.
    pub fn serve(&self, conn: UnixStream) -> Result<()> {
        let result = self.run_chain(&conn);
        if let Err(e) = &result {
            let mut out = &conn;
            let _ = writeln!(out, "{}", e);
        }
        let _ = conn.shutdown(Shutdown::Both);
        result
    }

    fn run_chain(&self, conn: &UnixStream) -> Result<()> {
        let mut lines = BufReader::new(conn);
        let mut chain = self.chain();
        let mut line = String::new();
        loop {
            line.clear();
            debug!("Reading command...");
            if lines.read_line(&mut line)? == 0 {
                return Ok(());
            }
            let input = line.strip_suffix('\n').unwrap_or(&line);
            let input = input.strip_suffix('\r').unwrap_or(input);
            debug!("Processing command: {:?}", input);
            chain.op(input)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client;
    use crate::container::ROOT_CONTAINER_ID;
    use crate::parser::Op;
    use std::io::Read;
    use std::sync::mpsc;
    use tempfile::TempDir;

    fn engine(tmp: &TempDir) -> Engine {
        Engine::new(
            Container::new(ROOT_CONTAINER_ID, tmp.path()),
            LogConfig::default(),
        )
    }

    fn exchange(engine: &Engine, request: &[u8]) -> (Result<()>, String) {
        let (mut client, server) = UnixStream::pair().unwrap();
        client.write_all(request).unwrap();
        client.shutdown(Shutdown::Write).unwrap();
        let result = engine.serve(server);
        let mut response = String::new();
        client.read_to_string(&mut response).unwrap();
        (result, response)
    }

    #[test]
    fn test_paths() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp);
        assert_eq!(engine.socket_path(), tmp.path().join(".docker/engine/ctl"));
        assert_eq!(
            engine.path(&[CONTAINERS_DIR, "3"]),
            tmp.path().join(".docker/engine/containers/3")
        );
    }

    #[test]
    fn test_get_nonexistent_has_no_side_effects() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp);
        let err = engine.get("nonexistent").unwrap_err();
        assert!(matches!(err, MkError::NotFound { kind: "container", .. }));
        assert!(!engine.path(&[CONTAINERS_DIR, "nonexistent"]).exists());
        assert!(!engine.path(&[CONTAINERS_DIR]).exists());
    }

    #[test]
    fn test_get_rejects_paths() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp);
        engine.create().unwrap();
        for name in ["", ".", "..", "0/..", "../containers/0", "0\0", "\0"] {
            assert!(
                matches!(engine.get(name), Err(MkError::NotFound { kind: "container", .. })),
                "{:?} should not resolve",
                name
            );
        }
    }

    #[test]
    fn test_get_not_a_directory() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp);
        let file = engine.path(&[CONTAINERS_DIR, "plain"]);
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, "").unwrap();
        assert!(matches!(engine.get("plain"), Err(MkError::NotFound { .. })));
    }

    #[test]
    fn test_create_then_get() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp);
        let first = engine.create().unwrap();
        let second = engine.create().unwrap();
        assert_eq!(first.id, "0");
        assert_eq!(second.id, "1");
        assert_eq!(engine.get("1").unwrap(), second);
        assert_eq!(second.root, tmp.path().join(".docker/engine/containers/1"));
    }

    #[test]
    fn test_id() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp);
        assert!(engine.id().is_err());
        fs::create_dir_all(engine.path(&[])).unwrap();
        fs::write(engine.path(&["id"]), "abc123\n").unwrap();
        assert_eq!(engine.id().unwrap(), "abc123");
    }

    #[test]
    fn test_serve_reports_first_error() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp);
        let (result, response) = exchange(&engine, b"in foo\nstart a\x00b\x00c\nwait\ndie\n");
        assert!(matches!(result, Err(MkError::NotFound { .. })));
        assert_eq!(response, "No such container: foo\n");
        assert!(!engine.path(&[CONTAINERS_DIR]).exists());
    }

    #[test]
    fn test_serve_success_is_silent() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp);
        let ctx = engine.create().unwrap();
        let request = format!("in {}\r\nimport ubuntu\nimport last", ctx.id);
        let (result, response) = exchange(&engine, request.as_bytes());
        assert!(result.is_ok());
        assert_eq!(response, "");
    }

    #[test]
    fn test_serve_parse_error() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp);
        let (result, response) = exchange(&engine, b"import a\nbadline\nimport b\n");
        assert!(matches!(result, Err(MkError::Parse(_))));
        assert_eq!(response, "badline: invalid format\n");
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let engine = engine(&tmp);
        engine.cleanup();
        fs::create_dir_all(engine.path(&[])).unwrap();
        fs::write(engine.socket_path(), "").unwrap();
        engine.cleanup();
        assert!(!engine.socket_path().exists());
        engine.cleanup();
    }

    fn start(engine: &Arc<Engine>) -> thread::JoinHandle<Result<()>> {
        let (tx, rx) = mpsc::channel();
        let server = Arc::clone(engine);
        let handle = thread::spawn(move || server.listen_and_serve(Some(tx)));
        rx.recv().expect("engine failed to start");
        handle
    }

    #[test]
    fn test_listen_and_serve() {
        let tmp = TempDir::new().unwrap();
        let engine = Arc::new(engine(&tmp));
        let handle = start(&engine);

        let err = client::send(&engine.socket_path(), &[Op::new("in", ["foo"])]).unwrap_err();
        assert!(matches!(err, MkError::Engine(ref line) if line == "No such container: foo"));

        let ctx = engine.create().unwrap();
        client::send(
            &engine.socket_path(),
            &[Op::new("in", [ctx.id.as_str()]), Op::new("import", ["x"])],
        )
        .unwrap();

        engine.shutdown_handle().store(true, Ordering::SeqCst);
        handle.join().unwrap().unwrap();
        assert!(!engine.socket_path().exists());
    }

    #[test]
    fn test_stale_socket_is_replaced() {
        let tmp = TempDir::new().unwrap();
        let engine = Arc::new(engine(&tmp));
        fs::create_dir_all(engine.path(&[])).unwrap();
        drop(UnixListener::bind(engine.socket_path()).unwrap());
        assert!(engine.socket_path().exists());

        let handle = start(&engine);
        client::send(&engine.socket_path(), &[Op::new("import", ["x"])]).unwrap();
        engine.shutdown_handle().store(true, Ordering::SeqCst);
        handle.join().unwrap().unwrap();
    }

    #[test]
    fn test_live_socket_is_not_replaced() {
        let tmp = TempDir::new().unwrap();
        let engine = Arc::new(engine(&tmp));
        fs::create_dir_all(engine.path(&[])).unwrap();
        let _live = UnixListener::bind(engine.socket_path()).unwrap();

        let (tx, rx) = mpsc::channel();
        let err = engine.listen_and_serve(Some(tx)).unwrap_err();
        assert!(matches!(err, MkError::Socket(_)));
        assert!(rx.recv().is_err());
        assert!(engine.socket_path().exists());
    }
}
