//! Signal shutdown runs in its own test binary: the caught signal is
//! process-wide and stays set once received.

use std::sync::{mpsc, Arc};
use std::thread;

use mk::container::ROOT_CONTAINER_ID;
use mk::{Container, Engine, LogConfig};
use nix::sys::signal::{self, Signal};
use tempfile::TempDir;

#[test]
fn signal_stops_engine_and_removes_socket() {
    let tmp = TempDir::new().unwrap();
    let engine = Arc::new(Engine::new(
        Container::new(ROOT_CONTAINER_ID, tmp.path()),
        LogConfig::default(),
    ));

    let (ready, started) = mpsc::channel();
    let server = Arc::clone(&engine);
    let handle = thread::spawn(move || server.listen_and_serve(Some(ready)));
    started.recv().unwrap();
    assert!(engine.socket_path().exists());

    signal::raise(Signal::SIGUSR2).unwrap();

    handle.join().unwrap().unwrap();
    assert!(!engine.socket_path().exists());
}
