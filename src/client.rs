//! Control socket client

use std::io::{self, Read, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::path::Path;

use crate::error::{MkError, Result};
use crate::parser::Op;

/// Send `ops` to the engine at `socket` and wait for it to close the
/// connection. Any response text is the engine's error.
pub fn send(socket: &Path, ops: &[Op]) -> Result<()> {
    let mut stream = UnixStream::connect(socket)?;

    let mut request = String::new();
    for op in ops {
        request.push_str(&op.to_line());
        request.push('\n');
    }
    // The engine may hang up early after a failed operation; its error line
    // is still readable.
    if let Err(e) = stream.write_all(request.as_bytes()) {
        if e.kind() != io::ErrorKind::BrokenPipe {
            return Err(e.into());
        }
    }
    let _ = stream.shutdown(Shutdown::Write);

    let mut response = String::new();
    stream.read_to_string(&mut response)?;
    if response.is_empty() {
        Ok(())
    } else {
        Err(MkError::Engine(response.trim_end().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufRead;
    use std::os::unix::net::UnixListener;
    use std::thread;
    use tempfile::TempDir;

    fn fake_engine(
        tmp: &TempDir,
        reply: &'static str,
    ) -> (std::path::PathBuf, thread::JoinHandle<Vec<String>>) {
        let socket = tmp.path().join("ctl");
        let listener = UnixListener::bind(&socket).unwrap();
        let handle = thread::spawn(move || {
            let (conn, _) = listener.accept().unwrap();
            let lines: Vec<String> = io::BufReader::new(&conn)
                .lines()
                .map(|l| l.unwrap())
                .collect();
            let mut out = &conn;
            out.write_all(reply.as_bytes()).unwrap();
            lines
        });
        (socket, handle)
    }

    #[test]
    fn test_send_success() {
        let tmp = TempDir::new().unwrap();
        let (socket, handle) = fake_engine(&tmp, "");
        send(
            &socket,
            &[
                Op::new("in", ["web"]),
                Op::new("start", ["ls", "-l"]),
                Op::new("wait", Vec::<String>::new()),
            ],
        )
        .unwrap();
        assert_eq!(handle.join().unwrap(), vec!["in web", "start ls\0-l", "wait "]);
    }

    #[test]
    fn test_send_reports_engine_error() {
        let tmp = TempDir::new().unwrap();
        let (socket, handle) = fake_engine(&tmp, "No such container: web\n");
        let err = send(&socket, &[Op::new("in", ["web"])]).unwrap_err();
        assert!(matches!(err, MkError::Engine(ref line) if line == "No such container: web"));
        handle.join().unwrap();
    }

    #[test]
    fn test_send_without_engine() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            send(&tmp.path().join("ctl"), &[]),
            Err(MkError::Io(_))
        ));
    }
}
