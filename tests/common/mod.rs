// tests/common/mod.rs

//! Scripted mock snapd bound to a Unix socket in a temp directory.
//!
//! Each script entry answers exactly one connection, in order. The accept
//! loop reads and records the request, then hands the reply off to its own
//! thread so a stalled entry does not delay later connections.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tempfile::TempDir;

/// How one connection is answered
pub enum Reply {
    /// 200 OK with this JSON body
    Json(String),
    /// Arbitrary status with this JSON body
    Status(u16, String),
    /// Interim 100 Continue first, then 200 OK with this body
    ContinueThen(String),
    /// Go quiet long enough to trip the client's read timeout, then hang up
    Stall(Duration),
}

pub struct MockSnapd {
    pub socket_path: PathBuf,
    requests: Arc<Mutex<Vec<String>>>,
    handle: Option<JoinHandle<()>>,
    _dir: TempDir,
}

impl MockSnapd {
    /// Serve the script; the caller must drive exactly one connection per
    /// entry or `shutdown` will block on the accept loop.
    pub fn serve(script: Vec<Reply>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("snapd.socket");
        let listener = UnixListener::bind(&socket_path).unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);

        let handle = thread::spawn(move || {
            for reply in script {
                let Ok((mut stream, _)) = listener.accept() else {
                    return;
                };
                let request = read_request(&mut stream);
                seen.lock().unwrap().push(request);

                thread::spawn(move || match reply {
                    Reply::Json(body) => write_response(&mut stream, 200, &body),
                    Reply::Status(code, body) => write_response(&mut stream, code, &body),
                    Reply::ContinueThen(body) => {
                        let _ = stream.write_all(b"HTTP/1.1 100 Continue\r\n\r\n");
                        write_response(&mut stream, 200, &body);
                    }
                    Reply::Stall(pause) => thread::sleep(pause),
                });
            }
        });

        Self {
            socket_path,
            requests,
            handle: Some(handle),
            _dir: dir,
        }
    }

    /// Wait for the script to be fully consumed and return the recorded
    /// requests, one raw HTTP request per connection.
    pub fn shutdown(mut self) -> Vec<String> {
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap();
        }
        self.requests.lock().unwrap().clone()
    }
}

fn read_request(stream: &mut UnixStream) -> String {
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();

    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        if let Some(pos) = find_blank_line(&buf) {
            let head = String::from_utf8_lossy(&buf[..pos]).to_string();
            if buf.len() >= pos + 4 + content_length(&head) {
                break;
            }
        }
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(_) => break,
        }
    }

    String::from_utf8_lossy(&buf).into_owned()
}

fn find_blank_line(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|window| window == b"\r\n\r\n")
}

fn content_length(head: &str) -> usize {
    head.lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.trim()
                .eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse().ok())?
        })
        .unwrap_or(0)
}

fn write_response(stream: &mut UnixStream, status_code: u16, body: &str) {
    let reason = match status_code {
        200 => "OK",
        202 => "Accepted",
        400 => "Bad Request",
        404 => "Not Found",
        _ => "Response",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {}",
        status_code,
        reason,
        body.len(),
        body
    );
    // The client may already have hung up on a timed-out attempt.
    let _ = stream.write_all(response.as_bytes());
}

/// Body of a recorded request (everything after the blank line)
pub fn request_body(request: &str) -> &str {
    request.split_once("\r\n\r\n").map(|(_, b)| b).unwrap_or("")
}

pub fn sync_envelope(status_code: u16, result: &str) -> String {
    format!(
        r#"{{"type":"sync","status-code":{},"result":{}}}"#,
        status_code, result
    )
}

pub fn async_envelope(change: &str) -> String {
    format!(
        r#"{{"type":"async","status-code":202,"result":null,"change":"{}"}}"#,
        change
    )
}

pub fn change_status(id: &str, status: &str) -> String {
    sync_envelope(200, &format!(r#"{{"id":"{}","status":"{}"}}"#, id, status))
}

pub fn error_envelope(status_code: u16, message: &str) -> String {
    format!(
        r#"{{"type":"error","status-code":{},"result":{{"message":"{}"}}}}"#,
        status_code, message
    )
}

pub fn error_envelope_with_kind(status_code: u16, message: &str, kind: &str) -> String {
    format!(
        r#"{{"type":"error","status-code":{},"result":{{"message":"{}","kind":"{}"}}}}"#,
        status_code, message, kind
    )
}
