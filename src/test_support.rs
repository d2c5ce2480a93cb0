//! Scripted loopback SMTP peer shared by the session and probe tests.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

type Responder = dyn Fn(&str) -> Option<String> + Send + Sync;

pub(crate) struct MockServer {
    pub port: u16,
    received: Arc<Mutex<Vec<String>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl MockServer {
    /// Accept `connections` clients, each served on its own thread. Every
    /// command line is passed to `respond`; `None` means stay silent.
    pub fn spawn<F>(connections: usize, banner: &'static str, respond: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        let port = listener.local_addr().expect("addr").port();
        let received = Arc::new(Mutex::new(Vec::new()));
        let respond: Arc<Responder> = Arc::new(respond);
        let log = Arc::clone(&received);
        let handle = thread::spawn(move || {
            let mut workers = Vec::new();
            for _ in 0..connections {
                let Ok((stream, _)) = listener.accept() else {
                    break;
                };
                let respond = Arc::clone(&respond);
                let log = Arc::clone(&log);
                workers.push(thread::spawn(move || {
                    let _ = serve(stream, banner, respond.as_ref(), &log);
                }));
            }
            for worker in workers {
                worker.join().ok();
            }
        });
        Self {
            port,
            received,
            handle: Some(handle),
        }
    }

    /// Wait for all clients to hang up, then return every command seen.
    pub fn finish(mut self) -> Vec<String> {
        if let Some(handle) = self.handle.take() {
            handle.join().expect("mock server thread");
        }
        self.received.lock().expect("lock").clone()
    }
}

fn serve(
    mut stream: TcpStream,
    banner: &str,
    respond: &Responder,
    log: &Mutex<Vec<String>>,
) -> io::Result<()> {
    stream.set_read_timeout(Some(Duration::from_secs(10)))?;
    let mut reader = BufReader::new(stream.try_clone()?);
    stream.write_all(banner.as_bytes())?;
    stream.flush()?;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Ok(());
        }
        let command = line.trim_end().to_string();
        log.lock().expect("lock").push(command.clone());
        if let Some(reply) = respond(&command) {
            stream.write_all(reply.as_bytes())?;
            stream.flush()?;
        }
        if command.eq_ignore_ascii_case("QUIT") {
            return Ok(());
        }
    }
}

/// Replies of a well-behaved server that accepts every recipient.
pub(crate) fn accepting(command: &str) -> Option<String> {
    let upper = command.to_ascii_uppercase();
    let reply = if upper.starts_with("EHLO") {
        "250-mock.smtp.test\r\n250 SIZE 1000000\r\n"
    } else if upper.starts_with("MAIL FROM:") {
        "250 2.1.0 Ok\r\n"
    } else if upper.starts_with("RCPT TO:") {
        "250 2.1.5 Ok\r\n"
    } else {
        return None;
    };
    Some(reply.to_string())
}

/// Unused local port: bound once, then released.
pub(crate) fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.local_addr().expect("addr").port()
}
