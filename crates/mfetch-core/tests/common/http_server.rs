//! Minimal HTTP/1.1 server for integration tests.
//!
//! Every GET returns `body of <path>`. Paths of the form `/delay/<ms>/...`
//! sleep before answering and `/status/<code>/...` answer with that status.
//! Tracks how many requests are being served at once so tests can check the
//! client's concurrency window from the outside.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Default)]
struct Stats {
    active: AtomicUsize,
    peak: AtomicUsize,
    served: AtomicUsize,
}

#[derive(Debug, Clone)]
pub struct TestServer {
    base: String,
    stats: Arc<Stats>,
}

impl TestServer {
    /// Full URL for `path` (which should start with '/').
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Most requests ever in progress at the same time.
    pub fn peak(&self) -> usize {
        self.stats.peak.load(Ordering::SeqCst)
    }

    pub fn served(&self) -> usize {
        self.stats.served.load(Ordering::SeqCst)
    }
}

/// Body the server sends for `path`.
pub fn body_for(path: &str) -> Vec<u8> {
    format!("body of {}", path).into_bytes()
}

/// Starts a server in a background thread. It runs until the process exits.
pub fn start() -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let stats = Arc::new(Stats::default());
    let accept_stats = Arc::clone(&stats);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let stats = Arc::clone(&accept_stats);
            thread::spawn(move || handle(stream, &stats));
        }
    });
    TestServer {
        base: format!("http://127.0.0.1:{}", port),
        stats,
    }
}

fn handle(mut stream: TcpStream, stats: &Stats) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();

    let now = stats.active.fetch_add(1, Ordering::SeqCst) + 1;
    stats.peak.fetch_max(now, Ordering::SeqCst);

    let mut status = "200 OK".to_string();
    let mut parts = path.trim_start_matches('/').split('/');
    match (parts.next(), parts.next()) {
        (Some("delay"), Some(ms)) => {
            let ms = ms.parse::<u64>().unwrap_or(0);
            thread::sleep(Duration::from_millis(ms));
        }
        (Some("status"), Some(code)) => {
            status = format!("{} Test", code);
        }
        _ => {}
    }

    let body = body_for(&path);
    let head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nContent-Type: text/plain\r\nConnection: close\r\n\r\n",
        status,
        body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&body);
    let _ = stream.flush();

    stats.served.fetch_add(1, Ordering::SeqCst);
    stats.active.fetch_sub(1, Ordering::SeqCst);
}
