//! Bare-bones ranged GET responder for unit tests inside the crate.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;

/// How the responder answers a GET, chosen by the start of its range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Reply {
    /// `206` with exactly the requested bytes.
    Full,
    /// Announces the requested length, sends half of it and hangs up.
    Half,
    /// Reads the request and never answers.
    Stall,
}

/// Serves `body` on a loopback port until the process exits. Returns its URL.
pub(crate) fn serve(body: Vec<u8>, reply: fn(u64) -> Reply) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/file.bin", listener.local_addr().unwrap());
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = body.clone();
            thread::spawn(move || answer(stream, &body, reply));
        }
    });
    url
}

fn answer(mut stream: TcpStream, body: &[u8], reply: fn(u64) -> Reply) {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    }
    let last = body.len() as u64 - 1;
    let (start, end) = requested_range(&String::from_utf8_lossy(&request)).unwrap_or((0, last));
    let end = end.min(last);

    let mode = reply(start);
    if mode == Reply::Stall {
        // Hold the connection until the client gives up.
        while matches!(stream.read(&mut buf), Ok(n) if n > 0) {}
        return;
    }
    let slice = &body[start as usize..=end as usize];
    let head = format!(
        "HTTP/1.1 206 Partial Content\r\nContent-Length: {}\r\nContent-Range: bytes {}-{}/{}\r\nConnection: close\r\n\r\n",
        slice.len(),
        start,
        end,
        body.len()
    );
    let sent = if mode == Reply::Half {
        &slice[..slice.len() / 2]
    } else {
        slice
    };
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(sent);
}

fn requested_range(request: &str) -> Option<(u64, u64)> {
    let value = request.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        name.trim().eq_ignore_ascii_case("range").then(|| value.trim())
    })?;
    let (start, end) = value.strip_prefix("bytes=")?.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}
