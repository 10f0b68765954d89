//! Hand-rolled single-connection HTTP servers for tests.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc::Receiver;
use std::thread;
use std::time::Duration;

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        _ => "OK",
    }
}

/// Read one HTTP request, honoring Content-Length so multipart bodies that
/// arrive in several segments are captured whole.
fn read_request(socket: &mut TcpStream) -> String {
    socket
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("read timeout");
    let mut data = Vec::new();
    let mut buf = [0_u8; 8192];
    loop {
        let read = match socket.read(&mut buf) {
            Ok(0) => break,
            Ok(read) => read,
            Err(_) => break,
        };
        data.extend_from_slice(&buf[..read]);
        if let Some(header_end) = find_subslice(&data, b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&data[..header_end]).to_string();
            let content_length = headers
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())?
                })
                .unwrap_or(0);
            if data.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&data).to_string()
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Serve one canned response and assert the request line hits `expected_path`.
pub fn spawn_single_response_server(
    status: u16,
    content_type: &str,
    body: String,
    expected_path: &'static str,
) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind listener");
    let address = listener.local_addr().expect("listener addr");
    let content_type = content_type.to_string();

    thread::spawn(move || {
        let (mut socket, _) = listener.accept().expect("accept");
        let request = read_request(&mut socket);
        let first_line = request.lines().next().unwrap_or_default().to_string();
        assert!(
            first_line.contains(expected_path),
            "expected path '{}', first line: {}",
            expected_path,
            first_line
        );

        let response = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            status_text(status),
            content_type,
            body.len(),
            body
        );
        socket
            .write_all(response.as_bytes())
            .expect("write response");
        socket.flush().expect("flush");
    });

    format!("http://{}", address)
}

/// Serve one canned JSON response and hand the raw request to the test.
pub fn spawn_capture_server(status: u16, body: String) -> (String, Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind listener");
    let address = listener.local_addr().expect("listener addr");
    let (tx, rx) = std::sync::mpsc::channel();

    thread::spawn(move || {
        let (mut socket, _) = listener.accept().expect("accept");
        let request = read_request(&mut socket);
        tx.send(request).expect("send request capture");

        let response = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            status_text(status),
            body.len(),
            body
        );
        socket
            .write_all(response.as_bytes())
            .expect("write response");
        socket.flush().expect("flush");
    });

    (format!("http://{}", address), rx)
}

/// Serve SSE headers plus one initial frame, hold the connection open, and
/// signal once the peer closes it.
pub fn spawn_sse_hold_server(first_frame: String) -> (String, Receiver<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind listener");
    let address = listener.local_addr().expect("listener addr");
    let (tx, rx) = std::sync::mpsc::channel();

    thread::spawn(move || {
        let (mut socket, _) = listener.accept().expect("accept");
        let _ = read_request(&mut socket);

        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n{}",
            first_frame
        );
        socket
            .write_all(response.as_bytes())
            .expect("write response");
        socket.flush().expect("flush");

        socket
            .set_read_timeout(Some(Duration::from_secs(10)))
            .expect("read timeout");
        let mut buf = [0_u8; 64];
        loop {
            match socket.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
        }
        tx.send(()).expect("signal close");
    });

    (format!("http://{}", address), rx)
}
