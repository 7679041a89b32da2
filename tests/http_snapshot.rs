use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;
use std::time::{Duration, Instant};

use snapshot_counter::{HttpSnapshotSource, SnapshotSource};

/// Serve one canned HTTP response on an ephemeral loopback port.
fn serve_once(status_line: &'static str, body: &'static [u8], delay: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut request = [0u8; 1024];
            let _ = stream.read(&mut request);
            thread::sleep(delay);
            let header = format!(
                "HTTP/1.1 {}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status_line,
                body.len()
            );
            let _ = stream.write_all(header.as_bytes());
            let _ = stream.write_all(body);
        }
    });
    format!("http://{}/loc37.jpg", addr)
}

#[test]
fn fetches_snapshot_body() {
    let url = serve_once("200 OK", b"\xFF\xD8jpeg\xFF\xD9", Duration::ZERO);
    let mut source = HttpSnapshotSource::new(url, Duration::from_secs(5));
    assert_eq!(source.fetch().unwrap(), b"\xFF\xD8jpeg\xFF\xD9");
}

#[test]
fn non_success_status_is_an_error() {
    let url = serve_once("404 Not Found", b"missing", Duration::ZERO);
    let mut source = HttpSnapshotSource::new(url, Duration::from_secs(5));
    let err = source.fetch().unwrap_err();
    assert!(err.to_string().contains("404"));
}

#[test]
fn empty_body_is_an_error() {
    let url = serve_once("200 OK", b"", Duration::ZERO);
    let mut source = HttpSnapshotSource::new(url, Duration::from_secs(5));
    let err = source.fetch().unwrap_err();
    assert!(err.to_string().contains("empty snapshot"));
}

#[test]
fn slow_server_times_out() {
    let url = serve_once("200 OK", b"late", Duration::from_secs(3));
    let mut source = HttpSnapshotSource::new(url, Duration::from_millis(500));
    let started = Instant::now();
    assert!(source.fetch().is_err());
    assert!(started.elapsed() < Duration::from_secs(3));
}
