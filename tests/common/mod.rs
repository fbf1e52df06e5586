#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;

pub const SAMPLE_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
<title>Synology NAS</title>
<meta name="description" content="Synology Inc. provides...more info. Second sentence here.">
<style>body { color: #333; }</style>
<script>var tracking = "synology nas synology nas";</script>
</head>
<body>
<h1>Synology NAS</h1>
<h2>Storage</h2>
<h2>Backup</h2>
<p>Synology NAS keeps your files safe. Synology NAS runs at home.</p>
<a href="https://www.synology.com/products">Products</a>
<a href="http://insecure.example">Insecure</a>
<a href="/relative">Relative</a>
<a href="https://www.synology.com/support">Support</a>
</body>
</html>
"#;

/// Serves `body` with `status` to every connection until the test process exits.
pub fn serve(status: u16, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub server");
    let addr = listener.local_addr().expect("stub server address");

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else {
                continue;
            };
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let reason = if status == 200 { "OK" } else { "Error" };
            let response = format!(
                "HTTP/1.1 {status} {reason}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.flush();
        }
    });

    format!("http://{addr}")
}

/// An address nothing listens on.
pub fn closed_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe");
    let addr = listener.local_addr().expect("probe address");
    drop(listener);
    format!("http://{addr}")
}
