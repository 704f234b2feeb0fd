#![cfg(feature = "cli")]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::process::{Command, Output};
use std::thread;

use bytes::BytesMut;
use so2view::frame::encode_response;

/// Loopback instrument answering every request through `respond`.
fn spawn_instrument(respond: fn(&str) -> Vec<u8>) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("ephemeral bind should work");
    let port = listener.local_addr().expect("local addr").port();
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            thread::spawn(move || serve(stream, respond));
        }
    });
    port
}

fn serve(mut stream: TcpStream, respond: fn(&str) -> Vec<u8>) {
    let mut request = [0u8; 7];
    while stream.read_exact(&mut request).is_ok() {
        let channel = String::from_utf8_lossy(&request[4..]).into_owned();
        let mut wire = BytesMut::new();
        encode_response(&respond(&channel), &mut wire).expect("body fits a frame");
        if stream.write_all(&wire).is_err() {
            return;
        }
    }
}

fn gray_png(pixels: &[u8], comment: &str) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, pixels.len() as u32, 1);
        encoder.set_color(png::ColorType::Grayscale);
        encoder.set_depth(png::BitDepth::Eight);
        encoder
            .add_text_chunk("Comment".to_string(), comment.to_string())
            .expect("text chunk");
        let mut writer = encoder.write_header().expect("png header");
        writer.write_image_data(pixels).expect("png data");
        writer.finish().expect("png finish");
    }
    out
}

fn instrument_replies(channel: &str) -> Vec<u8> {
    match channel {
        "top" | "bot" => gray_png(&[12, 200], "Exposure: 12ms"),
        "spc" => vec![0u8; 20],
        _ => Vec::new(),
    }
}

fn so2view(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_so2view"))
        .args(["--log-level", "error"])
        .args(args)
        .output()
        .expect("so2view should run")
}

fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("ephemeral bind should work");
    listener.local_addr().expect("local addr").port()
}

fn temp_config(tag: &str, body: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "so2view-{tag}-{}-{}.json",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::write(&path, body).expect("config should be writable");
    path
}

#[test]
fn fetch_image_prints_summary_json() {
    let port = spawn_instrument(instrument_replies);
    let target = format!("127.0.0.1:{port}");

    let output = so2view(&["--format", "json", "fetch", &target, "--channel", "top"]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"channel\":\"top\""));
    assert!(stdout.contains("\"kind\":\"image\""));
    assert!(stdout.contains("\"shape\":[1,2]"));
    assert!(stdout.contains("\"Exposure\":\"12ms\""));
}

#[test]
fn fetch_no_data_succeeds() {
    let port = spawn_instrument(instrument_replies);
    let target = format!("127.0.0.1:{port}");

    let output = so2view(&["--format", "json", "fetch", &target, "--channel", "cmp"]);

    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("\"kind\":\"none\""));
}

#[test]
fn fetch_raw_writes_body_bytes() {
    let port = spawn_instrument(instrument_replies);
    let target = format!("127.0.0.1:{port}");

    let output = so2view(&["--format", "raw", "fetch", &target, "--channel", "bot"]);

    assert!(output.status.success());
    assert_eq!(output.stdout, gray_png(&[12, 200], "Exposure: 12ms"));
}

#[test]
fn fetch_bad_spectrum_returns_60() {
    let port = spawn_instrument(instrument_replies);
    let target = format!("127.0.0.1:{port}");

    let output = so2view(&["fetch", &target, "--channel", "spc"]);

    assert_eq!(output.status.code(), Some(60));
    assert!(String::from_utf8_lossy(&output.stderr).contains("spectrum"));
}

#[test]
fn fetch_invalid_channel_returns_64() {
    let output = so2view(&["fetch", "127.0.0.1:1", "--channel", "toolong"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn fetch_refused_returns_3() {
    let target = format!("127.0.0.1:{}", unused_port());
    let output = so2view(&["fetch", &target, "--channel", "top", "--retry-delay", "10ms"]);
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn watch_stops_after_count() {
    let port = spawn_instrument(instrument_replies);
    let target = format!("127.0.0.1:{port}");

    let output = so2view(&[
        "--format",
        "json",
        "watch",
        &target,
        "--channels",
        "bot",
        "--count",
        "2",
        "--interval",
        "50ms",
    ]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|line| line.contains("\"channel\":\"bot\"")));
}

#[test]
fn channels_lists_default_table() {
    let output = so2view(&["--format", "json", "channels"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let top = stdout.find("\"top\"").expect("top listed");
    let spc = stdout.find("\"spc\"").expect("spc listed");
    assert!(top < spc);
    assert!(stdout.contains("spectrum[2048]"));
}

#[test]
fn config_file_replaces_channel_table() {
    let path = temp_config(
        "channels",
        r#"{ "channels": [ { "name": "uv1" }, { "name": "spc", "kind": "spectrum", "samples": 512 } ] }"#,
    );

    let output = Command::new(env!("CARGO_BIN_EXE_so2view"))
        .arg("--config")
        .arg(&path)
        .args(["--format", "json", "channels"])
        .output()
        .expect("so2view should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"uv1\""));
    assert!(stdout.contains("spectrum[512]"));
    assert!(!stdout.contains("\"top\""));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn malformed_config_returns_60() {
    let path = temp_config("bad", "{ not json");
    let output = Command::new(env!("CARGO_BIN_EXE_so2view"))
        .arg("--config")
        .arg(&path)
        .arg("channels")
        .output()
        .expect("so2view should run");

    assert_eq!(output.status.code(), Some(60));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn version_prints_package_version() {
    let output = so2view(&["version"]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        format!("so2view {}", env!("CARGO_PKG_VERSION"))
    );
}
