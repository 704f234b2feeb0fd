//! Stand-in for the instrument control software.
//!
//! Serves synthetic 8-bit camera frames on `top`, `bot` and `cam`, a
//! 2048-sample spectrum on `spc`, and "no data" on everything else.
//!
//! Run with:
//!   cargo run -p so2view --example mock-instrument -- 7009
//!
//! In another terminal:
//!   cargo run -p so2view --features cli -- watch localhost:7009 --count 10

use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use so2view::frame::{Channel, FrameError, FrameReader, FrameWriter, SPC};
use so2view::payload::{Spectrum, DEFAULT_SPECTRUM_SAMPLES};

const WIDTH: u32 = 64;
const HEIGHT: u32 = 48;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let port: u16 = match std::env::args().nth(1) {
        Some(port) => port.parse()?,
        None => 7009,
    };

    let listener = TcpListener::bind(("127.0.0.1", port))?;
    eprintln!("Serving on {}", listener.local_addr()?);

    for stream in listener.incoming() {
        let stream = stream?;
        thread::spawn(move || {
            let peer = stream.peer_addr().ok();
            eprintln!("Client connected: {peer:?}");
            if let Err(e) = serve(stream) {
                eprintln!("Client {peer:?} dropped: {e}");
            }
        });
    }
    Ok(())
}

fn serve(stream: TcpStream) -> Result<(), Box<dyn std::error::Error>> {
    let mut reader = FrameReader::new(stream.try_clone()?);
    let mut writer = FrameWriter::new(stream);
    let mut tick = 0u32;

    loop {
        // A request is a 3-byte frame: the size header reads as 3.
        let request = match reader.read_frame() {
            Ok(request) => request,
            Err(FrameError::ConnectionClosed) => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let channel = Channel::new(std::str::from_utf8(&request)?)?;
        tick = tick.wrapping_add(1);

        let body = match channel.as_str() {
            "top" | "bot" | "cam" => camera_frame(channel, tick)?,
            _ if channel == SPC => spectrum(tick).to_le_bytes(),
            _ => Vec::new(),
        };
        eprintln!("{channel}: {} bytes", body.len());
        writer.send_response(&body)?;
    }
}

fn camera_frame(channel: Channel, tick: u32) -> Result<Vec<u8>, png::EncodingError> {
    let offset = (tick % 256) as u8;
    let pixels: Vec<u8> = (0..HEIGHT)
        .flat_map(|y| (0..WIDTH).map(move |x| (x + y) as u8))
        .map(|v| v.wrapping_add(offset))
        .collect();

    let created = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, WIDTH, HEIGHT);
        encoder.set_color(png::ColorType::Grayscale);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.add_text_chunk("Comment".to_string(), format!("Camera: {channel}"))?;
        encoder.add_text_chunk("Comment".to_string(), format!("Exposure: {}ms", 10 + tick % 5))?;
        encoder.add_text_chunk("Creation Time".to_string(), created.to_string())?;
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&pixels)?;
        writer.finish()?;
    }
    Ok(out)
}

fn spectrum(tick: u32) -> Spectrum {
    let centre = 700.0 + f64::from(tick % 50);
    let samples = (0..DEFAULT_SPECTRUM_SAMPLES)
        .map(|i| {
            let d = (i as f64 - centre) / 40.0;
            1000.0 * (-d * d).exp() + 50.0
        })
        .collect();
    Spectrum::new(samples)
}
