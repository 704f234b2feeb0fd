//! Loopback stand-in for the instrument service, shared by unit tests.

use std::collections::{HashMap, VecDeque};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

use bytes::BytesMut;
use so2view_frame::encode_response;

/// One scripted answer.
pub(crate) enum Reply {
    /// A framed body; empty means "no data".
    Body(Vec<u8>),
    /// Bytes written as-is, header included.
    Raw(Vec<u8>),
    /// Close the connection instead of answering.
    Hangup,
}

/// Serves scripted replies per channel; unscripted requests get size 0.
pub(crate) struct FakeInstrument {
    port: u16,
    requests: Arc<Mutex<Vec<String>>>,
    accepted: Arc<Mutex<usize>>,
}

impl FakeInstrument {
    pub(crate) fn spawn(script: Vec<(&str, Reply)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("ephemeral bind should work");
        let port = listener.local_addr().expect("local addr").port();

        let mut queues: HashMap<String, VecDeque<Reply>> = HashMap::new();
        for (channel, reply) in script {
            queues.entry(channel.to_string()).or_default().push_back(reply);
        }
        let queues = Arc::new(Mutex::new(queues));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let accepted = Arc::new(Mutex::new(0usize));

        let (log, count) = (Arc::clone(&requests), Arc::clone(&accepted));
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                *count.lock().unwrap() += 1;
                serve(stream, &queues, &log);
            }
        });

        Self {
            port,
            requests,
            accepted,
        }
    }

    pub(crate) fn port(&self) -> u16 {
        self.port
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn accepted(&self) -> usize {
        *self.accepted.lock().unwrap()
    }
}

fn serve(
    mut stream: TcpStream,
    queues: &Mutex<HashMap<String, VecDeque<Reply>>>,
    log: &Mutex<Vec<String>>,
) {
    let mut request = [0u8; 7];
    while stream.read_exact(&mut request).is_ok() {
        assert_eq!(&request[..4], &3u32.to_le_bytes());
        let channel = String::from_utf8_lossy(&request[4..]).into_owned();
        log.lock().unwrap().push(channel.clone());

        let reply = queues
            .lock()
            .unwrap()
            .get_mut(&channel)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Reply::Body(Vec::new()));

        let wire = match reply {
            Reply::Body(body) => {
                let mut buf = BytesMut::new();
                encode_response(&body, &mut buf).unwrap();
                buf.to_vec()
            }
            Reply::Raw(bytes) => bytes,
            Reply::Hangup => return,
        };
        if stream.write_all(&wire).is_err() {
            return;
        }
    }
}

/// 8-bit grayscale PNG, optionally carrying `tEXt` chunks.
pub(crate) fn gray_png(width: u32, height: u32, pixels: &[u8], texts: &[(&str, &str)]) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(png::ColorType::Grayscale);
        encoder.set_depth(png::BitDepth::Eight);
        for (keyword, text) in texts {
            encoder
                .add_text_chunk(keyword.to_string(), text.to_string())
                .unwrap();
        }
        let mut writer = encoder.write_header().unwrap();
        writer.write_image_data(pixels).unwrap();
        writer.finish().unwrap();
    }
    out
}
