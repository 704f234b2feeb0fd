//! Subscribe to two channels and print readings for a few seconds.
//!
//! Run with (mock-instrument running on 7009):
//!   cargo run -p so2view --example poll-channels

use std::thread;
use std::time::Duration;

use so2view::client::{Client, ClientConfig};
use so2view::payload::Payload;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::default()
        .with_poll_interval(Duration::from_millis(500))
        .with_reconnect_on_failure(true);
    let client = Client::new(config);

    client.on_state_change(|state| eprintln!("connection {state}"));
    client.subscribe("top", |payload, metadata| {
        if let Payload::Image(frame) = payload {
            eprintln!(
                "top {:?} exposure={}",
                frame.shape(),
                metadata.get("Exposure").unwrap_or("?")
            );
        }
    })?;
    client.subscribe("spc", |payload, _| {
        if let Some(spectrum) = payload.as_spectrum() {
            eprintln!("spc {} samples, range {:?}", spectrum.len(), spectrum.range());
        }
    })?;

    client.connect("localhost", 7009)?;
    client.start();
    thread::sleep(Duration::from_secs(5));
    client.stop_and_join();
    Ok(())
}
