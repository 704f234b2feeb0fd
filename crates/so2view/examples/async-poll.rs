//! Drive a dispatcher from a tokio runtime.
//!
//! Run with (mock-instrument running on 7009):
//!   cargo run -p so2view --example async-poll --features async

use std::sync::{Arc, Mutex};
use std::time::Duration;

use so2view::client::{AsyncPoller, ClientConfig, Connection, Dispatcher, Registry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::default();
    let registry = Registry::new(config.channels.clone());
    let mut connection = Connection::new(config);

    let connection = tokio::task::spawn_blocking(move || {
        connection.connect("localhost", 7009).map(|()| connection)
    })
    .await??;

    let dispatcher = Dispatcher::new(Arc::new(Mutex::new(connection)), registry);
    dispatcher.registry().subscribe("cam", |payload, metadata| {
        println!("{} {:?}", payload.kind_name(), metadata.get("Creation Time"));
    })?;

    let pass = dispatcher.clone();
    let poller = AsyncPoller::new(Duration::from_secs(1), move || {
        pass.dispatch_once();
    });
    poller.start()?;

    tokio::signal::ctrl_c().await?;
    poller.stop();
    Ok(())
}
