use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use so2view_client::Client;
use so2view_payload::Reading;
use tracing::{info, warn};

use crate::cmd::{parse_duration, WatchArgs};
use crate::config::FileConfig;
use crate::exit::{client_error, CliError, CliResult, FAILURE, INTERNAL, SUCCESS};
use crate::output::{print_reading, OutputFormat};

const WAKE_INTERVAL: Duration = Duration::from_millis(100);

pub fn run(args: WatchArgs, file: &FileConfig, format: OutputFormat) -> CliResult<i32> {
    let (host, port) = args.connect.endpoint(file)?;
    let mut config = args.connect.client_config(file, None)?;
    if let Some(interval) = &args.interval {
        config.poll_interval = parse_duration(interval)?;
    }
    if file.reconnect_on_failure.is_none() {
        config.reconnect_on_failure = true;
    }

    let channels: Vec<String> = match &args.channels {
        Some(channels) => channels.clone(),
        None => config
            .channels
            .iter()
            .map(|spec| spec.channel.to_string())
            .collect(),
    };

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let client = Client::new(config);
    client.on_state_change(|state| info!(%state, "connection state changed"));

    let (tx, rx) = mpsc::channel::<Reading>();
    for channel in &channels {
        let tx = tx.clone();
        client
            .subscribe(channel, move |payload, metadata| {
                let _ = tx.send(Reading {
                    payload: payload.clone(),
                    metadata: metadata.clone(),
                });
            })
            .map_err(|err| client_error("subscribe failed", err))?;
    }
    drop(tx);

    client
        .connect(&host, port)
        .map_err(|err| client_error("connect failed", err))?;
    client.start();

    let mut printed = 0usize;
    while running.load(Ordering::SeqCst) {
        match rx.recv_timeout(WAKE_INTERVAL) {
            Ok(reading) => {
                print_reading(&reading, format);
                printed = printed.saturating_add(1);
                if args.count.is_some_and(|count| printed >= count) {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                warn!("all subscribers dropped");
                break;
            }
        }
    }

    client.stop_and_join();
    info!(printed, "watch finished");
    Ok(SUCCESS)
}

/// First Ctrl-C stops polling; a second one exits immediately, e.g. while
/// still waiting for the service to accept.
fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        if !running.swap(false, Ordering::SeqCst) {
            std::process::exit(FAILURE);
        }
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
