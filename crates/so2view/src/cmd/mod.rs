use std::time::Duration;

use clap::{Args, Subcommand};
use so2view_client::ClientConfig;
use so2view_transport::ReconnectPolicy;

use crate::config::FileConfig;
use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod channels;
pub mod envinfo;
pub mod fetch;
pub mod version;
pub mod watch;

/// Port the control software listens on.
pub const DEFAULT_PORT: u16 = 7009;
pub const DEFAULT_HOST: &str = "localhost";

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Request one channel once and print the reading.
    Fetch(FetchArgs),
    /// Poll channels and print readings until Ctrl-C.
    Watch(WatchArgs),
    /// Print the effective channel table.
    Channels(ChannelsArgs),
    /// Show version information.
    Version(VersionArgs),
    /// Print build and environment diagnostics.
    Envinfo(EnvinfoArgs),
}

pub fn run(command: Command, file: &FileConfig, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Fetch(args) => fetch::run(args, file, format),
        Command::Watch(args) => watch::run(args, file, format),
        Command::Channels(args) => channels::run(args, file, format),
        Command::Version(args) => version::run(args),
        Command::Envinfo(args) => envinfo::run(args, format),
    }
}

/// Where and how to connect.
#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// Instrument service as host:port (default localhost:7009).
    pub target: Option<String>,
    /// Give up after N connect attempts (default: fetch 1, watch unlimited).
    #[arg(long, value_name = "N")]
    pub retries: Option<u32>,
    /// Delay between connect attempts (e.g. 1s, 500ms).
    #[arg(long, default_value = "1s")]
    pub retry_delay: String,
    /// Per-request read timeout (e.g. 5s). Default: wait indefinitely.
    #[arg(long)]
    pub timeout: Option<String>,
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Channel to request (three ASCII characters).
    #[arg(long, short = 'c')]
    pub channel: String,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Channels to subscribe (comma-separated). Default: every table channel.
    #[arg(long, value_delimiter = ',')]
    pub channels: Option<Vec<String>>,
    /// Exit after printing N readings.
    #[arg(long)]
    pub count: Option<usize>,
    /// Poll interval (e.g. 1s, 250ms).
    #[arg(long)]
    pub interval: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct ChannelsArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug, Default)]
pub struct EnvinfoArgs {}

impl ConnectArgs {
    /// Resolve host and port: argument, then config file, then defaults.
    pub fn endpoint(&self, file: &FileConfig) -> CliResult<(String, u16)> {
        let (host, port) = match &self.target {
            Some(target) => parse_target(target)?,
            None => (None, None),
        };
        let host = host
            .or_else(|| file.host.clone())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = port.or(file.port).unwrap_or(DEFAULT_PORT);
        Ok((host, port))
    }

    /// Client configuration with file settings and flags applied.
    pub fn client_config(
        &self,
        file: &FileConfig,
        default_retries: Option<u32>,
    ) -> CliResult<ClientConfig> {
        let mut config = file.apply(ClientConfig::default())?;

        if file.reconnect.is_none() || self.retries.is_some() {
            let delay = parse_duration(&self.retry_delay)?;
            let policy = ReconnectPolicy::fixed(delay);
            config.reconnect = match self.retries.or(default_retries) {
                Some(attempts) => policy.with_max_attempts(attempts),
                None => policy,
            };
        }
        if let Some(timeout) = &self.timeout {
            config.frame.read_timeout = Some(parse_duration(timeout)?);
        }
        Ok(config)
    }
}

/// Split `host:port`. Either side may be empty; bare input is a host.
pub fn parse_target(input: &str) -> CliResult<(Option<String>, Option<u16>)> {
    let input = input.trim();
    let (host, port) = match input.rsplit_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (input, None),
    };

    let host = (!host.is_empty()).then(|| host.to_string());
    let port = match port {
        Some(port) if !port.is_empty() => Some(
            port.parse::<u16>()
                .map_err(|_| CliError::new(USAGE, format!("invalid port in target: {input}")))?,
        ),
        _ => None,
    };
    Ok((host, port))
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
