use so2view_client::Connection;
use so2view_frame::Channel;
use tracing::info;

use crate::cmd::FetchArgs;
use crate::config::FileConfig;
use crate::exit::{client_error, frame_error, CliResult, SUCCESS};
use crate::output::{print_no_data, print_raw, print_reading, OutputFormat};

pub fn run(args: FetchArgs, file: &FileConfig, format: OutputFormat) -> CliResult<i32> {
    let channel = Channel::new(&args.channel).map_err(|err| frame_error("invalid channel", err))?;
    let (host, port) = args.connect.endpoint(file)?;
    let config = args.connect.client_config(file, Some(1))?;

    let mut connection = Connection::new(config);
    connection
        .connect(&host, port)
        .map_err(|err| client_error("connect failed", err))?;
    info!(%channel, peer = %format!("{host}:{port}"), "requesting");

    if matches!(format, OutputFormat::Raw) {
        let body = connection
            .request_raw(channel)
            .map_err(|err| client_error("request failed", err))?;
        print_raw(&body);
        return Ok(SUCCESS);
    }

    match connection
        .request_channel(channel)
        .map_err(|err| client_error("request failed", err))?
    {
        Some(reading) => print_reading(&reading, format),
        None => print_no_data(channel.as_str(), format),
    }
    Ok(SUCCESS)
}
