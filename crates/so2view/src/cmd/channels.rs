use so2view_client::ClientConfig;

use crate::cmd::ChannelsArgs;
use crate::config::FileConfig;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_channels, OutputFormat};

pub fn run(_args: ChannelsArgs, file: &FileConfig, format: OutputFormat) -> CliResult<i32> {
    let config = file.apply(ClientConfig::default())?;
    print_channels(&config.channels, format);
    Ok(SUCCESS)
}
