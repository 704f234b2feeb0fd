use std::collections::BTreeMap;
use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use so2view_payload::{ChannelTable, Payload, Reading};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Summary of one reading; sample data itself is not printed.
#[derive(Serialize)]
struct ReadingOutput<'a> {
    channel: &'a str,
    kind: &'static str,
    shape: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bit_depth: Option<u8>,
    min: Option<f64>,
    max: Option<f64>,
    metadata: BTreeMap<&'a str, &'a str>,
    timestamp: String,
}

impl<'a> ReadingOutput<'a> {
    fn new(reading: &'a Reading) -> Self {
        let (shape, bit_depth, range) = match &reading.payload {
            Payload::Image(frame) => (
                frame.shape(),
                Some(frame.samples().bit_depth()),
                frame.sample_range(),
            ),
            Payload::Spectrum(spectrum) => (vec![spectrum.len()], None, spectrum.range()),
        };
        Self {
            channel: reading.channel().unwrap_or("?"),
            kind: reading.payload.kind_name(),
            shape,
            bit_depth,
            min: range.map(|(lo, _)| lo),
            max: range.map(|(_, hi)| hi),
            metadata: reading
                .metadata
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect(),
            timestamp: now_unix_seconds(),
        }
    }

    fn shape_text(&self) -> String {
        self.shape
            .iter()
            .map(usize::to_string)
            .collect::<Vec<_>>()
            .join("x")
    }

    fn range_text(&self) -> String {
        match (self.min, self.max) {
            (Some(lo), Some(hi)) => format!("{lo}..{hi}"),
            _ => "-".to_string(),
        }
    }

    fn metadata_text(&self) -> String {
        self.metadata
            .iter()
            .filter(|(key, _)| **key != so2view_payload::CHANNEL_KEY)
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

pub fn print_reading(reading: &Reading, format: OutputFormat) {
    let out = ReadingOutput::new(reading);
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CHANNEL", "KIND", "SHAPE", "RANGE", "METADATA"])
                .add_row(vec![
                    out.channel.to_string(),
                    out.kind.to_string(),
                    out.shape_text(),
                    out.range_text(),
                    out.metadata_text(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            println!(
                "channel={} kind={} shape={} range={} {}",
                out.channel,
                out.kind,
                out.shape_text(),
                out.range_text(),
                out.metadata_text()
            );
        }
    }
}

#[derive(Serialize)]
struct NoDataOutput<'a> {
    channel: &'a str,
    kind: &'static str,
    timestamp: String,
}

/// Report a size-0 answer.
pub fn print_no_data(channel: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = NoDataOutput {
                channel,
                kind: "none",
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => println!("channel={channel} no data"),
        OutputFormat::Raw => {}
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

#[derive(Serialize)]
struct ChannelOutput {
    channel: String,
    kind: String,
    order: usize,
}

pub fn print_channels(table: &ChannelTable, format: OutputFormat) {
    let rows: Vec<ChannelOutput> = table
        .iter()
        .enumerate()
        .map(|(order, spec)| ChannelOutput {
            channel: spec.channel.to_string(),
            kind: spec.kind.to_string(),
            order,
        })
        .collect();

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(&rows).unwrap_or_else(|_| "[]".to_string())
        ),
        OutputFormat::Table => {
            let mut out = Table::new();
            out.load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ORDER", "CHANNEL", "KIND"]);
            for row in &rows {
                out.add_row(vec![row.order.to_string(), row.channel.clone(), row.kind.clone()]);
            }
            println!("{out}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for row in &rows {
                println!("{} {}", row.channel, row.kind);
            }
        }
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
