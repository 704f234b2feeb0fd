use std::collections::BTreeMap;

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use crate::cmd::{EnvinfoArgs, DEFAULT_HOST, DEFAULT_PORT};
use crate::exit::{CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct PlatformInfo {
    os: String,
    arch: String,
}

#[derive(Serialize)]
struct EnvInfoOutput {
    version: String,
    target: String,
    rust_version: String,
    git_hash: String,
    platform: PlatformInfo,
    features: Vec<String>,
    default_endpoint: String,
    spectrum_samples: usize,
    max_payload_bytes: usize,
    dependencies: BTreeMap<String, String>,
    environment: BTreeMap<String, Option<String>>,
}

pub fn run(_args: EnvinfoArgs, format: OutputFormat) -> CliResult<i32> {
    let mut deps = BTreeMap::new();
    deps.insert("clap".to_string(), "4.5".to_string());
    deps.insert("image".to_string(), "0.25".to_string());
    deps.insert("tracing".to_string(), "0.1".to_string());

    let mut env = BTreeMap::new();
    for key in ["SO2VIEW_CONFIG", "SO2VIEW_LOG_LEVEL"] {
        env.insert(key.to_string(), std::env::var(key).ok());
    }

    let output = EnvInfoOutput {
        version: env!("CARGO_PKG_VERSION").to_string(),
        target: target_triple(),
        rust_version: option_env!("RUSTC_VERSION")
            .unwrap_or("unknown")
            .to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        platform: PlatformInfo {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        },
        features: active_features(),
        default_endpoint: format!("{DEFAULT_HOST}:{DEFAULT_PORT}"),
        spectrum_samples: so2view_payload::DEFAULT_SPECTRUM_SAMPLES,
        max_payload_bytes: so2view_frame::DEFAULT_MAX_PAYLOAD,
        dependencies: deps,
        environment: env,
    };

    print_envinfo(&output, format);
    Ok(SUCCESS)
}

fn target_triple() -> String {
    option_env!("SO2VIEW_BUILD_TARGET")
        .map(str::to_string)
        .unwrap_or_else(|| {
            format!(
                "{}-unknown-{}",
                std::env::consts::ARCH,
                std::env::consts::OS
            )
        })
}

fn print_envinfo(output: &EnvInfoOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KEY", "VALUE"]);
            for (key, value) in summary_rows(output) {
                table.add_row(vec![key.to_string(), value]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("so2view environment\n");
            for (key, value) in summary_rows(output) {
                println!("  {key:<22} {value}");
            }
        }
        OutputFormat::Raw => println!("{}", output.version),
    }
}

fn summary_rows(output: &EnvInfoOutput) -> Vec<(&str, String)> {
    let mut rows = vec![
        ("version", output.version.clone()),
        ("target", output.target.clone()),
        ("rust", output.rust_version.clone()),
        ("git hash", output.git_hash.clone()),
        (
            "platform",
            format!("{} ({})", output.platform.os, output.platform.arch),
        ),
        ("features", output.features.join(", ")),
        ("default endpoint", output.default_endpoint.clone()),
        ("spectrum samples", output.spectrum_samples.to_string()),
        ("max frame bytes", output.max_payload_bytes.to_string()),
    ];
    for (name, version) in &output.dependencies {
        rows.push((name.as_str(), version.clone()));
    }
    for (name, value) in &output.environment {
        rows.push((
            name.as_str(),
            value.clone().unwrap_or_else(|| "(not set)".to_string()),
        ));
    }
    rows
}

fn active_features() -> Vec<String> {
    let mut features = Vec::new();
    if cfg!(feature = "async") {
        features.push("async".to_string());
    }
    if cfg!(feature = "cli") {
        features.push("cli".to_string());
    }
    features
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envinfo_json_reports_protocol_defaults() {
        let out = EnvInfoOutput {
            version: "0.1.0".to_string(),
            target: "a-b-c".to_string(),
            rust_version: "1.85.0".to_string(),
            git_hash: "abc".to_string(),
            platform: PlatformInfo {
                os: "linux".to_string(),
                arch: "x86_64".to_string(),
            },
            features: vec!["cli".to_string()],
            default_endpoint: "localhost:7009".to_string(),
            spectrum_samples: 2048,
            max_payload_bytes: 64,
            dependencies: BTreeMap::new(),
            environment: BTreeMap::new(),
        };

        let json = serde_json::to_string(&out).expect("envinfo output should serialize");
        assert!(json.contains("\"default_endpoint\":\"localhost:7009\""));
        assert!(json.contains("\"spectrum_samples\":2048"));
    }

    #[test]
    fn summary_lists_unset_environment() {
        let mut environment = BTreeMap::new();
        environment.insert("SO2VIEW_CONFIG".to_string(), None);
        let out = EnvInfoOutput {
            version: "0.1.0".to_string(),
            target: target_triple(),
            rust_version: "unknown".to_string(),
            git_hash: "unknown".to_string(),
            platform: PlatformInfo {
                os: "linux".to_string(),
                arch: "aarch64".to_string(),
            },
            features: Vec::new(),
            default_endpoint: "localhost:7009".to_string(),
            spectrum_samples: 2048,
            max_payload_bytes: 1,
            dependencies: BTreeMap::new(),
            environment,
        };

        let rows = summary_rows(&out);
        assert!(rows.contains(&("SO2VIEW_CONFIG", "(not set)".to_string())));
        assert!(rows.contains(&("platform", "linux (aarch64)".to_string())));
    }

    #[test]
    fn target_looks_like_triple() {
        let target = target_triple();
        assert!(target.split('-').count() >= 3);
    }
}
