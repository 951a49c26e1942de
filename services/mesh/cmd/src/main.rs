//! TLV inspection tool.
//!
//! Decodes hex dumps of CMDU payloads into their TLVs and builds sample
//! records of every family the codec supports.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod config;
mod logging;
mod render;
mod sample;

use config::{CliConfig, OutputFormat};
use logging::TlvfLogFormatter;
use sample::SampleKind;

/// Decode and build IEEE 1905 / EasyMesh TLVs
#[derive(Parser, Debug)]
#[command(name = "tlvf", version, about = "Decode and build IEEE 1905 / EasyMesh TLVs")]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Configuration file path
    #[arg(long, global = true, default_value = "tlvf.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode a CMDU payload given as hex
    Decode {
        /// Hex bytes; whitespace, ':' and '-' separators are ignored
        hex: Option<String>,

        /// Read the hex dump from a file
        #[arg(long, conflicts_with = "hex")]
        file: Option<PathBuf>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Build a sample record and print it as hex
    Sample {
        /// Record kind
        #[arg(value_enum)]
        kind: SampleKind,

        /// Buffer capacity in bytes
        #[arg(long)]
        capacity: Option<usize>,
    },
}

fn init_tracing(level: &str) -> Result<()> {
    let env_filter = EnvFilter::new("warn")
        .add_directive(format!("tlvf={}", level).parse()?)
        .add_directive(format!("mesh_tlvf={}", level).parse()?);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .event_format(TlvfLogFormatter::new("tlvf"))
        .init();
    Ok(())
}

fn decode(config: &CliConfig, hex: Option<String>, file: Option<PathBuf>, json: bool) -> Result<()> {
    let input = match (hex, file) {
        (Some(hex), _) => hex,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {:?}", path))?,
        (None, None) => bail!("either <HEX> or --file is required"),
    };

    let data = render::parse_hex(&input)?;
    if data.len() > config.max_message_size {
        bail!(
            "message is {} bytes, larger than max_message_size {}",
            data.len(),
            config.max_message_size
        );
    }
    info!("Decoding {} bytes", data.len());

    let summaries = render::summarize(&data);
    if json || config.output == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        print!("{}", render::render_text(&summaries));
    }

    let failed = summaries.iter().filter(|s| s.error.is_some()).count();
    if failed > 0 {
        crate::component_error!("decode", failed, "message contains undecodable tlvs");
        bail!("{} of {} tlvs could not be decoded", failed, summaries.len());
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = CliConfig::load_from_file(&args.config)?;
    let level = args.log_level.clone().unwrap_or_else(|| config.log_level.clone());
    init_tracing(&level)?;
    debug!("Using configuration {:?}", config);

    match args.command {
        Command::Decode { hex, file, json } => decode(&config, hex, file, json),
        Command::Sample { kind, capacity } => {
            let capacity = capacity.unwrap_or(config.default_capacity);
            let bytes = sample::build_sample(kind, capacity)
                .with_context(|| format!("failed to build sample {:?}", kind))?;
            crate::component_info!("sample", "Built {:?} sample, {} bytes", kind, bytes.len());
            println!("{}", hex::encode(&bytes));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_fails_on_undecodable_tlv() {
        let config = CliConfig::default();
        let err = decode(&config, Some("77 00 00 00 00 00".to_string()), None, false).unwrap_err();
        assert_eq!(err.to_string(), "1 of 2 tlvs could not be decoded");
    }

    #[test]
    fn test_decode_accepts_valid_message() {
        let config = CliConfig::default();
        assert!(decode(&config, Some("10 00 01 01 00 00 00".to_string()), None, true).is_ok());
    }

    #[test]
    fn test_decode_requires_input() {
        let config = CliConfig::default();
        assert!(decode(&config, None, None, false).is_err());
    }
}
