//! QRNG API command line client.

use anyhow::Context;
use clap::{Parser, Subcommand};
use qrng_cli::config::Config;
use qrng_client::{
    GenerateRequest, OutputFormat, QrngClient, QrngStreamClient, QuantumMethod, SignatureType,
    StreamEvent, StreamOptions,
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Fetch signed quantum entropy from the QRNG API.
#[derive(Debug, Parser)]
#[command(name = "qrng", version, about)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Request one block of signed entropy.
    Generate {
        /// Number of random bytes (1-1024).
        #[arg(short, long, default_value_t = 32)]
        bytes: u32,
        /// Output format: hex, base64, binary, uint8, uint32.
        #[arg(short, long, default_value_t = OutputFormat::Hex)]
        format: OutputFormat,
        /// Entropy source: auto, photon, tunneling, vacuum, simulator.
        #[arg(short, long)]
        method: Option<QuantumMethod>,
        /// Signature scheme: ed25519, dilithium2, dilithium3, dilithium5.
        #[arg(short, long)]
        signature_type: Option<SignatureType>,
        /// Print the full signed result as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show service health.
    Health,
    /// Print streamed entropy chunks.
    Stream {
        /// Bytes per chunk (1-1024).
        #[arg(long, default_value_t = 32)]
        chunk_size: u32,
        /// Output format: hex, base64, binary, uint8, uint32.
        #[arg(short, long, default_value_t = OutputFormat::Hex)]
        format: OutputFormat,
        /// Stop after this many chunks.
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };
    config.apply_env()?;
    config.validate()?;

    match cli.command {
        Command::Generate {
            bytes,
            format,
            method,
            signature_type,
            json,
        } => {
            let request = GenerateRequest {
                bytes,
                format,
                method,
                signature_type,
            };
            generate(&config, &request, json)
        }
        Command::Health => health(&config),
        Command::Stream {
            chunk_size,
            format,
            count,
        } => stream(&config, StreamOptions { chunk_size, format }, count),
    }
}

fn generate(config: &Config, request: &GenerateRequest, json: bool) -> anyhow::Result<()> {
    let client = QrngClient::new(config.client_config()?)?;
    let result = client.generate(request)?;
    client.close();

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        info!(proof_id = %result.proof_id, signature_type = %result.signature_type, "entropy received");
        println!("{}", result.data);
    }
    Ok(())
}

fn health(config: &Config) -> anyhow::Result<()> {
    let client = QrngClient::new(config.client_config()?)?;
    let status = client.health()?;
    client.close();

    println!("status:    {}", status.status);
    println!("timestamp: {}", status.timestamp);
    let mut metrics: Vec<_> = status.metrics.iter().collect();
    metrics.sort_by(|a, b| a.0.cmp(b.0));
    for (name, value) in metrics {
        println!("  {name}: {value}");
    }
    Ok(())
}

fn stream(config: &Config, options: StreamOptions, count: usize) -> anyhow::Result<()> {
    let mut client = QrngStreamClient::new(config.stream_config()?);
    let events = client.connect_channel(options)?;
    info!(chunk_size = options.chunk_size, format = %options.format, "streaming entropy");

    let mut received = 0;
    while received < count {
        match events.recv() {
            Ok(StreamEvent::Data(chunk)) => {
                println!("{chunk}");
                received += 1;
            }
            Ok(StreamEvent::Error(err)) => warn!(error = %err, "stream error"),
            Ok(StreamEvent::Closed) | Err(_) => break,
        }
    }

    client.disconnect();
    info!(received, "stream finished");
    Ok(())
}
