use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use homestage_core::{
    ArtNetTransmitter, CommandReply, ConfigManager, CpalBackend, Stage, StageCommand,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::runtime::Handle;

/// Drives Art-Net fixtures from live audio and the track that's playing.
///
/// Commands are read from stdin, one JSON object per line, and each gets a
/// JSON reply on stdout.
#[derive(Parser, Debug)]
#[command(name = "homestage")]
#[command(about = "Audio-reactive stage lighting")]
struct Args {
    /// Stage config file, created with defaults if missing
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    debug: bool,

    /// Capture device name, overriding the config
    #[arg(long)]
    microphone: Option<String>,

    /// Art-Net destination IP address, overriding the config
    #[arg(long, value_parser = parse_ip)]
    dest_ip: Option<IpAddr>,

    /// Broadcast Art-Net instead of unicasting
    #[arg(long, default_value = "false")]
    broadcast: bool,

    /// Start with output disabled
    #[arg(long)]
    disabled: bool,
}

fn parse_ip(s: &str) -> Result<IpAddr, String> {
    s.parse().map_err(|e| format!("Invalid IP address: {}", e))
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();

    let mut manager = ConfigManager::new(args.config.clone());
    let mut config = manager.load()?;

    let level = if args.debug || config.debug {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    log::info!("Loaded config from {}", manager.config_path().display());

    if let Some(microphone) = args.microphone {
        config.microphone = Some(microphone);
    }
    if let Some(dest_ip) = args.dest_ip {
        config.output.artnet.destination = dest_ip;
    }
    if args.broadcast {
        config.output.artnet.broadcast = true;
    }

    log::info!(
        "{} fixtures, Art-Net {} mode, microphone {:?}",
        config.fixtures.len(),
        config.output.artnet.get_mode_string(),
        config.microphone
    );

    let transmitter = Arc::new(ArtNetTransmitter::new(
        config.output.artnet.clone(),
        Handle::current(),
    )?);
    let stage = Arc::new(Stage::new(&config, Arc::new(CpalBackend::new()), transmitter));
    stage.start(&Handle::current())?;

    if !args.disabled {
        stage.set_enabled(true);
    }

    let commands = tokio::spawn(read_commands(Arc::clone(&stage)));

    tokio::signal::ctrl_c().await?;
    log::info!("Interrupted");
    commands.abort();

    stage.shutdown().await;
    Ok(())
}

/// Apply JSON-lines commands from stdin until it closes.
async fn read_commands(stage: Arc<Stage>) -> Result<(), anyhow::Error> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let reply = match line.parse::<StageCommand>() {
            Ok(command) => stage.apply(command),
            Err(e) => {
                log::warn!("{}", e);
                CommandReply::Error {
                    error: e.to_string(),
                }
            }
        };

        let mut out = serde_json::to_string(&reply)?;
        out.push('\n');
        stdout.write_all(out.as_bytes()).await?;
        stdout.flush().await?;
    }

    log::info!("Command input closed");
    Ok(())
}
