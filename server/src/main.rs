//! statecast - live game state over WebSocket
//!
//! Loads the address schema, maps the cartridge and memory image into a
//! headless Game Boy address space and streams snapshots to every connected
//! client until Ctrl-C.

mod image;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use statecast_core::config::{self, Config};
use statecast_core::{RegistryDocuments, StateServer};
use statecast_shared::schema::parse_number;

#[derive(Parser)]
#[command(name = "statecast")]
#[command(about = "Stream Game Boy game state to WebSocket clients")]
#[command(version)]
struct Cli {
    /// Config file (default: statecast.toml in the platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Cartridge ROM
    #[arg(long)]
    rom: Option<PathBuf>,

    /// Raw memory dump to map into the address space
    #[arg(long)]
    memory_image: Option<PathBuf>,

    /// Load address of the memory dump (decimal or 0x-prefixed)
    #[arg(long, value_parser = parse_address)]
    memory_image_base: Option<u32>,

    /// Address-definition document
    #[arg(long)]
    memory_addresses: Option<PathBuf>,

    /// Value-translation document
    #[arg(long)]
    values_path: Option<PathBuf>,

    /// Bind address
    #[arg(long)]
    host: Option<String>,

    /// WebSocket port
    #[arg(short, long)]
    port: Option<u16>,

    /// Snapshots per second
    #[arg(long)]
    tick_rate: Option<u32>,

    /// Emulator frames per snapshot
    #[arg(long)]
    frame_stride: Option<u32>,

    /// Frames a button press is held
    #[arg(long)]
    hold_frames: Option<u32>,

    /// Frames stepped before the first snapshot
    #[arg(long)]
    warmup_frames: Option<u32>,

    /// Write the effective config to this path and exit
    #[arg(long, value_name = "PATH")]
    write_config: Option<PathBuf>,
}

fn parse_address(text: &str) -> Result<u32, String> {
    parse_number(text).ok_or_else(|| format!("'{text}' is not a number"))
}

impl Cli {
    /// Overlay command-line values on the file config.
    fn apply(self, config: &mut Config) {
        let emulator = &mut config.emulator;
        if let Some(rom) = self.rom {
            emulator.rom = Some(rom);
        }
        if let Some(image) = self.memory_image {
            emulator.memory_image = Some(image);
        }
        if let Some(base) = self.memory_image_base {
            emulator.memory_image_base = base;
        }

        if let Some(path) = self.memory_addresses {
            config.schema.addresses = path;
        }
        if let Some(path) = self.values_path {
            config.schema.values = path;
        }

        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }

        let session = &mut config.session;
        if let Some(rate) = self.tick_rate {
            session.tick_rate_hz = rate;
        }
        if let Some(stride) = self.frame_stride {
            session.frame_stride = stride;
        }
        if let Some(frames) = self.hold_frames {
            session.hold_frames = frames;
        }
        if let Some(frames) = self.warmup_frames {
            session.warmup_frames = frames;
        }
    }
}

/// Save `config` so later runs can start from it with `--config`.
fn write_config(config: &Config, path: &Path) -> Result<()> {
    config::save_to(config, path)
        .with_context(|| format!("failed to write config to {}", path.display()))?;
    tracing::info!(path = %path.display(), "Config written");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => config::load_from(path)?,
        None => config::load()?,
    };
    let write_to = cli.write_config.clone();
    cli.apply(&mut config);
    config.validate()?;

    if let Some(path) = write_to {
        write_config(&config, &path)?;
        return Ok(());
    }

    let documents = RegistryDocuments::from_files(&config.schema.addresses, &config.schema.values)
        .context("failed to load schema")?;
    let emulator = image::load(&config.emulator)?;
    let bind = config.server.bind_addr()?;

    let server = StateServer::new(&documents, emulator, bind)
        .context("schema does not fit the address space")?
        .with_session(config.session)
        .with_queues(config.server.outbound_queue, config.server.input_queue);

    let stats = server.run().await?;
    tracing::info!(
        ticks = stats.ticks,
        frames = stats.frames,
        snapshots = stats.snapshots_sent,
        "Exiting"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "statecast",
            "--port",
            "9001",
            "--memory-image-base",
            "0xD000",
            "--hold-frames",
            "12",
            "--values-path",
            "custom/values.json",
        ]);
        let mut config = Config::default();
        cli.apply(&mut config);

        assert_eq!(config.server.port, 9001);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.emulator.memory_image_base, 0xD000);
        assert_eq!(config.session.hold_frames, 12);
        assert_eq!(config.session.tick_rate_hz, 10);
        assert_eq!(config.schema.values, PathBuf::from("custom/values.json"));
    }

    #[test]
    fn test_write_config_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("statecast.toml");
        let cli = Cli::parse_from([
            "statecast",
            "--port",
            "9100",
            "--write-config",
            path.to_str().unwrap(),
        ]);
        assert_eq!(cli.write_config.as_deref(), Some(path.as_path()));

        let mut config = Config::default();
        cli.apply(&mut config);
        write_config(&config, &path).unwrap();
        assert_eq!(config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_bad_address_rejected() {
        assert!(Cli::try_parse_from(["statecast", "--memory-image-base", "ram"]).is_err());
    }
}
