//! CLI definition and command entry points

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use cinder_core::Config;

use crate::console;

#[derive(Parser)]
#[command(name = "cinder")]
#[command(about = "Ephemeral self-destructing secret vault")]
#[command(version)]
#[command(after_help = r#"CONSOLE COMMANDS (inside `cinder run`):
    put <name> <value>   Encrypt and store a secret
    get <name>           Retrieve and decrypt a secret
    list                 List stored secret names
    cred <label> [len]   Derive a deterministic service credential
    status               Session state, threat level, idle time
    panic                Operator panic: latch the panic sensor and burn
    burn                 Destroy the session (key, storage, everything)
    regen                Burn, then start a fresh unrelated session
    quit                 Burn and exit

SECURITY:
    - Secrets live only in a per-session temp area, AES-256-GCM sealed
    - The key exists only in process memory and is zeroized on burn
    - Nothing survives process exit by design"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start a session and run the threat-monitored operator console
    Run {
        /// Config file (default: ~/.config/cinder/config.json)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Threat level that triggers the burn, in (0, 1]
        #[arg(long)]
        threshold: Option<f64>,

        /// Milliseconds between threat evaluations
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Dead-man's switch inactivity window in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Directory to watch for file-integrity drift
        #[arg(long)]
        watch: Option<PathBuf>,
    },

    /// Write a default config file
    Init {
        /// Where to write it (default: ~/.config/cinder/config.json)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

pub async fn cmd_run(
    config_path: Option<PathBuf>,
    threshold: Option<f64>,
    interval_ms: Option<u64>,
    timeout_secs: Option<u64>,
    watch: Option<PathBuf>,
) -> Result<()> {
    let path = config_path.unwrap_or_else(Config::default_path);
    let mut config = Config::load(&path)?;

    // CLI flags win over the config file
    if let Some(t) = threshold {
        config.threshold = t;
    }
    if let Some(ms) = interval_ms {
        config.poll_interval_ms = ms;
    }
    if let Some(secs) = timeout_secs {
        config.deadman_timeout_secs = secs;
    }
    if let Some(dir) = watch {
        config.watch_dir = Some(dir);
    }

    anyhow::ensure!(
        config.threshold > 0.0 && config.threshold <= 1.0,
        "threshold must be in (0, 1], got {}",
        config.threshold
    );

    console::run(config).await
}

pub fn cmd_init(path: Option<PathBuf>) -> Result<()> {
    let path = path.unwrap_or_else(Config::default_path);
    Config::default().save(&path)?;
    println!("wrote default config to {}", path.display());
    Ok(())
}
