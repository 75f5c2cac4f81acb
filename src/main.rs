// src/main.rs

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::Value;
use snapd_client::{SnapdClient, daemon_socket_present, resolve_channel};
use tracing::info;

#[derive(Parser)]
#[command(name = "snapd-client")]
#[command(author, version, about = "Manage snaps through the snapd control socket", long_about = None)]
struct Cli {
    /// Path to the snapd control socket
    #[arg(long)]
    socket: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List installed snaps
    List,

    /// Search the store for snaps by name
    Find {
        /// Snap name to search for
        name: String,
    },

    /// Install a snap
    Install {
        /// Snap name
        snap: String,
        /// Channel to track (track/risk, e.g. latest/stable)
        #[arg(short, long)]
        channel: Option<String>,
        /// Use classic confinement
        #[arg(long)]
        classic: bool,
        /// Install in developer mode
        #[arg(long)]
        devmode: bool,
        /// Enforce strict confinement even for classic snaps
        #[arg(long)]
        jailmode: bool,
    },

    /// Refresh a snap, optionally switching channels
    Refresh {
        /// Snap name
        snap: String,
        /// Channel to switch to
        #[arg(short, long)]
        channel: Option<String>,
        /// Use classic confinement
        #[arg(long)]
        classic: bool,
        /// Refresh in developer mode
        #[arg(long)]
        devmode: bool,
        /// Enforce strict confinement even for classic snaps
        #[arg(long)]
        jailmode: bool,
    },

    /// Remove a snap
    Remove {
        /// Snap name
        snap: String,
        /// Do not save a data snapshot
        #[arg(long)]
        purge: bool,
    },

    /// Hold automatic refreshes for a snap
    Hold {
        /// Snap name
        snap: String,
        /// Hold until this date/time (default: forever)
        #[arg(short, long)]
        time: Option<String>,
    },

    /// Lift a refresh hold
    Unhold {
        /// Snap name
        snap: String,
    },

    /// Read a configuration option (snap may be "system")
    ConfGet {
        /// Snap name
        snap: String,
        /// Option key
        key: String,
    },

    /// Write a configuration option (value is JSON; null unsets)
    ConfSet {
        /// Snap name
        snap: String,
        /// Option key
        key: String,
        /// Option value
        value: String,
    },
}

/// Collect CLI flags into the option-string form the request builder takes
fn collect_options(
    classic: bool,
    devmode: bool,
    jailmode: bool,
    hold_time: Option<&str>,
) -> Vec<String> {
    let mut options = Vec::new();
    if classic {
        options.push("classic".to_string());
    }
    if devmode {
        options.push("devmode".to_string());
    }
    if jailmode {
        options.push("jailmode".to_string());
    }
    if let Some(time) = hold_time {
        options.push(format!("hold_time={}", time));
    }
    options
}

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let client = match &cli.socket {
        Some(path) => SnapdClient::with_socket_path(path),
        None => {
            if !daemon_socket_present() {
                anyhow::bail!("snapd socket not found; is snapd installed and running?");
            }
            SnapdClient::new()
        }
    };

    match cli.command {
        Commands::List => {
            let snaps = client.list_installed()?;
            if snaps.is_empty() {
                println!("No snaps installed");
                return Ok(());
            }
            for snap in snaps {
                let channel = snap.tracking_channel.as_deref().unwrap_or("-");
                let hold = snap.hold.as_deref().unwrap_or("-");
                println!("{:<24} {:<20} {}", snap.name, channel, hold);
            }
        }
        Commands::Find { name } => {
            let candidates = client.find(&name)?;
            if candidates.is_empty() {
                println!("No snaps found for \"{}\"", name);
                return Ok(());
            }
            for candidate in candidates {
                println!(
                    "{:<24} {:<12} {}",
                    candidate.name,
                    candidate.version.as_deref().unwrap_or("-"),
                    candidate.channel.as_deref().unwrap_or("-")
                );
            }
        }
        Commands::Install {
            snap,
            channel,
            classic,
            devmode,
            jailmode,
        } => {
            let options = collect_options(classic, devmode, jailmode, None);
            let channel = resolve_channel(channel.as_deref(), Some(&options));
            info!("Installing {} from {}", snap, channel);
            client.install(&snap, Some(&channel), Some(&options))?;
            println!("{} installed", snap);
        }
        Commands::Refresh {
            snap,
            channel,
            classic,
            devmode,
            jailmode,
        } => {
            let options = collect_options(classic, devmode, jailmode, None);
            let channel = resolve_channel(channel.as_deref(), Some(&options));
            info!("Refreshing {} on {}", snap, channel);
            client.refresh(&snap, Some(&channel), Some(&options))?;
            println!("{} refreshed", snap);
        }
        Commands::Remove { snap, purge } => {
            if purge {
                client.purge(&snap)?;
            } else {
                client.remove(&snap)?;
            }
            println!("{} removed", snap);
        }
        Commands::Hold { snap, time } => {
            let options = collect_options(false, false, false, time.as_deref());
            client.hold(&snap, Some(&options))?;
            println!("{} held", snap);
        }
        Commands::Unhold { snap } => {
            client.unhold(&snap)?;
            println!("{} unheld", snap);
        }
        Commands::ConfGet { snap, key } => match client.get_conf(&snap, &key)? {
            Some(value) => println!("{}", value),
            None => println!("{} is not set", key),
        },
        Commands::ConfSet { snap, key, value } => {
            // Bare words become strings; anything JSON-shaped is passed as-is.
            let value: Value =
                serde_json::from_str(&value).unwrap_or_else(|_| Value::String(value));
            client.set_conf(&snap, &key, value)?;
            println!("{}.{} set", snap, key);
        }
    }

    Ok(())
}
