use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use event_dispatch::{dispatch_queue, BridgeMetrics, DeviceSessions, EventLoop, IsrSender};
use hid_input::{diff, usage, KeySnapshot, MockHost};
use signal_registry::SignalInfo;

mod config;
mod script;

use config::{Bridge, BridgeConfig};

#[derive(Parser, Debug)]
#[command(
    name = "pendant",
    version,
    about = "Keyboard pendant to control-signal bridge",
    disable_help_subcommand = true
)]
struct Cli {
    /// Bridge layout (YAML); the built-in pendant layout is used if omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, short, action = ArgAction::SetTrue, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the bridge against the mock USB host
    Run {
        /// Report script to replay; a built-in demo is used if omitted
        #[arg(long)]
        script: Option<PathBuf>,
        /// Print Prometheus metrics on exit
        #[arg(long, action = ArgAction::SetTrue)]
        metrics: bool,
    },
    /// Print the signal registry built from the config
    Dump {
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },
    /// Print the edges between two key sets, e.g. --from 1,2 --to 2,3
    Diff {
        #[arg(long, value_delimiter = ',', default_value = "")]
        from: Vec<String>,
        #[arg(long, value_delimiter = ',', default_value = "")]
        to: Vec<String>,
        /// Modifier byte carried by the `to` report (hex accepted)
        #[arg(long, default_value = "0")]
        modifiers: String,
    },
    /// List key names accepted in keymaps
    Keys,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    match cli.command {
        Commands::Run { script, metrics } => {
            let cfg = BridgeConfig::load_or_default(cli.config.as_deref())?;
            cmd_run(&cfg, script, metrics).await
        }
        Commands::Dump { json } => {
            let cfg = BridgeConfig::load_or_default(cli.config.as_deref())?;
            cmd_dump(&cfg, json)
        }
        Commands::Diff {
            from,
            to,
            modifiers,
        } => cmd_diff(&from, &to, &modifiers),
        Commands::Keys => cmd_keys(),
    }
}

fn setup_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

async fn cmd_run(cfg: &BridgeConfig, script: Option<PathBuf>, with_metrics: bool) -> Result<()> {
    let steps = match &script {
        Some(p) => script::load_script(p)?,
        None => script::demo_script(),
    };
    let Bridge {
        registry,
        bank,
        translator,
    } = cfg.build()?;
    info!(signals = bank.len(), "signal storage allocated");
    let registry = Arc::new(registry);

    let (isr, driver, rx) = dispatch_queue(cfg.queue_capacity)?;
    let host = MockHost::new();
    let sessions = DeviceSessions::new(host.clone(), registry.clone(), Arc::new(translator));
    let mut event_loop = EventLoop::new(rx, sessions);
    let metrics = if with_metrics {
        Some(BridgeMetrics::new()?)
    } else {
        None
    };
    if let Some(m) = &metrics {
        event_loop = event_loop.with_metrics(m.clone());
    }

    let ctrl_c = tokio::spawn(cancel_on_ctrl_c(isr.clone()));
    let driver_thread = script::spawn_driver(host, driver, isr, steps);

    let summary = event_loop.run().await;
    ctrl_c.abort();

    match tokio::task::spawn_blocking(move || driver_thread.join()).await? {
        Ok(res) => res.context("driver thread")?,
        Err(_) => bail!("driver thread panicked"),
    }

    print!("{}", registry.dump());
    println!(
        "dispatched={} discarded={} isr_dropped={} reason={:?}",
        summary.dispatched, summary.discarded, summary.isr_dropped, summary.reason
    );
    if let Some(m) = &metrics {
        print!("{}", m.encode_text());
    }
    drop(bank);
    Ok(())
}

/// Ctrl-C stands in for the hardware cancel button.
async fn cancel_on_ctrl_c(isr: IsrSender) {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("ctrl-c received");
        if !isr.raise_cancel() {
            warn!(dropped = isr.dropped(), "queue full, cancel dropped; press again");
        }
    }
}

fn cmd_dump(cfg: &BridgeConfig, json: bool) -> Result<()> {
    let bridge = cfg.build()?;
    if json {
        let infos: Vec<SignalInfo> = bridge.registry.iter().collect();
        println!("{}", serde_json::to_string_pretty(&infos)?);
        return Ok(());
    }
    print!("{}", bridge.registry.dump());
    for (key, signal) in bridge.translator.bindings() {
        let name = usage::key_name(key).unwrap_or("?");
        println!("  {key} {name:<6} -> {signal}");
    }
    Ok(())
}

fn parse_keys(items: &[String]) -> Result<Vec<u8>> {
    items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            usage::key_from_name(s)
                .map(|k| k.raw())
                .with_context(|| format!("unknown key '{s}'"))
        })
        .collect()
}

fn parse_modifiers(s: &str) -> Result<u8> {
    let t = s.trim();
    let parsed = match t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => t.parse(),
    };
    parsed.with_context(|| format!("bad modifier byte '{s}'"))
}

fn cmd_diff(from: &[String], to: &[String], modifiers: &str) -> Result<()> {
    let from_keys = parse_keys(from)?;
    let to_keys = parse_keys(to)?;
    let prev = KeySnapshot::from_keys(&from_keys, 0).context("--from holds more than 6 keys")?;
    let cur = KeySnapshot::from_keys(&to_keys, parse_modifiers(modifiers)?)
        .context("--to holds more than 6 keys")?;

    let edges = diff(&prev, &cur);
    if edges.is_empty() {
        println!("(no edges)");
    }
    for e in edges.iter() {
        println!("{e}");
    }
    Ok(())
}

fn cmd_keys() -> Result<()> {
    for (name, key) in usage::named_keys() {
        println!("{name:<10} {key}");
    }
    Ok(())
}
