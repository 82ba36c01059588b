//! `valvelink` - one-shot commands for the water system valve rig.

mod serial;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use valvelink_messenger::{schema, telemetry, CommandTable};
use valvelink_rig::{discover, DeviceVariant, OperationMode, RigConfig, Session};

use crate::serial::{list_ports, SerialTransport};

/// Drive a water system valve rig over its serial link.
#[derive(Parser, Debug)]
#[command(name = "valvelink", version)]
struct Cli {
    /// Serial port of the rig; probes every port when omitted.
    #[arg(short, long, global = true)]
    port: Option<String>,

    /// YAML rig configuration.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Firmware variant to expect (overrides the configuration).
    #[arg(long, global = true)]
    variant: Option<DeviceVariant>,

    /// Milliseconds to wait after opening a port for the board to reset.
    #[arg(long, default_value_t = 2000, global = true)]
    settle_ms: u64,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// List serial ports.
    Ports,
    /// Find the port the rig is attached to.
    Discover,
    /// Probe the rig and report its identity.
    Probe,
    /// Print dispensing statistics.
    Stats {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Clear the dispense trace.
    ResetTrace,
    /// Set the operation mode (0-2 or direct/reward/alternating).
    SetMode { mode: OperationMode },
    /// Set the beam break threshold [0.0, 1.0].
    SetThreshold { threshold: f32 },
    /// Set the dispensing duration in milliseconds.
    SetDuration { duration_ms: i32 },
    /// Set the dispensing probability [0.0, 1.0].
    SetProbability { probability: f32 },
    /// Set every valve: 1/open or 0/closed, one value per valve.
    SetValves {
        #[arg(required = true, value_parser = parse_valve)]
        states: Vec<bool>,
    },
    /// Print the command table fingerprint.
    Fingerprint,
}

fn parse_valve(s: &str) -> Result<bool, String> {
    match s {
        "1" | "open" | "on" => Ok(true),
        "0" | "closed" | "off" => Ok(false),
        other => Err(format!("expected 1/open or 0/closed, got {:?}", other)),
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<RigConfig> {
    let mut config = match &cli.config {
        Some(path) => RigConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => RigConfig::default(),
    };
    if let Some(variant) = cli.variant {
        config.variant = variant;
    }
    Ok(config)
}

impl Cmd {
    /// Whether the subcommand drives the rig, which requires the valve sync.
    fn operates(&self) -> bool {
        !matches!(self, Cmd::Ports | Cmd::Discover | Cmd::Probe | Cmd::Fingerprint)
    }
}

/// Open an identified session on the requested port, or on the first port
/// that answers.
fn open_session(
    cli: &Cli,
    table: Arc<CommandTable>,
    config: RigConfig,
) -> Result<(String, Session<SerialTransport>)> {
    let settle = Duration::from_millis(cli.settle_ms);

    if let Some(port) = &cli.port {
        let transport = SerialTransport::open(port, config.baud_rate, settle)
            .with_context(|| format!("opening {}", port))?;
        let mut session = Session::new(transport, table, config)?;
        session
            .identify()
            .with_context(|| format!("probing rig on {}", port))?;
        return Ok((port.clone(), session));
    }

    let ports = list_ports().context("listing serial ports")?;
    let baud_rate = config.baud_rate;
    let found = discover(
        ports.clone(),
        |port: &String| SerialTransport::open(port, baud_rate, settle),
        table,
        &config,
    );
    match found {
        Some(found) => Ok((found.endpoint, found.session)),
        None => bail!(
            "{} not found on any of the available ports: {:?}",
            config.identity(),
            ports
        ),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    telemetry::describe_metrics();

    let table = Arc::new(schema::water_system_table()?);
    let config = load_config(&cli)?;

    match &cli.cmd {
        Cmd::Ports => {
            for port in list_ports()? {
                println!("{}", port);
            }
            return Ok(());
        }
        Cmd::Fingerprint => {
            println!("{}", table.fingerprint());
            return Ok(());
        }
        _ => {}
    }

    let identity = config.identity().to_string();
    let (port, mut session) = open_session(&cli, table, config)?;
    info!(port = %port, identity = %identity, "Connected");
    if cli.cmd.operates() {
        session.start()?;
    }

    match &cli.cmd {
        Cmd::Discover | Cmd::Probe => println!("{} on {}", identity, port),
        Cmd::Stats { json } => match session.get_stats()? {
            Some(stats) if *json => println!("{}", serde_json::to_string_pretty(&stats)?),
            Some(stats) => {
                println!("Reset time: {}", stats.reset_time);
                println!("Number of rewards dispensed: {}", stats.dispensed_count);
                for event in &stats.trace {
                    println!("  {:>10} {}", event.timestamp, u8::from(event.flag));
                }
            }
            None => {
                warn!("Failed getting stats");
                bail!("no stats received within {} ms", session.config().stats_timeout_ms);
            }
        },
        Cmd::ResetTrace => session.reset_trace()?,
        Cmd::SetMode { mode } => session.set_operation_mode(*mode)?,
        Cmd::SetThreshold { threshold } => session.set_beam_break_threshold(*threshold)?,
        Cmd::SetDuration { duration_ms } => session.set_dispensing_duration(*duration_ms)?,
        Cmd::SetProbability { probability } => session.set_dispensing_probability(*probability)?,
        Cmd::SetValves { states } => session.set_valves_state(states)?,
        Cmd::Ports | Cmd::Fingerprint => {}
    }

    session.close();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valve() {
        assert_eq!(parse_valve("open"), Ok(true));
        assert_eq!(parse_valve("0"), Ok(false));
        assert!(parse_valve("2").is_err());
    }

    #[test]
    fn test_cli_parses_set_valves() {
        let cli = Cli::try_parse_from(["valvelink", "--port", "/dev/ttyACM0", "set-valves", "1", "0", "open"])
            .unwrap();
        match cli.cmd {
            Cmd::SetValves { states } => assert_eq!(states, vec![true, false, true]),
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.port.as_deref(), Some("/dev/ttyACM0"));
    }

    #[test]
    fn test_cli_parses_mode_and_variant() {
        let cli = Cli::try_parse_from(["valvelink", "set-mode", "alternating", "--variant", "three_arm"]).unwrap();
        assert_eq!(cli.variant, Some(DeviceVariant::ThreeArm));
        match cli.cmd {
            Cmd::SetMode { mode } => assert_eq!(mode, OperationMode::AlternatingRewardDispensing),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_read_only_commands_do_not_operate() {
        let operates = |args: &[&str]| {
            let mut argv = vec!["valvelink"];
            argv.extend_from_slice(args);
            Cli::try_parse_from(argv).unwrap().cmd.operates()
        };
        assert!(!operates(&["probe"]));
        assert!(!operates(&["discover"]));
        assert!(operates(&["stats", "--json"]));
        assert!(operates(&["set-valves", "0", "0", "1"]));
        assert!(operates(&["reset-trace"]));
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
