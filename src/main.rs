//! FireGuard - simulated network traffic for firewall lessons
//!
//! # Usage
//!
//! ```bash
//! # Run the interactive terminal monitor
//! fireguard
//!
//! # CLI commands
//! fireguard simulate --duration 10 --level 8     # Stream live events for 10s
//! fireguard generate --count 20 --seed 42        # Offline batch, reproducible
//! fireguard generate --count 5 --format json     # JSON lines
//! fireguard rules                                # Print the demo rule table
//! fireguard contact --first-name Ada ...         # Queue a contact message
//! fireguard config show                          # Print the active config
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use fireguard::config::{self, AppConfig};
use fireguard::contact::{self, ContactForm, OutboxRelay};
use fireguard::core::generator::TrafficGenerator;
use fireguard::core::rules::RuleSet;
use fireguard::core::traffic::{
    ActivityLevel, Browser, DeviceProfile, DeviceType, OperatingSystem, TrafficEvent,
};
use fireguard::core::traffic_log::format_bytes;
use fireguard::{Simulator, monitor, utils, validators};
use std::process::ExitCode;
use std::time::Duration;

shadow_rs::shadow!(build);

#[derive(Parser)]
#[command(name = "fireguard")]
#[command(about = "Simulated network traffic for firewall lessons", long_about = None)]
#[command(version, long_version = build::CLAP_LONG_VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the simulator headless and stream events as they are generated
    Simulate {
        /// How long to run, in seconds
        #[arg(short, long, default_value_t = 10)]
        duration: u64,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        #[command(flatten)]
        profile: ProfileArgs,
    },
    /// Generate a fixed number of events without timers
    Generate {
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,
        /// RNG seed for reproducible output
        #[arg(short, long)]
        seed: Option<u64>,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        #[command(flatten)]
        profile: ProfileArgs,
    },
    /// Print the demonstration firewall rules
    Rules,
    /// Validate and send a contact message through the local outbox
    Contact {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        message: String,
    },
    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Overrides applied on top of the saved profile
#[derive(Args)]
struct ProfileArgs {
    #[arg(long)]
    device: Option<DeviceType>,
    #[arg(long)]
    os: Option<OperatingSystem>,
    #[arg(long)]
    browser: Option<Browser>,
    /// Source address of the simulated device
    #[arg(long)]
    ip: Option<String>,
    /// Activity level (1-10)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=10))]
    level: Option<u8>,
}

impl ProfileArgs {
    fn apply(self, mut profile: DeviceProfile) -> DeviceProfile {
        if let Some(device) = self.device {
            profile.device_type = device;
        }
        if let Some(os) = self.os {
            profile.operating_system = os;
        }
        if let Some(browser) = self.browser {
            profile.browser = browser;
        }
        if let Some(ip) = self.ip {
            profile.source_address = ip;
        }
        if let Some(level) = self.level {
            profile.activity_level = ActivityLevel::saturating(level);
        }
        profile
    }
}

fn main() -> ExitCode {
    let _ = utils::ensure_dirs();
    let cli = Cli::parse();
    let interactive = cli.command.is_none();
    init_logging(interactive);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to create Tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Some(command) => runtime.block_on(handle_cli(command)),
        None => runtime.block_on(run_monitor()),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// The monitor owns the terminal, so it logs to a file in the state directory.
fn init_logging(interactive: bool) {
    if interactive
        && let Some(mut log_path) = utils::get_state_dir()
    {
        log_path.push("fireguard.log");
        if let Ok(file) = std::fs::File::create(log_path) {
            tracing_subscriber::fmt()
                .with_writer(file)
                .with_ansi(false)
                .init();
            return;
        }
    }
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();
}

async fn run_monitor() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = config::load_config().await;
    let simulator = Simulator::from_config(&config)?;
    monitor::run(simulator).await?;
    Ok(ExitCode::SUCCESS)
}

async fn handle_cli(command: Commands) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match command {
        Commands::Simulate {
            duration,
            format,
            profile,
        } => {
            let mut config = config::load_config().await;
            config.profile = profile.apply(config.profile);
            simulate(&config, Duration::from_secs(duration), format).await?;
        }
        Commands::Generate {
            count,
            seed,
            format,
            profile,
        } => {
            let config = config::load_config().await;
            let profile = profile.apply(config.profile);
            let mut generator = match seed.or(config.seed) {
                Some(seed) => TrafficGenerator::seeded(seed),
                None => TrafficGenerator::from_entropy(),
            }
            .with_weights(config.weights);

            for _ in 0..count {
                print_event(&generator.generate_event(&profile), format)?;
            }
        }
        Commands::Rules => {
            let ruleset = RuleSet::with_defaults();
            println!(
                "{:<18} {:<12} {:<12} {:<14} {:<9} {:<7} STATUS",
                "NAME", "SOURCE", "DESTINATION", "PORT", "PROTOCOL", "ACTION"
            );
            for rule in &ruleset.rules {
                let port = match validators::well_known_service(&rule.port) {
                    Some(service) => format!("{} ({service})", rule.port),
                    None => rule.port.clone(),
                };
                println!(
                    "{:<18} {:<12} {:<12} {:<14} {:<9} {:<7} {}",
                    utils::truncate_string(&rule.name, 18),
                    rule.source,
                    rule.destination,
                    port,
                    rule.protocol.as_ref(),
                    rule.action.display_name(),
                    if rule.enabled { "enabled" } else { "disabled" }
                );
            }
            println!(
                "\n{} rules, {} enabled",
                ruleset.len(),
                ruleset.enabled_count()
            );
        }
        Commands::Contact {
            first_name,
            last_name,
            email,
            subject,
            message,
        } => {
            let form = ContactForm {
                first_name,
                last_name,
                email,
                subject,
                message,
            };
            let relay = OutboxRelay::from_env()?;
            let result = contact::submit(&form, &relay).await;

            println!("{}", result.message);
            for error in &result.errors {
                println!("  {}: {}", error.path, error.message);
            }
            if !result.success {
                return Ok(ExitCode::FAILURE);
            }
            println!("Queued in {}", relay.path().display());
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let config = config::load_config().await;
                if let Some(path) = config::config_path() {
                    eprintln!("# {}", path.display());
                }
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
            ConfigAction::Init { force } => {
                let path = config::config_path().ok_or("no data directory available")?;
                if path.exists() && !force {
                    return Err(format!(
                        "{} already exists (use --force to overwrite)",
                        path.display()
                    )
                    .into());
                }
                config::save_config(&AppConfig::default()).await?;
                println!("Wrote {}", path.display());
            }
        },
    }
    Ok(ExitCode::SUCCESS)
}

/// Runs a live simulation and prints each event once, oldest first.
async fn simulate(
    config: &AppConfig,
    duration: Duration,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let simulator = Simulator::from_config(config)?;
    let mut updates = simulator.subscribe();
    simulator.start()?;

    let deadline = tokio::time::sleep(duration);
    tokio::pin!(deadline);
    let mut last_printed = 0;

    loop {
        tokio::select! {
            () = &mut deadline => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                let fresh: Vec<&TrafficEvent> = snapshot
                    .events
                    .iter()
                    .rev()
                    .filter(|e| e.id.0 > last_printed)
                    .collect();
                for event in fresh {
                    print_event(event, format)?;
                    last_printed = event.id.0;
                }
            }
        }
    }

    simulator.pause();
    let summary = simulator.snapshot().summary;
    eprintln!(
        "{} events ({} allowed, {} blocked, {} threats), {}",
        summary.total,
        summary.allowed,
        summary.blocked,
        summary.threats,
        format_bytes(summary.bytes)
    );
    Ok(())
}

fn print_event(event: &TrafficEvent, format: OutputFormat) -> Result<(), serde_json::Error> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(event)?),
        OutputFormat::Text => println!(
            "{} {:<7} {:<15} -> {:<15} {:>5} {:<5} {:<7} {:>9}  {}",
            event.timestamp.format("%H:%M:%S"),
            event.id.to_string(),
            event.source,
            event.destination,
            event.port,
            event.protocol.as_ref(),
            event.disposition.as_ref(),
            format_bytes(event.bytes),
            event
                .threat
                .as_deref()
                .or(event.activity.as_deref())
                .unwrap_or("-")
        ),
    }
    Ok(())
}
