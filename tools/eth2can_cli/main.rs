// tools/eth2can_cli/main.rs
//
// eth2can diagnostic CLI: watch traffic from an adapter or send one frame.
//
//   cargo run --features cli --bin eth2can_cli -- --host 192.168.1.10 --port 4001 monitor
//   cargo run --features cli --bin eth2can_cli -- --config eth2can.toml send --id 0x123 --data 0102

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};

use eth2can::{load_config, CanBus, CanMessage, Eth2CanBus, Eth2CanConfig, IoError};

/// Ethernet-to-CAN adapter diagnostics
#[derive(Parser, Debug)]
#[command(name = "eth2can_cli", version, about, long_about = None)]
struct Cli {
    /// TOML configuration file (overrides --host/--port)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Adapter IP address or hostname
    #[arg(long, default_value = "192.168.1.10")]
    host: String,

    /// Adapter TCP port
    #[arg(long, default_value_t = 4001)]
    port: u16,

    /// Connect timeout in seconds
    #[arg(long)]
    connect_timeout: Option<f64>,

    /// Trace every chunk and frame
    #[arg(short, long)]
    verbose: bool,

    /// Mirror logs into a timestamped file in this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print received messages
    Monitor {
        /// Stop after this many messages (0 = run until the adapter disconnects)
        #[arg(long, default_value_t = 0)]
        count: usize,

        /// Readiness poll timeout in milliseconds
        #[arg(long, default_value_t = 500)]
        timeout_ms: u64,
    },

    /// Send a single standard-ID message
    Send {
        /// Arbitration ID (decimal or 0x-prefixed hex)
        #[arg(long)]
        id: String,

        /// Payload as hex, up to 8 bytes (e.g. 0102AABB)
        #[arg(long, default_value = "")]
        data: String,
    },
}

fn parse_id(s: &str) -> Result<u32, IoError> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse::<u32>(),
    };
    parsed.map_err(|e| IoError::invalid_message(format!("invalid id '{}': {}", s, e)))
}

fn build_config(cli: &Cli) -> Result<Eth2CanConfig, IoError> {
    let mut config = match cli.config {
        Some(ref path) => load_config(path)?,
        None => Eth2CanConfig::new(&cli.host, cli.port),
    };
    if let Some(timeout) = cli.connect_timeout {
        config.connect_timeout_sec = timeout;
    }
    if cli.verbose {
        config.verbose = true;
    }
    if cli.log_dir.is_some() {
        config.log_dir = cli.log_dir.clone();
    }
    config.validate()?;
    Ok(config)
}

async fn monitor(bus: &mut Eth2CanBus, count: usize, timeout: Duration) -> Result<(), IoError> {
    let mut seen = 0usize;
    while count == 0 || seen < count {
        if let (Some(msg), _) = bus.receive_next(Some(timeout)).await? {
            println!("{}", msg);
            seen += 1;
        }
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<(), IoError> {
    let config = build_config(&cli)?;
    eth2can::init_logging(&config)?;

    let mut bus = Eth2CanBus::connect(&config).await?;
    eprintln!("{}", bus.channel_info());

    let result = match cli.command {
        Commands::Monitor { count, timeout_ms } => {
            monitor(&mut bus, count, Duration::from_millis(timeout_ms)).await
        }
        Commands::Send { ref id, ref data } => {
            let payload = hex::decode(data)
                .map_err(|e| IoError::invalid_message(format!("invalid data '{}': {}", data, e)));
            match (parse_id(id), payload) {
                (Ok(id), Ok(payload)) => bus.send(&CanMessage::new(id, &payload), None).await,
                (Err(e), _) | (_, Err(e)) => Err(e),
            }
        }
    };

    bus.shutdown();
    eth2can::logging::stop_file_logging();
    result
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("eth2can_cli: {}", e);
            ExitCode::FAILURE
        }
    }
}
