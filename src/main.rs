//! c3qo control CLI
//!
//! Entry point for the `c3qo-ctl` command-line tool.

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use c3qo_supervisor::{
    query_stats, ControlChannel, LaunchSpec, LifecycleCommand, LifecycleVerb, LogLevel,
    ProcessSupervisor, SupervisorConfig, Transport,
};

/// Exit code for configuration and usage errors
const EXIT_CONFIG: i32 = 1;
/// Exit code for supervisor failures
const EXIT_SUPERVISOR: i32 = 2;
/// Exit code for control channel failures
const EXIT_CHANNEL: i32 = 3;
/// Exit code when the worker did not answer in time
const EXIT_TIMEOUT: i32 = 4;

#[derive(Parser)]
#[command(name = "c3qo-ctl")]
#[command(about = "Supervise and control the c3qo worker", version)]
struct Cli {
    /// Path to supervisor config file (TOML)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Output in JSON format where supported
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct LaunchArgs {
    /// Worker log level (LOG_NONE..LOG_DEBUG or 0..8)
    #[arg(long, short = 'l')]
    log: Option<LogLevel>,

    /// Worker configuration file
    #[arg(long, short = 'f')]
    conf_file: Option<PathBuf>,

    /// Ask the worker to print its help and exit
    #[arg(long)]
    worker_help: bool,

    /// Extra arguments passed first to the worker (whitespace separated)
    #[arg(long, allow_hyphen_values = true)]
    arg: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the launch command without running it
    Command {
        #[command(flatten)]
        launch: LaunchArgs,
    },

    /// Start a worker instance in the background
    Start {
        #[command(flatten)]
        launch: LaunchArgs,

        /// Wait until the worker shows up in the process table
        #[arg(long)]
        wait: bool,
    },

    /// Report whether a worker is running
    Status {
        /// Poll until the worker is running
        #[arg(long, conflicts_with = "wait_dead")]
        wait_alive: bool,

        /// Poll until no worker is running
        #[arg(long)]
        wait_dead: bool,
    },

    /// Terminate every worker process
    Stop,

    /// Send a lifecycle command to a block
    Send {
        /// Verb: add, init, start or stop
        verb: LifecycleVerb,

        /// Block identifier
        #[arg(long, short = 'i')]
        id: i32,

        /// Block type for add
        #[arg(long, short = 'a')]
        arg: Option<String>,

        /// Control endpoint (overrides config)
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Send a raw configuration line
    ConfLine {
        /// Configuration line in the worker's text format
        line: String,

        /// Control endpoint (overrides config)
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Query worker statistics
    Stats {
        /// Reply timeout in milliseconds (overrides config)
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Control endpoint (overrides config)
        #[arg(long)]
        endpoint: Option<String>,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let config = match SupervisorConfig::load_or_default(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            process::exit(EXIT_CONFIG);
        }
    };

    match cli.command {
        Commands::Command { launch } => run_command(&config, launch),
        Commands::Start { launch, wait } => run_start(&config, launch, wait),
        Commands::Status {
            wait_alive,
            wait_dead,
        } => run_status(&config, wait_alive, wait_dead, cli.json),
        Commands::Stop => run_stop(&config, cli.json),
        Commands::Send {
            verb,
            id,
            arg,
            endpoint,
        } => {
            let mut command = LifecycleCommand::new(verb, id);
            command.arg = arg;
            run_send(&config, endpoint, |channel| channel.send_command(&command));
        }
        Commands::ConfLine { line, endpoint } => {
            run_send(&config, endpoint, |channel| channel.send_config_line(&line));
        }
        Commands::Stats {
            timeout_ms,
            endpoint,
        } => run_stats(&config, timeout_ms, endpoint, cli.json),
    }
}

/// Log to stderr, filtered by RUST_LOG (default: info)
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

const INSTANCE_KEY: &str = "cli";

fn supervisor(config: &SupervisorConfig) -> ProcessSupervisor {
    match ProcessSupervisor::from_config(config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(EXIT_CONFIG);
        }
    }
}

fn launch_spec(config: &SupervisorConfig, args: LaunchArgs) -> LaunchSpec {
    LaunchSpec {
        key: INSTANCE_KEY.to_string(),
        executable_path: config.executable_path.clone(),
        log_level: args.log,
        config_file: args.conf_file,
        show_help: args.worker_help,
        extra_args: args.arg,
    }
}

fn run_command(config: &SupervisorConfig, args: LaunchArgs) {
    let mut sup = supervisor(config);
    let command = sup.register(&launch_spec(config, args));
    println!("{}", command);
}

fn run_start(config: &SupervisorConfig, args: LaunchArgs, wait: bool) {
    let mut sup = supervisor(config);
    sup.register(&launch_spec(config, args));

    if let Err(e) = sup.start(INSTANCE_KEY) {
        eprintln!("Error: {}", e);
        process::exit(EXIT_SUPERVISOR);
    }

    if wait
        && !sup.wait_for_liveness(true, config.liveness.attempts, config.liveness.interval())
    {
        eprintln!("Worker did not appear in the process table");
        process::exit(EXIT_SUPERVISOR);
    }
}

fn run_status(config: &SupervisorConfig, wait_alive: bool, wait_dead: bool, json: bool) {
    let sup = supervisor(config);
    let attempts = config.liveness.attempts;
    let interval = config.liveness.interval();

    let (alive, satisfied) = if wait_alive {
        let ok = sup.wait_for_liveness(true, attempts, interval);
        (ok, ok)
    } else if wait_dead {
        let ok = sup.wait_for_liveness(false, attempts, interval);
        (!ok, ok)
    } else {
        (sup.is_alive(), true)
    };

    if json {
        println!(
            "{}",
            serde_json::json!({
                "executable_path": config.executable_path,
                "alive": alive,
            })
        );
    } else if alive {
        println!("running: {}", config.executable_path.display());
    } else {
        println!("not running: {}", config.executable_path.display());
    }

    if !satisfied {
        process::exit(EXIT_SUPERVISOR);
    }
}

fn run_stop(config: &SupervisorConfig, json: bool) {
    let mut sup = supervisor(config);
    match sup.stop_all() {
        Ok(count) if json => println!("{}", serde_json::json!({ "signalled": count })),
        Ok(count) => println!("Signalled {} process(es)", count),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(EXIT_SUPERVISOR);
        }
    }
}

fn open_channel(config: &SupervisorConfig, endpoint: Option<String>) -> ControlChannel {
    let endpoint = endpoint.unwrap_or_else(|| config.control.endpoint.clone());
    match ControlChannel::open(&endpoint).and_then(|mut channel| {
        channel.set_linger(config.control.linger())?;
        Ok(channel)
    }) {
        Ok(channel) => channel,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(EXIT_CHANNEL);
        }
    }
}

fn run_send<F>(config: &SupervisorConfig, endpoint: Option<String>, send: F)
where
    F: FnOnce(&mut ControlChannel) -> Result<(), c3qo_supervisor::ChannelError>,
{
    let mut channel = open_channel(config, endpoint);
    if let Err(e) = send(&mut channel) {
        eprintln!("Error: {}", e);
        process::exit(EXIT_CHANNEL);
    }
    // Dropping the channel waits up to the linger period for delivery
    channel.close();
}

fn run_stats(
    config: &SupervisorConfig,
    timeout_ms: Option<u64>,
    endpoint: Option<String>,
    json: bool,
) {
    let mut channel = open_channel(config, endpoint);
    let timeout = timeout_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.control.stats_timeout());

    match query_stats(&mut channel, timeout) {
        Ok(reply) => {
            if json {
                match serde_json::to_string_pretty(&reply) {
                    Ok(s) => println!("{}", s),
                    Err(e) => {
                        eprintln!("Error serializing reply: {}", e);
                        process::exit(EXIT_CHANNEL);
                    }
                }
            } else {
                println!("topic: {}", reply.topic);
                println!("kind: {:?}", reply.kind);
                match reply.block_id {
                    Some(id) => println!("block_id: {}", id),
                    None => println!("block_id: -"),
                }
            }
        }
        Err(e) if e.is_timeout() => {
            eprintln!("Polling: KO ({})", e);
            process::exit(EXIT_TIMEOUT);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(EXIT_CHANNEL);
        }
    }
}
