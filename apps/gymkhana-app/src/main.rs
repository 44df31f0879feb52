//! Gymkhana driving-simulator evaluation CLI.
//!
//! Provides two modes of operation:
//! - `run`: Connect to a simulator, load a scene, and evaluate one run
//! - `info`: Print workspace crate versions and the built-in defaults

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use gymkhana_client::prelude::*;
use gymkhana_core::config::EvaluatorConfig;
use gymkhana_core::readiness::ReadinessState;
use gymkhana_evaluator::prelude::*;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// Gymkhana driving-simulator evaluation harness.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to a simulator and evaluate one run.
    Run {
        /// Simulator address.
        #[arg(short, long, default_value = "127.0.0.1:9091")]
        address: String,

        /// Scene to load.
        #[arg(short, long, default_value = "generated_road")]
        scene: String,

        /// Optional TOML file overriding the evaluation defaults.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Seconds before the in-process controller declares itself ready.
        #[arg(long, default_value_t = 0.0)]
        controller_delay: f64,

        /// Overall seconds to wait for the run to start (default: max_wait
        /// plus launch delay plus 30).
        #[arg(long)]
        start_deadline: Option<f64>,

        /// Abandon the drive after this many seconds if the lap limit is
        /// not reached first.
        #[arg(long, default_value_t = 300.0)]
        run_seconds: f64,
    },

    /// Print crate information.
    Info,
}

// ---------------------------------------------------------------------------
// ConsoleSink
// ---------------------------------------------------------------------------

/// Event sink that narrates run progress on stdout.
struct ConsoleSink {
    readiness: Arc<ReadinessState>,
}

impl ConsoleSink {
    fn new() -> Self {
        Self {
            readiness: Arc::new(ReadinessState::new()),
        }
    }
}

impl EventHandler for ConsoleSink {
    fn readiness(&self) -> &Arc<ReadinessState> {
        &self.readiness
    }

    fn on_scene_loaded(&self) {
        println!("scene loaded");
    }

    fn on_car_loaded(&self) {
        println!("car loaded; waiting for the controller");
    }

    fn each_turn(&self, turn: u32) {
        println!("lap {turn} complete");
    }

    fn on_car_leaving_road(&self, cte: f64) {
        println!("car left the road (cte {cte:.2})");
    }
}

// ---------------------------------------------------------------------------
// Mode implementations
// ---------------------------------------------------------------------------

/// Outbound control values for the demonstration drive.
const DEMO_THROTTLE: f64 = 0.25;
/// Control telegram cadence while driving.
const CONTROL_PERIOD: Duration = Duration::from_millis(50);

fn run_evaluation(
    address: &str,
    scene: &str,
    config_path: Option<&PathBuf>,
    controller_delay: f64,
    start_deadline: Option<f64>,
    run_seconds: f64,
) -> ExitCode {
    let config = match config_path {
        Some(path) => EvaluatorConfig::from_file(path).expect("failed to load config file"),
        None => EvaluatorConfig::default(),
    };

    let sink = Arc::new(ConsoleSink::new());
    let evaluator = Arc::new(Evaluator::new(
        Arc::<ConsoleSink>::clone(&sink) as Arc<dyn EventHandler>,
        &config,
    ));

    let transport =
        Arc::new(TcpTransport::connect(address).expect("failed to connect to simulator"));
    let reader = transport
        .reader_stream()
        .expect("failed to open telegram stream");
    let client = Arc::new(SimClient::new(
        Arc::<TcpTransport>::clone(&transport) as Arc<dyn Transport>,
        Arc::<Evaluator>::clone(&evaluator) as Arc<dyn EventHandler>,
    ));
    info!(address, scene, "connected to simulator");

    // Inbound telegrams are dispatched off the main thread for the whole
    // lifetime of the run.
    let pump_client = Arc::clone(&client);
    thread::spawn(move || {
        if let Err(err) = pump_client.pump(std::io::BufReader::new(reader)) {
            eprintln!("telegram stream ended with an error: {err}");
        }
    });

    // Stand-in for an external controller: flip the readiness flag after
    // the requested delay.
    let controller_state = Arc::clone(evaluator.readiness());
    let delay = Duration::from_secs_f64(controller_delay.max(0.0));
    thread::spawn(move || {
        thread::sleep(delay);
        controller_state.set_controller_ready();
    });

    client
        .send_get_protocol_version()
        .expect("failed to query protocol version");
    client
        .send_get_scene_names()
        .expect("failed to query scene names");
    client.send_load_scene(scene).expect("failed to load scene");

    let deadline = Duration::from_secs_f64(
        start_deadline
            .unwrap_or(config.max_wait + config.launch_delay + 30.0)
            .max(0.0),
    );
    if let Err(err) = evaluator.wait_for_start_timeout(deadline) {
        eprintln!("evaluation did not start: {err}");
        return ExitCode::FAILURE;
    }
    println!("evaluation run started");

    report_send("car_config", client.send_car_config("donkey", 32, 96, 224, "gymkhana", 20));
    report_send("cam_config", client.send_cam_config(CamConfig::new()));

    // Drive until the lap limit or the time budget, whichever first.
    let begun = Instant::now();
    let budget = Duration::from_secs_f64(run_seconds.max(0.0));
    while !evaluator.turn_limit_reached() && begun.elapsed() < budget {
        if let Err(err) = client.send_control(0.0, DEMO_THROTTLE, 0.0) {
            eprintln!("lost the simulator mid-run: {err}");
            return ExitCode::FAILURE;
        }
        thread::sleep(CONTROL_PERIOD);
    }

    // Best-effort teardown; the simulator may already be gone.
    report_send("brake", client.send_control(0.0, 0.0, 1.0));
    report_send("reset_car", client.send_reset_car());
    report_send("exit_scene", client.send_exit_scene());
    evaluator.on_exit_scene();
    report_send("quit_app", client.send_quit_app());
    evaluator.on_quit_app();

    println!(
        "run finished: laps={}, limit_reached={}, elapsed={:.1}s",
        evaluator.laps(),
        evaluator.turn_limit_reached(),
        begun.elapsed().as_secs_f64()
    );
    ExitCode::SUCCESS
}

fn report_send(label: &str, result: Result<(), SendError>) {
    if let Err(err) = result {
        eprintln!("failed to send {label}: {err}");
    }
}

fn run_info() {
    let defaults = EvaluatorConfig::default();
    println!("gymkhana v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("crates:");
    println!("  gymkhana-core      {}", env!("CARGO_PKG_VERSION"));
    println!("  gymkhana-client    {}", env!("CARGO_PKG_VERSION"));
    println!("  gymkhana-evaluator {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("defaults:");
    println!("  turn_limit     {}", defaults.turn_limit);
    println!("  max_wait       {}s", defaults.max_wait);
    println!("  check_interval {:.4}s", defaults.check_interval);
    println!("  launch_delay   {}s", defaults.launch_delay);
    println!("  cte_bound      {DEFAULT_CTE_BOUND}");
    println!();
    println!("edition: 2024");
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            address,
            scene,
            config,
            controller_delay,
            start_deadline,
            run_seconds,
        } => run_evaluation(
            &address,
            &scene,
            config.as_ref(),
            controller_delay,
            start_deadline,
            run_seconds,
        ),
        Commands::Info => {
            run_info();
            ExitCode::SUCCESS
        }
    }
}
