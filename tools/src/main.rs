//! drive-runner: drive one vehicle to a random destination and stop.
//!
//! Usage:
//!   drive-runner --sync --fixed-step 0.05 --agent Basic --seed 42 --res 800x600
//!   drive-runner --config conf/config.json --event-log run.jsonl
//!
//! Type `q` + Enter, or press Ctrl-C, to cancel a running session.

use anyhow::{Context, Result};
use autopilot_core::{
    config::{ConfigFile, SimulationConfig},
    controller::SimulationController,
    driver::{run_session, CancelToken, SessionOutcome, SessionReport},
    event::write_json_lines,
    headless::{server::HeadlessSimulator, HeadlessPlatform},
};
use clap::Parser;
use std::{
    fs::File,
    io::{self, BufRead, BufWriter, Write},
    path::{Path, PathBuf},
    thread,
};

const BANNER: &str = "Automatic vehicle control from the client side.";

#[derive(Parser, Debug)]
#[command(name = "drive-runner", version, about = BANNER)]
struct Cli {
    /// JSON config file; CLI flags override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// IP of the host server.
    #[arg(long)]
    host: Option<String>,

    /// TCP port to listen to.
    #[arg(short, long)]
    port: Option<u16>,

    /// Connection timeout, seconds.
    #[arg(long)]
    timeout: Option<f64>,

    /// Map to load.
    #[arg(long)]
    map: Option<String>,

    /// Window resolution, <W>x<H>.
    #[arg(long)]
    res: Option<String>,

    /// Random seed for reproducible destinations.
    #[arg(short, long)]
    seed: Option<u64>,

    /// Run the server in synchronous mode. `--sync false` overrides a
    /// config file that turns it on.
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    sync: Option<bool>,

    /// Seconds per tick in synchronous mode.
    #[arg(long)]
    fixed_step: Option<f64>,

    /// Navigation agent: Basic or Behavior.
    #[arg(short, long)]
    agent: Option<String>,

    /// Behavior profile: cautious, normal or aggressive.
    #[arg(short, long)]
    behavior: Option<String>,

    /// Print debug information.
    #[arg(short = 'v', long)]
    debug: bool,

    /// Stop after this many ticks even without arrival.
    #[arg(long)]
    max_ticks: Option<u64>,

    /// Write the session event log here as JSON lines.
    #[arg(long)]
    event_log: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> ConfigFile {
        ConfigFile {
            host:         self.host.clone(),
            port:         self.port,
            timeout_secs: self.timeout,
            map:          self.map.clone(),
            res:          self.res.clone(),
            seed:         self.seed,
            sync:         self.sync,
            fixed_step:   self.fixed_step,
            agent:        self.agent.clone(),
            behavior:     self.behavior.clone(),
            debug:        self.debug.then_some(true),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    println!("{BANNER}");

    let base = match &cli.config {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::default(),
    };
    let config = base
        .merge(cli.overrides())
        .resolve()
        .context("invalid configuration")?;

    init_logging(config.debug);
    log::debug!("{}", serde_json::to_string_pretty(&config)?);
    log::info!("Listening to server {}", config.endpoint);

    let cancel = CancelToken::new();
    spawn_quit_watcher(cancel.clone());
    install_interrupt_handler(cancel.clone())?;

    let simulator = HeadlessSimulator::new();
    let mut platform = HeadlessPlatform::new(simulator, cancel.clone());
    let controller = SimulationController::init(&config, &mut platform)
        .context("session init failed")?;
    let events = controller.events().len();
    log::debug!("Session up, {events} init events recorded");

    let report = run_session(controller, &cancel, cli.max_ticks)?;
    if let Some(path) = &cli.event_log {
        write_event_log(path, &report)?;
    }

    if report.outcome == SessionOutcome::Cancelled {
        println!("\nCancelled by user. Bye!");
    }
    print_summary(&config, &report, platform.simulator());
    Ok(())
}

fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| writeln!(buf, "{}: {}", record.level(), record.args()))
        .init();
}

/// Route SIGINT into the cancel token so the loop stops between ticks and
/// teardown still restores the server.
fn install_interrupt_handler(cancel: CancelToken) -> Result<()> {
    ctrlc::set_handler(move || {
        log::info!("Interrupt received, stopping after this tick");
        cancel.cancel();
    })
    .context("cannot install Ctrl-C handler")
}

/// Cancel the session when the user types `q` (or `quit`) on stdin.
fn spawn_quit_watcher(cancel: CancelToken) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if matches!(line.trim(), "q" | "quit") {
                cancel.cancel();
                break;
            }
        }
    });
}

fn write_event_log(path: &Path, report: &SessionReport) -> Result<()> {
    let file = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    write_json_lines(&mut out, &report.events)?;
    out.flush()?;
    log::info!("Event log written to {} ({} events)", path.display(), report.events.len());
    Ok(())
}

fn print_summary(config: &SimulationConfig, report: &SessionReport, sim: &HeadlessSimulator) {
    println!();
    println!("=== RUN SUMMARY ===");
    println!("  map:            {}", config.map);
    println!("  agent:          {:?}", config.agent.kind());
    println!("  outcome:        {:?}", report.outcome);
    println!("  ticks run:      {}", report.ticks);
    println!("  server frame:   {}", sim.frame());
    match report.sim_seconds {
        Some(secs) => println!("  sim time:       {secs:.2}s"),
        None => println!("  sim time:       {:.2}s (server clock)", sim.sim_seconds()),
    }
    println!("  wall time:      {:.2}s", report.wall.as_secs_f64());
    if let Some(d) = report.final_distance {
        println!("  final distance: {d:.1}m");
    }
    if !report.teardown.is_clean() {
        println!("  teardown warnings:");
        for w in &report.teardown.warnings {
            println!("    - {w}");
        }
    }
}
