// Headless runner for the rover simulation.
//
// Drives a `RoverSim` for a fixed number of ticks at 60 Hz with no driver
// input, optionally scripting an incoming meteor and a storm, and prints one
// JSON line per sampled tick with the pose, mode and wheel offsets. Useful
// for eyeballing behavior and for diffing runs across code changes. Each line
// also carries the bare terrain height under the rover and the id of the
// giant it is taking cover behind, if any.
//
// Usage:
//   headless [OPTIONS]
//     --ticks <N>            Ticks to simulate (default: 600)
//     --seed <N>             PRNG seed (default: from config)
//     --config <PATH>        JSON config file (default: built-in defaults)
//     --incoming-at <TICK>   Meteor incoming from this tick (impact 5 s later)
//     --storm-from <TICK>    Storm active from this tick onward
//     --every <N>            Print every Nth tick (default: 10)
//
// Logging goes to stderr and is controlled by `RUST_LOG`
// (e.g. `RUST_LOG=rover_sim=debug`).

use rover_sim::command::{EnvironmentalSignal, ManualInput};
use rover_sim::config::RoverConfig;
use rover_sim::sim::RoverSim;
use rover_sim::types::ThreatPhase;
use tracing_subscriber::EnvFilter;

const DT: f32 = 1.0 / 60.0;

/// Ticks between "incoming" and "impact" in a scripted meteor.
const INCOMING_TICKS: u64 = 300;
/// Ticks the impact phase lasts.
const IMPACT_TICKS: u64 = 30;

struct Options {
    ticks: u64,
    seed: Option<u64>,
    config_path: Option<String>,
    incoming_at: Option<u64>,
    storm_from: Option<u64>,
    every: u64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let options = parse_args();

    let mut config = match &options.config_path {
        Some(path) => match RoverConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        },
        None => RoverConfig::default(),
    };
    if let Some(seed) = options.seed {
        config.rng_seed = seed;
    }

    let mut sim = match RoverSim::new(config) {
        Ok(sim) => sim,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    for tick in 0..options.ticks {
        let signal = scripted_signal(&options, tick);
        let result = sim.step(signal, ManualInput::default(), DT);
        for event in &result.events {
            tracing::debug!(tick = event.tick, kind = ?event.kind, "event");
        }

        if tick % options.every == 0 || tick + 1 == options.ticks {
            let pose = sim.pose();
            let wheels: Vec<f32> = sim.wheel_transforms().iter().map(|w| w.offset).collect();
            let ground = sim.terrain().elevation(pose.position.x, pose.position.z);
            let line = serde_json::json!({
                "tick": tick,
                "mode": format!("{:?}", sim.mode()),
                "position": pose.position,
                "orientation": pose.orientation,
                "ground": ground,
                "speed": sim.agent.motion.speed,
                "under_cover": sim.agent.under_cover,
                "cover": sim.cover_obstacle().map(|o| o.id),
                "wheel_offsets": wheels,
            });
            println!("{line}");
        }
    }
}

fn scripted_signal(options: &Options, tick: u64) -> EnvironmentalSignal {
    let threat_phase = match options.incoming_at {
        Some(start) if tick < start => ThreatPhase::Idle,
        Some(start) if tick < start + INCOMING_TICKS => ThreatPhase::Incoming,
        Some(start) if tick < start + INCOMING_TICKS + IMPACT_TICKS => ThreatPhase::Impact,
        _ => ThreatPhase::Idle,
    };
    EnvironmentalSignal {
        storm_active: options.storm_from.is_some_and(|from| tick >= from),
        threat_phase,
    }
}

/// Parse command-line arguments. Plain `std::env::args()` matching.
fn parse_args() -> Options {
    let mut options = Options {
        ticks: 600,
        seed: None,
        config_path: None,
        incoming_at: None,
        storm_from: None,
        every: 10,
    };
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--ticks" => {
                i += 1;
                options.ticks = parse_number(&args, i, "--ticks");
            }
            "--seed" => {
                i += 1;
                options.seed = Some(parse_number(&args, i, "--seed"));
            }
            "--config" => {
                i += 1;
                options.config_path = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--config requires a path");
                    std::process::exit(1);
                }));
            }
            "--incoming-at" => {
                i += 1;
                options.incoming_at = Some(parse_number(&args, i, "--incoming-at"));
            }
            "--storm-from" => {
                i += 1;
                options.storm_from = Some(parse_number(&args, i, "--storm-from"));
            }
            "--every" => {
                i += 1;
                options.every = parse_number(&args, i, "--every").max(1);
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    options
}

fn parse_number(args: &[String], i: usize, flag: &str) -> u64 {
    args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
        eprintln!("{flag} requires a valid number");
        std::process::exit(1);
    })
}

fn print_usage() {
    println!("Usage: headless [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --ticks <N>            Ticks to simulate (default: 600)");
    println!("  --seed <N>             PRNG seed (default: from config)");
    println!("  --config <PATH>        JSON config file (default: built-in defaults)");
    println!("  --incoming-at <TICK>   Meteor incoming from this tick (impact 5 s later)");
    println!("  --storm-from <TICK>    Storm active from this tick onward");
    println!("  --every <N>            Print every Nth tick (default: 10)");
    println!("  --help, -h             Show this help");
}
