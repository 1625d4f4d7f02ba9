//! Headless runner: one seeded layout, every protocol, summary in the log.
//!
//! Optional positional arguments: `[seed] [max_steps]`. Set `RUST_LOG=info`
//! (or `debug`) to see checkpoint output.

use rand::SeedableRng;
use rand_pcg::Pcg32;

use swarm_consensus::sim::{Layout, ProtocolKind, Simulation};
use swarm_consensus::{Settings, SimError};

const DEFAULT_SEED: u64 = 42;
const DEFAULT_MAX_STEPS: u64 = 3000;

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), SimError> {
    let mut args = std::env::args().skip(1);
    let seed = parse_arg(args.next(), DEFAULT_SEED)?;
    let max_steps = parse_arg(args.next(), DEFAULT_MAX_STEPS)?;

    let settings = Settings::default();
    settings.validate()?;
    let layout = Layout::generate(&settings, &mut Pcg32::seed_from_u64(seed));

    log::info!(
        "Swarm consensus starting: {} agents, {} targets, {} obstacles, seed {}",
        settings.swarm.num_agents,
        settings.env.num_target,
        settings.env.num_hurdle,
        seed
    );

    for kind in ProtocolKind::ALL {
        let mut sim = Simulation::new(kind, &layout, &settings, seed)?;
        let metrics = sim.run(max_steps, None);
        let series = metrics.avg_mismatch_series();
        let mean_mismatch = if series.is_empty() {
            0.0
        } else {
            series.iter().sum::<f32>() / series.len() as f32
        };
        log::info!(
            "{}: {} checkpoints, mean mismatch {:.4} rad, final accuracy {:.2}, at target {}",
            kind,
            series.len(),
            mean_mismatch,
            metrics.latest_accuracy().unwrap_or(0.0),
            metrics.agents_at_target.last().copied().unwrap_or(0)
        );
    }
    Ok(())
}

fn parse_arg(arg: Option<String>, default: u64) -> Result<u64, SimError> {
    match arg {
        None => Ok(default),
        Some(s) => s
            .parse()
            .map_err(|_| SimError::InvalidConfig("seed and max_steps must be unsigned integers")),
    }
}
