use std::env;
use std::fs;
use std::process::ExitCode;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use arena_core::protocol::encode_update;
use arena_core::{SimConfig, Simulation};

const DEFAULT_TICKS: u64 = 1800;
const DEFAULT_TICK_MS: f32 = 16.667;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "unparseable value, using default");
            default
        }),
        Err(_) => default,
    }
}

fn load_config() -> Result<SimConfig, String> {
    let Ok(path) = env::var("ARENA_CONFIG") else {
        return Ok(SimConfig::default());
    };
    let text = fs::read_to_string(&path).map_err(|e| format!("cannot read {path}: {e}"))?;
    SimConfig::from_json(&text).map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "config rejected");
            return ExitCode::FAILURE;
        }
    };
    let character = env::var("ARENA_CHARACTER")
        .ok()
        .and_then(|path| match fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(%path, error = %e, "character blob unreadable");
                None
            }
        });

    let ticks: u64 = env_or("ARENA_TICKS", DEFAULT_TICKS);
    let tick_ms: f32 = env_or("ARENA_TICK_MS", DEFAULT_TICK_MS);

    let mut sim = Simulation::new(config, character.as_deref());
    info!(ticks, tick_ms, "headless run starting");

    let mut encoded_bytes = 0usize;
    for _ in 0..ticks {
        let update = sim.tick(tick_ms, &[]);
        match encode_update(&update) {
            Ok(bytes) => encoded_bytes += bytes.len(),
            Err(e) => {
                error!(error = %e, "snapshot encoding failed");
                return ExitCode::FAILURE;
            }
        }
        if update.tick % 600 == 0 {
            info!(
                tick = update.tick,
                entities = update.stats.live_entities,
                effects = update.stats.active_effects,
                tick_rate = update.stats.tick_rate,
                "progress"
            );
        }
        if let Some(outcome) = update.outcome {
            info!(?outcome, tick = update.tick, "match over");
            break;
        }
    }

    info!(frames = sim.frame(), encoded_bytes, "headless run finished");
    if let Ok(blob) = sim.character_blob() {
        info!(bytes = blob.len(), "character state ready for persistence");
    }
    ExitCode::SUCCESS
}
