//! Lifeform simulator
//!
//! Boots an `AIBrain`, feeds it a scripted mix of conversation, perception
//! and memory stimuli, prints every dispatched action and state change, and
//! shuts down cleanly after the requested duration.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use clap::{Parser, ValueEnum};
use lifeform_core::{
    init_logging, load_env, AIBrain, Action, ActionHandler, ActionKind, BrainConfig,
    EmotionKind, EmotionState, MemoryHint, MemoryPort, Outcome, Reaction, StateObserver,
    Stimulus,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON configuration file (defaults plus environment when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// How long to run before shutting down
    #[arg(short, long, default_value_t = 10)]
    duration_secs: u64,

    /// Scripted stimulus mix
    #[arg(short, long, value_enum, default_value = "chatty")]
    scenario: Scenario,

    /// Seed for the autonomous-thought timer
    #[arg(long)]
    seed: Option<u64>,

    /// Shorten every timer so autonomous behavior shows up within seconds
    #[arg(long)]
    fast: bool,

    /// Print every published state snapshot
    #[arg(long)]
    show_states: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Scenario {
    /// Frequent friendly messages
    Chatty,
    /// Silence apart from things happening nearby
    Lonely,
    /// Bursts of novel perceptions
    Curious,
}

struct PrintActions;

#[async_trait]
impl ActionHandler for PrintActions {
    async fn on_action(&self, action: Action) -> lifeform_core::Result<()> {
        println!(
            "[{}] {:>16} ({:?}) {}",
            action.decided_at.format("%H:%M:%S%.3f"),
            action.kind,
            action.trigger,
            action.rationale.summary
        );
        Ok(())
    }
}

struct PrintStates;

#[async_trait]
impl StateObserver for PrintStates {
    async fn on_state_changed(&self, state: Arc<EmotionState>) {
        let levels: Vec<String> = state
            .levels()
            .iter()
            .map(|(kind, level)| format!("{}={:.3}", kind, level))
            .collect();
        println!("    state: {}", levels.join(" "));
    }
}

/// Memory stand-in whose salience grows with the number of messages seen
struct CountingMemory {
    messages: std::sync::atomic::AtomicU64,
}

#[async_trait]
impl MemoryPort for CountingMemory {
    async fn recent_summary(&self) -> lifeform_core::Result<MemoryHint> {
        let seen = self.messages.load(std::sync::atomic::Ordering::Relaxed);
        Ok(MemoryHint::new(
            format!("{} recent messages", seen),
            (seen as f64 / 20.0).min(1.0),
        ))
    }
}

fn load_config(cli: &Cli) -> Result<BrainConfig> {
    let mut config = match &cli.config {
        Some(path) => BrainConfig::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => BrainConfig::from_env().context("reading environment overrides")?,
    };

    if let Some(seed) = cli.seed {
        config.scheduler.seed = Some(seed);
    }
    if cli.fast {
        config.scheduler.decay_tick_ms = 250;
        config.scheduler.thought_interval_min_ms = 1_000;
        config.scheduler.thought_interval_max_ms = 3_000;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// How the scripted user takes a reply
fn scripted_reaction(scenario: Scenario, action: &Action) -> Option<Outcome> {
    match (scenario, action.kind) {
        (Scenario::Chatty, ActionKind::Speak) => Some(Outcome::new(0.8, Reaction::Positive)),
        (Scenario::Chatty, ActionKind::Idle) => Some(Outcome::new(0.3, Reaction::Negative)),
        (_, ActionKind::Speak) => Some(Outcome::new(0.5, Reaction::Neutral)),
        _ => None,
    }
}

fn next_stimulus(scenario: Scenario, step: u64) -> Option<Stimulus> {
    let now = Utc::now();
    match scenario {
        Scenario::Chatty => Some(match step % 4 {
            0 | 2 => Stimulus::user_message(0.6, now),
            1 => Stimulus::perceived(0.3, now),
            _ => Stimulus::recall(0.5, 0.6, now),
        }),
        Scenario::Lonely => (step % 5 == 0).then(|| Stimulus::perceived(0.2, now)),
        Scenario::Curious => Some(Stimulus::perceived(if step % 3 == 0 { 0.9 } else { 0.4 }, now)),
    }
}

/// Hand one scripted stimulus to the brain
///
/// Failures are logged and reported as `false` so the run carries on to a
/// clean shutdown.
async fn deliver(
    brain: &AIBrain,
    memory: &CountingMemory,
    scenario: Scenario,
    step: u64,
    stimulus: Stimulus,
) -> bool {
    if !stimulus.is_conversation_relevant() {
        return match brain.submit_stimulus(stimulus) {
            Ok(_) => true,
            Err(e) => {
                warn!(step, error = %e, "Stimulus not submitted");
                false
            }
        };
    }

    memory
        .messages
        .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    match brain.handle_external_stimulus(stimulus).await {
        Ok(action) => {
            if let Some(outcome) = scripted_reaction(scenario, &action) {
                if let Err(e) = brain.record_outcome(action.kind, outcome, Utc::now()) {
                    warn!(error = %e, "Outcome not recorded");
                }
            }
            true
        }
        Err(e) => {
            warn!(step, error = %e, "Message not handled");
            false
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    load_env()?;

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let memory = Arc::new(CountingMemory {
        messages: std::sync::atomic::AtomicU64::new(0),
    });
    let brain = AIBrain::new(config)?.with_memory(memory.clone());
    brain.on_action(Arc::new(PrintActions));
    if cli.show_states {
        brain.on_state_changed(Arc::new(PrintStates))?;
    }

    brain.run().await?;
    info!(scenario = ?cli.scenario, duration_secs = cli.duration_secs, "Simulation started");

    let deadline = tokio::time::Instant::now() + Duration::from_secs(cli.duration_secs);
    let mut step = 0u64;
    let mut interval = tokio::time::interval(Duration::from_millis(500));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            _ = tokio::time::sleep_until(deadline) => break,
            _ = interval.tick() => {
                let Some(stimulus) = next_stimulus(cli.scenario, step) else {
                    step += 1;
                    continue;
                };
                step += 1;

                deliver(&brain, &memory, cli.scenario, step, stimulus).await;
            }
        }
    }

    brain.shutdown().await;

    let state = brain.emotion_snapshot();
    println!();
    println!("Feeling:     {}", state.describe());
    println!("Personality: {}", brain.personality_snapshot().describe());
    println!(
        "Learned:     {}",
        serde_json::to_string(brain.action_preferences().biases())?
    );
    let joy = brain.emotion_trend(&EmotionKind::Joy, chrono::Duration::minutes(10));
    if let (Some(first), Some(last)) = (joy.first(), joy.last()) {
        println!("Joy trend:   {:.3} -> {:.3} over {} snapshots", first, last, joy.len());
    }
    println!("Stats:       {}", serde_json::to_string_pretty(&brain.stats())?);
    Ok(())
}
