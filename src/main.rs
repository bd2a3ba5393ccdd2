// Poetry Bot — process entry point.
// `run` hosts the tick scheduler until Ctrl-C; the other subcommands are
// one-shot calls into engine::commands against the same database.

use clap::{Parser, Subcommand};
use log::info;
use poetry_bot::atoms::error::EngineResult;
use poetry_bot::engine::commands;
use poetry_bot::engine::config::Config;
use poetry_bot::engine::scheduler::Scheduler;
use poetry_bot::engine::state::EngineState;
use poetry_bot::engine::store::AgentStore;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "poetry-bot", version, about = "Autonomous poetry agent")]
struct Cli {
    /// Configuration file (TOML). Missing file means all defaults.
    #[arg(long, env = "POETRY_BOT_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the agent loop until interrupted (default).
    Run,
    /// Write one poem now.
    Trigger {
        /// Print the response as it is generated.
        #[arg(long)]
        stream: bool,
    },
    /// Scheduler state, last poem, particle count.
    Status,
    /// List poems, newest first.
    Poems {
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// Rate a poem: up, down, favorite or none. Repeating a rating clears it.
    Rate { id: i64, rating: String },
    /// Leave a note on a poem.
    Feedback { id: i64, note: String },
    /// Give the agent a text to read.
    Reference {
        #[arg(long)]
        title: Option<String>,
        /// poem, article or other
        #[arg(long = "type")]
        source_type: Option<String>,
        body: String,
    },
    /// Active particles and the current readiness breakdown.
    Particles,
    /// Current voice principles and their history.
    Voice,
    /// Recent agent log entries.
    Events {
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
}

fn print_json<T: Serialize>(value: &T) -> EngineResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Let spawned background work (self-critique, particle extraction) finish
/// before a one-shot command exits.
async fn drain_background_tasks() {
    let handle = tokio::runtime::Handle::current();
    while handle.metrics().num_alive_tasks() > 0 {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

async fn run_agent(state: EngineState) -> EngineResult<()> {
    let scheduler = Scheduler::new(state);
    scheduler.start();
    tokio::signal::ctrl_c().await?;
    info!("[main] Interrupt received, shutting down");
    scheduler.stop();
    Ok(())
}

#[tokio::main]
async fn main() -> EngineResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    let store = Arc::new(AgentStore::open(Path::new(&config.database.path))?);
    let state = EngineState::with_default_collaborators(store, config);

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run_agent(state).await?,
        Command::Trigger { stream } => {
            let poem = if stream {
                let mut out = std::io::stdout();
                let poem = commands::agent_trigger_streaming(&state, |chunk| {
                    let _ = out.write_all(chunk.as_bytes());
                    let _ = out.flush();
                })
                .await?;
                println!();
                poem
            } else {
                commands::agent_trigger(&state).await?
            };
            print_json(&poem)?;
            drain_background_tasks().await;
        }
        Command::Status => {
            let scheduler = Scheduler::new(state);
            print_json(&commands::agent_status(&scheduler)?)?;
        }
        Command::Poems { limit, offset } => {
            print_json(&commands::poems_list(&state, Some(limit), Some(offset))?)?
        }
        Command::Rate { id, rating } => print_json(&commands::poem_rate(&state, id, &rating)?)?,
        Command::Feedback { id, note } => {
            print_json(&commands::poem_add_feedback(&state, id, &note)?)?;
            drain_background_tasks().await;
        }
        Command::Reference { title, source_type, body } => {
            let id = commands::reference_add(&state, title.as_deref(), &body, source_type.as_deref())?;
            print_json(&id)?;
            drain_background_tasks().await;
        }
        Command::Particles => print_json(&commands::particles_list(&state)?)?,
        Command::Voice => print_json(&commands::voice_get(&state)?)?,
        Command::Events { limit } => print_json(&commands::recent_events(&state, Some(limit))?)?,
    }
    Ok(())
}
