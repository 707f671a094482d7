//! Headless match simulation
//!
//! Boots the instrumented reference client straight into a multiplayer
//! match, turns the combat agent on and prints `_getMpStatus()` as it goes.
//!
//! Usage:
//!   cargo run --bin simulate -- --frames 600 --status-every 60
//!   cargo run --bin simulate -- --seed 7 --patrol --debug-log

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use playtest::constants::FRAME_DT;
use playtest::helpers::Vec2;
use playtest::instrument::{InstrumentOptions, instrument};
use playtest::logging::{self, DebugLogConfig};
use playtest::sim::{OpponentConfig, OpponentScript, SimGame};
use playtest::tuning::AgentTuning;

#[derive(Parser, Debug)]
#[command(name = "simulate", about = "Run the combat agent in a headless match")]
struct Args {
    /// Frames to run
    #[arg(long, default_value_t = 600)]
    frames: u64,
    /// Print status every N frames (0 = only at the end)
    #[arg(long, default_value_t = 60)]
    status_every: u64,
    /// Seed for room codes and the loopback server
    #[arg(long, default_value_t = 1)]
    seed: u64,
    /// Opponent walks back and forth instead of standing still
    #[arg(long)]
    patrol: bool,
    /// Agent tuning file
    #[arg(long)]
    tuning: Option<String>,
    #[arg(long)]
    debug_log: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(&DebugLogConfig::load_with_flag(args.debug_log));

    let tuning = match &args.tuning {
        Some(path) => AgentTuning::load_or_default(path),
        None => AgentTuning::load(),
    };

    let (mut client, game) = SimGame::client(args.seed);
    if args.patrol {
        let opponent = OpponentConfig::default();
        let to = Vec2::new(opponent.spawn.x + 6.0, opponent.spawn.y - 4.0);
        game.configure_match(
            None,
            OpponentConfig {
                script: OpponentScript::Patrol { to },
                ..opponent
            },
        );
    }

    let hooks = instrument(
        &mut client,
        InstrumentOptions {
            tuning,
            ..Default::default()
        },
    )
    .context("Failed to instrument client")?;
    client.start().context("Failed to start client")?;
    game.enter_match(&mut client.context().borrow_mut());
    hooks.start_auto_p1();

    info!("Simulating {} frames ({:.1}s)", args.frames, args.frames as f32 * FRAME_DT);
    for frame in 1..=args.frames {
        client.step();
        if args.status_every > 0 && frame % args.status_every == 0 {
            println!("{}", serde_json::to_string(&hooks.get_mp_status())?);
        }
        if hooks.get_mp_status().winner_id.is_some() {
            info!("Match decided on frame {}", frame);
            break;
        }
    }

    let status = hooks.get_mp_status();
    println!("{}", serde_json::to_string_pretty(&status)?);
    println!(
        "hits: {}, recoveries: {}, sent: {:?}",
        game.network().hits(),
        hooks.errors().recoveries(),
        game.network().sent_kinds()
    );
    Ok(())
}
