//! Mokepon Arena headless client
//!
//! A bot that joins the arena, picks a random mokepon, wanders the map and
//! fights whoever it bumps into, choosing its attacks in random order.

use std::time::Duration;

use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use mokepon_arena::client::{Heading, Input, MapBounds, Notice, SyncLoop};
use mokepon_arena::config::ClientConfig;
use mokepon_arena::game::{LoadoutName, MOVES_PER_BATTLE};
use mokepon_arena::util::logging::init_tracing;

/// How often the bot picks a new direction
const WANDER_INTERVAL: Duration = Duration::from_secs(1);
/// Pause on the result screen; ending too early wipes our attacks before a
/// slower opponent has read them
const RESULT_PAUSE: Duration = Duration::from_secs(2);
/// Back-off before picking again after the server refused our attacks
const REPICK_PAUSE: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = ClientConfig::from_env()?;
    init_tracing(&config.log_level);

    let mut rng = match config.bot_seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };

    let (sync, mut notices) = SyncLoop::connect(&config).await?;
    let player_id = sync.player_id().clone();

    let (inputs, input_rx) = mpsc::channel(32);
    let runner = tokio::spawn(sync.run(input_rx));

    let bounds = MapBounds::new(config.map_width, config.map_height);
    let name = *LoadoutName::ALL
        .choose(&mut rng)
        .unwrap_or(&LoadoutName::Hipodoge);
    let (x, y) = bounds.random_spawn(&mut rng);
    info!(player_id = %player_id, mokepon = %name, x, y, "Choosing mokepon");
    inputs.send(Input::ChooseLoadout { name, x, y }).await?;

    let mut wander = tokio::time::interval(WANDER_INTERVAL);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, leaving");
                break;
            }
            _ = wander.tick() => {
                let heading = *Heading::MOVING.choose(&mut rng).unwrap_or(&Heading::Stationary);
                inputs.send(Input::Steer(heading)).await?;
            }
            notice = notices.recv() => match notice {
                None => break,
                Some(Notice::BattleStarted { opponent, opponent_loadout }) => {
                    info!(opponent_id = %opponent, mokepon = ?opponent_loadout, "Battle!");
                    pick_attacks(&inputs, &mut rng).await?;
                }
                Some(Notice::AttacksCleared) => {
                    debug!("Attacks refused, picking again");
                    tokio::time::sleep(REPICK_PAUSE).await;
                    pick_attacks(&inputs, &mut rng).await?;
                }
                Some(Notice::Verdict { opponent, result }) => {
                    info!(
                        opponent_id = %opponent,
                        wins = result.wins_a,
                        losses = result.wins_b,
                        verdict = ?result.verdict,
                        "Battle over"
                    );

                    let inputs = inputs.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(RESULT_PAUSE).await;
                        let _ = inputs.send(Input::EndBattle).await;
                    });
                }
                Some(Notice::Alert(message)) => warn!("{message}"),
                Some(Notice::Roaming) => debug!("Back on the map"),
            }
        }
    }

    let _ = inputs.send(Input::Quit).await;
    runner.await??;
    Ok(())
}

/// Use every loadout slot once, in random order
async fn pick_attacks(inputs: &mpsc::Sender<Input>, rng: &mut ChaCha8Rng) -> anyhow::Result<()> {
    let mut slots: Vec<usize> = (0..MOVES_PER_BATTLE).collect();
    slots.shuffle(rng);
    for slot in slots {
        inputs.send(Input::ChooseAttack(slot)).await?;
    }
    Ok(())
}
