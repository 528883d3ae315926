//! Sync loop - drives a `ClientSession` with two cancellable periodic tasks
//!
//! Requests are spawned fire-and-forget; each reply comes back as an event
//! tagged with the epoch it was issued under, so replies may arrive late or
//! out of order without corrupting the session.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::game::{Attack, LoadoutName, PlayerId};
use crate::protocol::MapResponse;

use super::movement::{Heading, MapBounds};
use super::session::{ClientSession, Command, Epoch, Notice};
use super::transport::{ApiClient, ClientError};

/// What the user (or a bot) can do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    ChooseLoadout { name: LoadoutName, x: i32, y: i32 },
    Steer(Heading),
    ChooseAttack(usize),
    EndBattle,
    Quit,
}

/// Everything that wakes the loop besides user input
#[derive(Debug)]
enum Event {
    MovementTick,
    BattlePollTick,
    LoadoutSelected(Epoch, Result<(), ClientError>),
    PositionSynced(Epoch, Result<MapResponse, ClientError>),
    BattleStarted(Epoch, Result<(), ClientError>),
    AttacksSubmitted(Epoch, Result<(), ClientError>),
    OpponentAttacks(Epoch, Result<Vec<Attack>, ClientError>),
    BattleEnded(Epoch, Result<(), ClientError>),
}

/// A spawned interval task; aborted when dropped
struct PeriodicTask {
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    fn spawn(period: Duration, events: mpsc::UnboundedSender<Event>, tick: fn() -> Event) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                if events.send(tick()).is_err() {
                    break;
                }
            }
        });

        Self { handle }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Client session bound to a server
pub struct SyncLoop {
    api: ApiClient,
    session: ClientSession,
    movement_period: Duration,
    poll_period: Duration,
    notices: mpsc::UnboundedSender<Notice>,
}

impl SyncLoop {
    /// Join the arena. Notices for the user arrive on the returned receiver.
    pub async fn connect(
        config: &ClientConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Notice>), ClientError> {
        let api = ApiClient::new(config.server_url.clone())?;
        let player_id = api.join().await?;
        info!(player_id = %player_id, server = %config.server_url, "Joined arena");

        let (notices, notice_rx) = mpsc::unbounded_channel();
        let session = ClientSession::new(
            player_id,
            MapBounds::new(config.map_width, config.map_height),
        );

        Ok((
            Self {
                api,
                session,
                movement_period: config.movement_tick,
                poll_period: config.battle_poll,
                notices,
            },
            notice_rx,
        ))
    }

    pub fn player_id(&self) -> &PlayerId {
        self.session.player_id()
    }

    /// Run until `Input::Quit` or the input channel closes, then leave the
    /// arena.
    pub async fn run(mut self, mut inputs: mpsc::Receiver<Input>) -> Result<(), ClientError> {
        let (events_tx, mut events) = mpsc::unbounded_channel();
        let mut movement: Option<PeriodicTask> = None;
        let mut battle_poll: Option<PeriodicTask> = None;

        loop {
            self.reschedule(&mut movement, &mut battle_poll, &events_tx);

            tokio::select! {
                input = inputs.recv() => match input {
                    None | Some(Input::Quit) => break,
                    Some(input) => self.handle_input(input),
                },
                Some(event) = events.recv() => self.handle_event(event),
            }

            self.dispatch(&events_tx);
            self.publish();
        }

        drop(movement);
        drop(battle_poll);

        info!(player_id = %self.session.player_id(), "Leaving arena");
        self.api.disconnect(self.session.player_id()).await
    }

    /// Start or cancel the periodic tasks to match the session phase
    fn reschedule(
        &self,
        movement: &mut Option<PeriodicTask>,
        battle_poll: &mut Option<PeriodicTask>,
        events: &mpsc::UnboundedSender<Event>,
    ) {
        match (self.session.wants_movement_tick(), movement.is_some()) {
            (true, false) => {
                debug!("Starting movement tick");
                *movement = Some(PeriodicTask::spawn(self.movement_period, events.clone(), || {
                    Event::MovementTick
                }));
            }
            (false, true) => {
                debug!("Cancelling movement tick");
                *movement = None;
            }
            _ => {}
        }

        match (self.session.wants_battle_poll(), battle_poll.is_some()) {
            (true, false) => {
                debug!("Starting battle poll");
                *battle_poll = Some(PeriodicTask::spawn(self.poll_period, events.clone(), || {
                    Event::BattlePollTick
                }));
            }
            (false, true) => {
                debug!("Cancelling battle poll");
                *battle_poll = None;
            }
            _ => {}
        }
    }

    fn handle_input(&mut self, input: Input) {
        let result = match input {
            Input::ChooseLoadout { name, x, y } => self.session.choose_loadout(name, x, y),
            Input::Steer(heading) => {
                self.session.steer(heading);
                Ok(())
            }
            Input::ChooseAttack(slot) => self.session.choose_attack(slot),
            Input::EndBattle => self.session.end_battle(),
            Input::Quit => Ok(()),
        };

        if let Err(e) = result {
            warn!(error = %e, "Input rejected");
            let _ = self.notices.send(Notice::Alert(e.to_string()));
        }
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::MovementTick => self.session.movement_tick(),
            Event::BattlePollTick => self.session.battle_poll_tick(),
            Event::LoadoutSelected(epoch, result) => self.session.on_loadout_selected(epoch, result),
            Event::PositionSynced(epoch, result) => self.session.on_position_synced(epoch, result),
            Event::BattleStarted(epoch, result) => self.session.on_battle_started(epoch, result),
            Event::AttacksSubmitted(epoch, result) => self.session.on_attacks_submitted(epoch, result),
            Event::OpponentAttacks(epoch, result) => self.session.on_opponent_attacks(epoch, result),
            Event::BattleEnded(epoch, result) => self.session.on_battle_ended(epoch, result),
        }
    }

    /// Spawn one request per queued command; replies come back as events
    fn dispatch(&mut self, events: &mpsc::UnboundedSender<Event>) {
        for command in self.session.drain_commands() {
            let api = self.api.clone();
            let id = self.session.player_id().clone();
            let events = events.clone();

            tokio::spawn(async move {
                let event = match command {
                    Command::SelectLoadout { epoch, name } => {
                        Event::LoadoutSelected(epoch, api.select_loadout(&id, name).await)
                    }
                    Command::PushPosition { epoch, x, y } => {
                        Event::PositionSynced(epoch, api.push_position(&id, x, y).await)
                    }
                    Command::StartBattle { epoch, opponent } => {
                        Event::BattleStarted(epoch, api.start_battle(&id, &opponent).await)
                    }
                    Command::SubmitAttacks { epoch, attacks } => {
                        Event::AttacksSubmitted(epoch, api.submit_attacks(&id, attacks).await)
                    }
                    Command::PollOpponent { epoch, opponent } => {
                        Event::OpponentAttacks(epoch, api.attacks_of(&opponent).await)
                    }
                    Command::EndBattle { epoch } => {
                        Event::BattleEnded(epoch, api.end_battle(&id).await)
                    }
                };
                let _ = events.send(event);
            });
        }
    }

    fn publish(&mut self) {
        for notice in self.session.drain_notices() {
            if self.notices.send(notice).is_err() {
                debug!("Notice receiver dropped");
            }
        }
    }
}
