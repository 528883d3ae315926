//! Per-session client state machine
//!
//! The session never performs I/O. User input and server replies are fed
//! in; requests to send and notices for the user are drained out. Every
//! request carries the session epoch it was issued under, and a reply whose
//! epoch has moved on is dropped without being applied.

use tracing::{debug, info, warn};

use crate::game::{resolve_battle, Attack, BattleResult, Loadout, LoadoutName, PlayerId, MOVES_PER_BATTLE};
use crate::protocol::MapResponse;

use super::movement::{Avatar, Heading, MapBounds};
use super::peers::PeerTable;
use super::transport::ClientError;

/// Generation counter; bumps whenever the session changes phase
pub type Epoch = u64;

/// A request the driver should send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SelectLoadout { epoch: Epoch, name: LoadoutName },
    PushPosition { epoch: Epoch, x: i32, y: i32 },
    StartBattle { epoch: Epoch, opponent: PlayerId },
    SubmitAttacks { epoch: Epoch, attacks: Vec<Attack> },
    PollOpponent { epoch: Epoch, opponent: PlayerId },
    EndBattle { epoch: Epoch },
}

/// Something the user should be shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Alert(String),
    /// Back on the map
    Roaming,
    BattleStarted {
        opponent: PlayerId,
        opponent_loadout: Option<LoadoutName>,
    },
    /// The server refused our attacks; the picks were cleared
    AttacksCleared,
    /// Outcome seen from this player's side (`A` is us)
    Verdict {
        opponent: PlayerId,
        result: BattleResult,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BattleStage {
    /// Bond requested, waiting for a map reply naming the opponent
    Confirming,
    /// Picking attacks one at a time
    Selecting,
    /// Full sequence sent, waiting for the server to accept it
    Submitting,
    /// Polling for the opponent's sequence
    AwaitingOpponent,
    Finished(BattleResult),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Battle {
    pub opponent: PlayerId,
    /// Loadout slots picked so far, in order
    pub picks: Vec<usize>,
    pub stage: BattleStage,
    /// End requested, waiting for the server
    pub ending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    ChoosingLoadout { pending: Option<(LoadoutName, Avatar)> },
    Roaming,
    Battle(Battle),
}

pub struct ClientSession {
    player_id: PlayerId,
    bounds: MapBounds,
    epoch: Epoch,
    phase: Phase,
    loadout: Option<Loadout>,
    avatar: Option<Avatar>,
    peers: PeerTable,
    commands: Vec<Command>,
    notices: Vec<Notice>,
}

impl ClientSession {
    pub fn new(player_id: PlayerId, bounds: MapBounds) -> Self {
        Self {
            player_id,
            bounds,
            epoch: 0,
            phase: Phase::ChoosingLoadout { pending: None },
            loadout: None,
            avatar: None,
            peers: PeerTable::new(),
            commands: Vec::new(),
            notices: Vec::new(),
        }
    }

    pub fn player_id(&self) -> &PlayerId {
        &self.player_id
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn avatar(&self) -> Option<&Avatar> {
        self.avatar.as_ref()
    }

    pub fn loadout(&self) -> Option<&Loadout> {
        self.loadout.as_ref()
    }

    pub fn peers(&self) -> &PeerTable {
        &self.peers
    }

    /// Whether the movement/position task should be running
    pub fn wants_movement_tick(&self) -> bool {
        matches!(self.phase, Phase::Roaming)
    }

    /// Whether the opponent poll task should be running
    pub fn wants_battle_poll(&self) -> bool {
        matches!(
            &self.phase,
            Phase::Battle(Battle { stage: BattleStage::AwaitingOpponent, ending: false, .. })
        )
    }

    pub fn drain_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    // ------------------------------------------------------------------
    // User input
    // ------------------------------------------------------------------

    /// Pick a mokepon and where it appears on the map
    pub fn choose_loadout(&mut self, name: LoadoutName, x: i32, y: i32) -> Result<(), ClientError> {
        let Phase::ChoosingLoadout { pending } = &mut self.phase else {
            return Err(ClientError::InvalidState("mokepon already chosen"));
        };
        if pending.is_some() {
            return Err(ClientError::InvalidState("mokepon selection in flight"));
        }

        *pending = Some((name, Avatar::at(x, y)));
        self.commands.push(Command::SelectLoadout {
            epoch: self.epoch,
            name,
        });
        Ok(())
    }

    /// Apply the held direction; `Stationary` stops the avatar
    pub fn steer(&mut self, heading: Heading) {
        if let Some(avatar) = &mut self.avatar {
            avatar.steer(heading);
        }
    }

    /// Pick the attack in loadout `slot`. Each slot can be used once per
    /// battle; the fifth pick submits the whole sequence.
    pub fn choose_attack(&mut self, slot: usize) -> Result<(), ClientError> {
        let slots = self.loadout.as_ref().map_or(0, |l| l.attacks.len());
        let epoch = self.epoch;

        let Phase::Battle(battle) = &mut self.phase else {
            return Err(ClientError::InvalidState("not in a battle"));
        };
        if battle.stage != BattleStage::Selecting || battle.ending {
            return Err(ClientError::InvalidState("attacks already chosen"));
        }
        if slot >= slots || battle.picks.contains(&slot) {
            return Err(ClientError::InvalidState("attack unavailable"));
        }

        battle.picks.push(slot);
        if battle.picks.len() < MOVES_PER_BATTLE {
            return Ok(());
        }

        battle.stage = BattleStage::Submitting;
        let attacks = self.picked_attacks();
        self.commands.push(Command::SubmitAttacks { epoch, attacks });
        Ok(())
    }

    /// Leave the current battle and go back to the map. Allowed at any
    /// stage, which is the only way out of a battle whose opponent vanished.
    pub fn end_battle(&mut self) -> Result<(), ClientError> {
        let Phase::Battle(battle) = &mut self.phase else {
            return Err(ClientError::InvalidState("not in a battle"));
        };
        if battle.ending {
            return Ok(());
        }

        battle.ending = true;
        self.commands.push(Command::EndBattle { epoch: self.epoch });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Ticks
    // ------------------------------------------------------------------

    /// Move, contain, collide, then push the resulting position
    pub fn movement_tick(&mut self) {
        if !self.wants_movement_tick() {
            return;
        }
        let Some(avatar) = &mut self.avatar else {
            return;
        };

        avatar.step(&self.bounds);

        let mut collided = None;
        for peer in self.peers.iter().filter(|p| p.is_available()) {
            if avatar.is_moving() && avatar.collide_with(&peer.bbox()) {
                collided = Some(peer.id.clone());
                break;
            }
        }

        self.commands.push(Command::PushPosition {
            epoch: self.epoch,
            x: avatar.x,
            y: avatar.y,
        });

        if let Some(opponent) = collided {
            debug!(opponent_id = %opponent, "Collided with peer");
            self.enter_battle(opponent, false);
        }
    }

    pub fn battle_poll_tick(&mut self) {
        if !self.wants_battle_poll() {
            return;
        }
        if let Phase::Battle(battle) = &self.phase {
            self.commands.push(Command::PollOpponent {
                epoch: self.epoch,
                opponent: battle.opponent.clone(),
            });
        }
    }

    // ------------------------------------------------------------------
    // Server replies
    // ------------------------------------------------------------------

    pub fn on_loadout_selected(&mut self, epoch: Epoch, result: Result<(), ClientError>) {
        if self.is_stale(epoch) {
            return;
        }
        let Phase::ChoosingLoadout { pending } = &mut self.phase else {
            return;
        };
        let Some((name, avatar)) = pending.take() else {
            return;
        };

        if let Err(e) = result {
            self.alert(format!("Could not select {name}: {e}"));
            return;
        }

        info!(player_id = %self.player_id, mokepon = %name, "Mokepon selected");
        self.loadout = Some(Loadout::from_template(name));
        self.avatar = Some(avatar);
        self.transition(Phase::Roaming);
        self.notices.push(Notice::Roaming);
    }

    pub fn on_position_synced(&mut self, epoch: Epoch, result: Result<MapResponse, ClientError>) {
        if self.is_stale(epoch) {
            return;
        }
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                self.alert(format!("Map sync failed: {e}"));
                // No other push will come to confirm the bond.
                if self.awaiting_confirmation() {
                    self.transition(Phase::Roaming);
                    self.notices.push(Notice::Roaming);
                }
                return;
            }
        };

        self.peers.ingest(&response.opponents);

        if self.awaiting_confirmation() {
            return self.confirm_bond(response.battling);
        }

        // Someone walked into us: their bond names us as partner.
        if let Some(partner) = response.battling {
            if self.wants_movement_tick() && self.peers.get(&partner).is_some() {
                debug!(opponent_id = %partner, "Pulled into battle");
                if let Some(avatar) = &mut self.avatar {
                    avatar.stop();
                }
                self.enter_battle(partner, true);
            }
        }
    }

    /// The server answers a bond request with 200 even when the opponent was
    /// already taken, so an accepted request is followed by a position push
    /// whose `battling` field tells who we are really bonded to.
    pub fn on_battle_started(&mut self, epoch: Epoch, result: Result<(), ClientError>) {
        if self.is_stale(epoch) {
            return;
        }
        if let Err(e) = result {
            self.alert(format!("Could not start battle: {e}"));
            self.transition(Phase::Roaming);
            self.notices.push(Notice::Roaming);
            return;
        }

        if self.awaiting_confirmation() {
            self.push_position();
        }
    }

    pub fn on_attacks_submitted(&mut self, epoch: Epoch, result: Result<(), ClientError>) {
        if self.is_stale(epoch) {
            return;
        }
        let Phase::Battle(battle) = &mut self.phase else {
            return;
        };
        if battle.stage != BattleStage::Submitting {
            return;
        }

        match result {
            Ok(()) => battle.stage = BattleStage::AwaitingOpponent,
            Err(e) => {
                battle.picks.clear();
                battle.stage = BattleStage::Selecting;
                self.alert(format!("Could not send attacks: {e}"));
                self.notices.push(Notice::AttacksCleared);
            }
        }
    }

    pub fn on_opponent_attacks(&mut self, epoch: Epoch, result: Result<Vec<Attack>, ClientError>) {
        if self.is_stale(epoch) || !self.wants_battle_poll() {
            return;
        }
        let theirs = match result {
            Ok(attacks) => attacks,
            Err(e) => return self.alert(format!("Could not fetch opponent attacks: {e}")),
        };
        if theirs.len() < MOVES_PER_BATTLE {
            return;
        }

        let mine = self.picked_attacks();
        let result = match resolve_battle(&mine, &theirs) {
            Ok(result) => result,
            Err(e) => return self.alert(format!("Could not resolve battle: {e}")),
        };

        let Phase::Battle(battle) = &mut self.phase else {
            return;
        };
        battle.stage = BattleStage::Finished(result);
        let opponent = battle.opponent.clone();

        info!(
            player_id = %self.player_id,
            opponent_id = %opponent,
            wins = result.wins_a,
            losses = result.wins_b,
            verdict = ?result.verdict,
            "Battle resolved"
        );
        self.notices.push(Notice::Verdict { opponent, result });
    }

    pub fn on_battle_ended(&mut self, epoch: Epoch, result: Result<(), ClientError>) {
        if self.is_stale(epoch) {
            return;
        }
        let Phase::Battle(battle) = &mut self.phase else {
            return;
        };

        if let Err(e) = result {
            battle.ending = false;
            return self.alert(format!("Could not end battle: {e}"));
        }

        self.transition(Phase::Roaming);
        self.notices.push(Notice::Roaming);
    }

    // ------------------------------------------------------------------

    /// Request a bond with `opponent`. A bond the server already reported
    /// is `confirmed`; otherwise attack selection waits for the map reply.
    fn enter_battle(&mut self, opponent: PlayerId, confirmed: bool) {
        let stage = if confirmed {
            BattleStage::Selecting
        } else {
            BattleStage::Confirming
        };

        self.transition(Phase::Battle(Battle {
            opponent: opponent.clone(),
            picks: Vec::new(),
            stage,
            ending: false,
        }));

        self.commands.push(Command::StartBattle {
            epoch: self.epoch,
            opponent: opponent.clone(),
        });
        if confirmed {
            self.announce_battle(opponent);
        }
    }

    fn announce_battle(&mut self, opponent: PlayerId) {
        let opponent_loadout = self.peers.get(&opponent).map(|p| p.loadout);
        self.notices.push(Notice::BattleStarted {
            opponent,
            opponent_loadout,
        });
    }

    fn awaiting_confirmation(&self) -> bool {
        matches!(
            &self.phase,
            Phase::Battle(Battle { stage: BattleStage::Confirming, ending: false, .. })
        )
    }

    /// Settle a requested bond against the partner the server reports
    fn confirm_bond(&mut self, battling: Option<PlayerId>) {
        let Phase::Battle(battle) = &mut self.phase else {
            return;
        };

        match battling {
            Some(partner) if partner == battle.opponent => {
                battle.stage = BattleStage::Selecting;
                info!(player_id = %self.player_id, opponent_id = %partner, "Battle confirmed");
                self.announce_battle(partner);
            }
            Some(partner) if self.peers.get(&partner).is_some() => {
                info!(
                    player_id = %self.player_id,
                    wanted = %battle.opponent,
                    opponent_id = %partner,
                    "Already bonded to another player"
                );
                self.enter_battle(partner, true);
            }
            _ => {
                let opponent = battle.opponent.clone();
                self.alert(format!("{opponent} is already battling someone else"));
                self.transition(Phase::Roaming);
                self.notices.push(Notice::Roaming);
            }
        }
    }

    fn push_position(&mut self) {
        if let Some(avatar) = &self.avatar {
            self.commands.push(Command::PushPosition {
                epoch: self.epoch,
                x: avatar.x,
                y: avatar.y,
            });
        }
    }

    fn transition(&mut self, phase: Phase) {
        self.epoch += 1;
        self.phase = phase;
    }

    fn is_stale(&self, epoch: Epoch) -> bool {
        if epoch != self.epoch {
            debug!(epoch, current = self.epoch, "Dropping stale reply");
            return true;
        }
        false
    }

    fn picked_attacks(&self) -> Vec<Attack> {
        let (Some(loadout), Phase::Battle(battle)) = (&self.loadout, &self.phase) else {
            return Vec::new();
        };
        battle
            .picks
            .iter()
            .filter_map(|&slot| loadout.attacks.get(slot).copied())
            .collect()
    }

    fn alert(&mut self, message: String) {
        warn!(player_id = %self.player_id, "{message}");
        self.notices.push(Notice::Alert(message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Verdict;
    use crate::protocol::{MokeponDto, PlayerSnapshotDto};
    use Attack::*;

    const MAP: MapBounds = MapBounds {
        width: 320,
        height: 240,
    };

    fn peer(id: &str, name: &str, x: i32, y: i32) -> PlayerSnapshotDto {
        PlayerSnapshotDto {
            id: PlayerId::new(id),
            x,
            y,
            mokepon: Some(MokeponDto {
                name: name.to_string(),
                attacks: Vec::new(),
            }),
            opponent: None,
            in_battle: false,
        }
    }

    fn map(opponents: Vec<PlayerSnapshotDto>, battling: Option<&str>) -> MapResponse {
        MapResponse {
            opponents,
            battling: battling.map(PlayerId::new),
        }
    }

    fn not_found() -> ClientError {
        ClientError::Status {
            status: 404,
            body: String::new(),
        }
    }

    /// A session already roaming as Hipodoge at (x, y)
    fn roaming(x: i32, y: i32) -> ClientSession {
        let mut session = ClientSession::new(PlayerId::new("me"), MAP);
        session.choose_loadout(LoadoutName::Hipodoge, x, y).unwrap();
        let epoch = session.epoch();
        session.on_loadout_selected(epoch, Ok(()));
        session.drain_commands();
        session.drain_notices();
        session
    }

    fn busy(id: &str, name: &str, x: i32, y: i32) -> PlayerSnapshotDto {
        let mut snapshot = peer(id, name, x, y);
        snapshot.opponent = Some(PlayerId::new(""));
        snapshot.in_battle = true;
        snapshot
    }

    /// A roaming session that has just walked into "rival"
    fn colliding() -> ClientSession {
        let mut session = roaming(60, 50);
        let epoch = session.epoch();
        session.on_position_synced(epoch, Ok(map(vec![peer("rival", "Capipepo", 85, 50)], None)));
        session.steer(Heading::East);
        session.movement_tick();
        session.drain_commands();
        session.drain_notices();
        session
    }

    /// Accept the bond request and answer the follow-up position push
    fn settle_bond(session: &mut ClientSession, battling: Option<&str>, others: Vec<PlayerSnapshotDto>) {
        let epoch = session.epoch();
        session.on_battle_started(epoch, Ok(()));
        assert_eq!(
            session.drain_commands(),
            vec![Command::PushPosition { epoch, x: 60, y: 50 }]
        );
        session.on_position_synced(epoch, Ok(map(others, battling)));
    }

    /// A session in a confirmed battle with "rival"
    fn battling() -> ClientSession {
        let mut session = colliding();
        let rival = busy("rival", "Capipepo", 85, 50);
        settle_bond(&mut session, Some("rival"), vec![rival]);
        session.drain_commands();
        session.drain_notices();
        session
    }

    #[test]
    fn loadout_ack_starts_roaming() {
        let mut session = ClientSession::new(PlayerId::new("me"), MAP);
        session.choose_loadout(LoadoutName::Pydos, 10, 20).unwrap();

        assert_eq!(
            session.drain_commands(),
            vec![Command::SelectLoadout {
                epoch: 0,
                name: LoadoutName::Pydos
            }]
        );
        assert!(!session.wants_movement_tick());

        session.on_loadout_selected(0, Ok(()));

        assert!(session.wants_movement_tick());
        assert_eq!(session.avatar(), Some(&Avatar::at(10, 20)));
        assert_eq!(session.drain_notices(), vec![Notice::Roaming]);
    }

    #[test]
    fn failed_loadout_allows_retry() {
        let mut session = ClientSession::new(PlayerId::new("me"), MAP);
        session.choose_loadout(LoadoutName::Pydos, 10, 20).unwrap();
        session.on_loadout_selected(0, Err(not_found()));

        assert!(matches!(session.drain_notices()[..], [Notice::Alert(_)]));
        assert!(session.choose_loadout(LoadoutName::Capipepo, 0, 0).is_ok());
    }

    #[test]
    fn movement_tick_pushes_position() {
        let mut session = roaming(100, 100);
        session.steer(Heading::North);
        session.movement_tick();

        let epoch = session.epoch();
        assert_eq!(
            session.drain_commands(),
            vec![Command::PushPosition { epoch, x: 100, y: 95 }]
        );
    }

    #[test]
    fn collision_starts_battle_and_stops_movement() {
        let mut session = roaming(60, 50);
        let epoch = session.epoch();
        session.on_position_synced(epoch, Ok(map(vec![peer("rival", "Capipepo", 85, 50)], None)));

        session.steer(Heading::East);
        session.movement_tick();

        let commands = session.drain_commands();
        assert_eq!(commands[0], Command::PushPosition { epoch, x: 60, y: 50 });
        assert_eq!(
            commands[1],
            Command::StartBattle {
                epoch: epoch + 1,
                opponent: PlayerId::new("rival")
            }
        );
        assert!(session.drain_notices().is_empty());
        assert!(!session.wants_movement_tick());
        assert!(!session.avatar().unwrap().is_moving());
        assert!(session.choose_attack(0).is_err());

        let rival = busy("rival", "Capipepo", 85, 50);
        settle_bond(&mut session, Some("rival"), vec![rival]);

        assert_eq!(
            session.drain_notices(),
            vec![Notice::BattleStarted {
                opponent: PlayerId::new("rival"),
                opponent_loadout: Some(LoadoutName::Capipepo),
            }]
        );
        assert!(session.choose_attack(0).is_ok());
    }

    #[test]
    fn lost_bond_race_returns_to_map() {
        let mut session = colliding();

        // rival was taken by someone else first; the server still said 200
        let rival = busy("rival", "Capipepo", 85, 50);
        settle_bond(&mut session, None, vec![rival]);

        let notices = session.drain_notices();
        assert!(matches!(notices[0], Notice::Alert(_)));
        assert_eq!(notices[1], Notice::Roaming);
        assert!(session.wants_movement_tick());
        assert!(session.choose_attack(0).is_err());
    }

    #[test]
    fn existing_bond_wins_over_collision() {
        let mut session = colliding();

        // We were bonded to "other" before our own request landed.
        let rival = busy("rival", "Capipepo", 85, 50);
        let other = busy("other", "Pydos", 200, 200);
        settle_bond(&mut session, Some("other"), vec![rival, other]);

        assert!(matches!(session.phase(), Phase::Battle(b) if b.opponent == PlayerId::new("other")));
        assert_eq!(
            session.drain_notices(),
            vec![Notice::BattleStarted {
                opponent: PlayerId::new("other"),
                opponent_loadout: Some(LoadoutName::Pydos),
            }]
        );

        let epoch = session.epoch();
        assert_eq!(
            session.drain_commands(),
            vec![Command::StartBattle {
                epoch,
                opponent: PlayerId::new("other")
            }]
        );
        for slot in 0..5 {
            session.choose_attack(slot).unwrap();
        }
        session.on_attacks_submitted(epoch, Ok(()));
        session.drain_commands();
        session.battle_poll_tick();
        assert_eq!(
            session.drain_commands(),
            vec![Command::PollOpponent {
                epoch,
                opponent: PlayerId::new("other")
            }]
        );
    }

    #[test]
    fn failed_confirmation_returns_to_map() {
        let mut session = colliding();
        let epoch = session.epoch();
        session.on_battle_started(epoch, Ok(()));

        session.on_position_synced(epoch, Err(not_found()));

        assert!(session.wants_movement_tick());
        let notices = session.drain_notices();
        assert!(matches!(notices[0], Notice::Alert(_)));
        assert_eq!(notices[1], Notice::Roaming);
    }

    #[test]
    fn stale_confirmation_is_ignored() {
        let mut session = colliding();
        let epoch = session.epoch();
        session.on_battle_started(epoch, Ok(()));

        // The push sent before the collision answers under the old epoch.
        session.on_position_synced(epoch - 1, Ok(map(Vec::new(), None)));

        assert!(matches!(
            session.phase(),
            Phase::Battle(Battle { stage: BattleStage::Confirming, .. })
        ));
    }

    #[test]
    fn battling_peers_are_not_collided_with() {
        let mut session = roaming(60, 50);
        let epoch = session.epoch();
        let mut busy = peer("busy", "Capipepo", 85, 50);
        busy.in_battle = true;
        session.on_position_synced(epoch, Ok(map(vec![busy], None)));

        session.steer(Heading::East);
        session.movement_tick();

        assert!(session.wants_movement_tick());
    }

    #[test]
    fn stationary_player_does_not_trigger_battle() {
        let mut session = roaming(60, 50);
        let epoch = session.epoch();
        session.on_position_synced(epoch, Ok(map(vec![peer("rival", "Capipepo", 70, 50)], None)));

        session.movement_tick();

        assert!(session.wants_movement_tick());
    }

    #[test]
    fn partner_bond_pulls_us_into_battle() {
        let mut session = roaming(10, 10);
        let epoch = session.epoch();

        session.on_position_synced(
            epoch,
            Ok(map(vec![peer("rival", "Ratigueya", 200, 200)], Some("rival"))),
        );

        assert!(matches!(
            session.phase(),
            Phase::Battle(b) if b.opponent == PlayerId::new("rival") && b.stage == BattleStage::Selecting
        ));
        assert!(matches!(
            session.drain_commands()[..],
            [Command::StartBattle { .. }]
        ));
        assert!(matches!(
            session.drain_notices()[..],
            [Notice::BattleStarted { .. }]
        ));

        // The repeated bond request needs no second confirmation.
        let epoch = session.epoch();
        session.on_battle_started(epoch, Ok(()));
        assert!(session.drain_commands().is_empty());
    }

    #[test]
    fn stale_map_reply_is_ignored() {
        let mut session = battling();
        let old = session.epoch() - 1;

        session.on_position_synced(old, Ok(map(vec![peer("late", "Pydos", 1, 1)], Some("late"))));

        assert!(session.peers().get(&PlayerId::new("late")).is_none());
        assert!(matches!(session.phase(), Phase::Battle(b) if b.opponent == PlayerId::new("rival")));
    }

    #[test]
    fn failed_battle_start_returns_to_map() {
        let mut session = battling();
        let epoch = session.epoch();

        session.on_battle_started(epoch, Err(not_found()));

        assert!(session.wants_movement_tick());
        let notices = session.drain_notices();
        assert!(matches!(notices[0], Notice::Alert(_)));
        assert_eq!(notices[1], Notice::Roaming);
    }

    #[test]
    fn attacks_are_single_use_and_fifth_submits() {
        let mut session = battling();
        let epoch = session.epoch();

        session.choose_attack(4).unwrap();
        assert!(session.choose_attack(4).is_err());
        assert!(session.choose_attack(9).is_err());
        for slot in 0..4 {
            session.choose_attack(slot).unwrap();
        }

        // Hipodoge: [Water, Water, Water, Fire, Earth]
        assert_eq!(
            session.drain_commands(),
            vec![Command::SubmitAttacks {
                epoch,
                attacks: vec![Earth, Water, Water, Water, Fire]
            }]
        );
        assert!(session.choose_attack(0).is_err());
    }

    #[test]
    fn poll_starts_only_after_submit_is_confirmed() {
        let mut session = battling();
        let epoch = session.epoch();
        for slot in 0..5 {
            session.choose_attack(slot).unwrap();
        }
        assert!(!session.wants_battle_poll());

        session.on_attacks_submitted(epoch, Ok(()));
        assert!(session.wants_battle_poll());

        session.battle_poll_tick();
        assert!(session.drain_commands().contains(&Command::PollOpponent {
            epoch,
            opponent: PlayerId::new("rival")
        }));
    }

    #[test]
    fn rejected_submit_clears_picks() {
        let mut session = battling();
        let epoch = session.epoch();
        for slot in 0..5 {
            session.choose_attack(slot).unwrap();
        }

        session.on_attacks_submitted(
            epoch,
            Err(ClientError::Status {
                status: 400,
                body: "not in a battle".into(),
            }),
        );

        assert!(!session.wants_battle_poll());
        let notices = session.drain_notices();
        assert!(matches!(notices[0], Notice::Alert(_)));
        assert_eq!(notices[1], Notice::AttacksCleared);
        assert!(session.choose_attack(0).is_ok());
    }

    #[test]
    fn complete_opponent_sequence_resolves_battle() {
        let mut session = battling();
        let epoch = session.epoch();
        for slot in 0..5 {
            session.choose_attack(slot).unwrap();
        }
        session.on_attacks_submitted(epoch, Ok(()));

        session.on_opponent_attacks(epoch, Ok(vec![Earth, Earth]));
        assert!(session.wants_battle_poll());

        // Ours: [W, W, W, F, E] against Capipepo's [E, E, E, F, W]
        session.on_opponent_attacks(epoch, Ok(vec![Earth, Earth, Earth, Fire, Water]));

        assert!(!session.wants_battle_poll());
        let expected = BattleResult {
            wins_a: 1,
            wins_b: 3,
            verdict: Verdict::B,
        };
        assert_eq!(
            session.drain_notices(),
            vec![Notice::Verdict {
                opponent: PlayerId::new("rival"),
                result: expected
            }]
        );

        // A late poll reply changes nothing.
        session.on_opponent_attacks(epoch, Ok(vec![Fire; 5]));
        assert!(session.drain_notices().is_empty());
    }

    #[test]
    fn ending_battle_returns_to_map() {
        let mut session = battling();
        let epoch = session.epoch();

        session.end_battle().unwrap();
        session.end_battle().unwrap();
        assert_eq!(session.drain_commands(), vec![Command::EndBattle { epoch }]);
        assert!(session.choose_attack(0).is_err());

        session.on_battle_ended(epoch, Ok(()));

        assert!(session.wants_movement_tick());
        assert_eq!(session.drain_notices(), vec![Notice::Roaming]);
    }

    #[test]
    fn failed_end_keeps_battle() {
        let mut session = battling();
        let epoch = session.epoch();
        session.end_battle().unwrap();

        session.on_battle_ended(epoch, Err(not_found()));

        assert!(matches!(session.phase(), Phase::Battle(b) if !b.ending));
    }
}
