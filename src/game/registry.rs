//! Authoritative player registry
//!
//! Every mutation takes the registry's write lock for its whole duration, so
//! handlers running concurrently observe each operation atomically.

use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::attack::{Attack, Loadout, LoadoutName};

/// Attempts at finding an unused id before giving up
const MAX_ID_ATTEMPTS: usize = 64;

/// Opaque, server-allocated player id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sentinel coordinate for a player that has not been placed yet
pub const UNPLACED: i32 = -1;

/// Where a player stands in the battle cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleState {
    Unbonded,
    /// Bonded, moves still open
    Selecting,
    /// Bonded with a full move sequence submitted
    Locked,
}

/// Authoritative player state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub x: i32,
    pub y: i32,
    pub loadout: Option<Loadout>,
    /// Lookup-only reference to the battle partner
    pub bond_partner: Option<PlayerId>,
    pub submitted_moves: Vec<Attack>,
}

impl Player {
    fn new(id: PlayerId) -> Self {
        Self {
            id,
            x: UNPLACED,
            y: UNPLACED,
            loadout: None,
            bond_partner: None,
            submitted_moves: Vec::new(),
        }
    }

    pub fn is_bonded(&self) -> bool {
        self.bond_partner.is_some()
    }

    pub fn battle_state(&self) -> BattleState {
        match &self.bond_partner {
            None => BattleState::Unbonded,
            Some(_) if self.moves_frozen() => BattleState::Locked,
            Some(_) => BattleState::Selecting,
        }
    }

    pub(super) fn moves_frozen(&self) -> bool {
        self.submitted_moves.len() >= super::attack::MOVES_PER_BATTLE
    }
}

/// Registry errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Player {0} not found")]
    NotFound(PlayerId),

    #[error("Player {player} is already battling {partner}")]
    Conflict { player: PlayerId, partner: PlayerId },

    #[error("Invalid state: {0}")]
    InvalidState(&'static str),

    #[error("Unknown mokepon: {0}")]
    UnknownLoadout(String),

    #[error("Could not allocate a unique player id")]
    IdSpaceExhausted,
}

/// Source of candidate player ids. Candidates may repeat; the registry
/// rejects any that are already registered.
pub trait IdSource: Send + Sync {
    fn next_id(&self) -> PlayerId;
}

/// Random UUID ids
#[derive(Debug, Default)]
pub struct UuidIds;

impl IdSource for UuidIds {
    fn next_id(&self) -> PlayerId {
        PlayerId(Uuid::new_v4().simple().to_string())
    }
}

/// Four-digit numeric ids, the format older clients display
#[derive(Debug, Default)]
pub struct NumericIds;

impl IdSource for NumericIds {
    fn next_id(&self) -> PlayerId {
        PlayerId(rand::thread_rng().gen_range(1000..=9999).to_string())
    }
}

/// Registered players plus their registration order
#[derive(Debug, Default)]
pub(super) struct Roster {
    players: HashMap<PlayerId, Player>,
    order: Vec<PlayerId>,
}

impl Roster {
    pub(super) fn get(&self, id: &PlayerId) -> Result<&Player, RegistryError> {
        self.players
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))
    }

    pub(super) fn get_mut(&mut self, id: &PlayerId) -> Result<&mut Player, RegistryError> {
        self.players
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))
    }

    /// Players in registration order
    pub(super) fn iter(&self) -> impl Iterator<Item = &Player> {
        self.order.iter().filter_map(|id| self.players.get(id))
    }
}

/// Owned registry of every player in the arena
pub struct PlayerRegistry {
    pub(super) roster: RwLock<Roster>,
    ids: Box<dyn IdSource>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::with_id_source(UuidIds)
    }

    pub fn with_id_source(ids: impl IdSource + 'static) -> Self {
        Self {
            roster: RwLock::new(Roster::default()),
            ids: Box::new(ids),
        }
    }

    /// Register a new player under a freshly allocated id
    pub fn join(&self) -> Result<PlayerId, RegistryError> {
        let mut roster = self.roster.write();

        for _ in 0..MAX_ID_ATTEMPTS {
            let id = self.ids.next_id();
            if roster.players.contains_key(&id) {
                debug!(player_id = %id, "Id collision, retrying");
                continue;
            }

            roster.players.insert(id.clone(), Player::new(id.clone()));
            roster.order.push(id.clone());

            info!(player_id = %id, players = roster.players.len(), "Player joined");
            return Ok(id);
        }

        Err(RegistryError::IdSpaceExhausted)
    }

    /// Assign a copy of the named loadout template.
    ///
    /// Re-selecting the current loadout is accepted; switching to another
    /// one is not.
    pub fn set_loadout(&self, id: &PlayerId, name: &str) -> Result<(), RegistryError> {
        let mut roster = self.roster.write();
        let player = roster.get_mut(id)?;

        let name =
            LoadoutName::parse(name).ok_or_else(|| RegistryError::UnknownLoadout(name.to_string()))?;

        match &player.loadout {
            Some(current) if current.name == name => return Ok(()),
            Some(_) => return Err(RegistryError::InvalidState("mokepon already chosen")),
            None => {}
        }

        player.loadout = Some(Loadout::from_template(name));
        info!(player_id = %id, mokepon = %name, "Mokepon selected");
        Ok(())
    }

    /// Remove a player. A bonded partner is left pointing at the removed id.
    pub fn disconnect(&self, id: &PlayerId) -> Result<(), RegistryError> {
        let mut roster = self.roster.write();

        let player = roster
            .players
            .remove(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;
        roster.order.retain(|other| other != id);

        info!(
            player_id = %id,
            was_bonded = player.is_bonded(),
            players = roster.players.len(),
            "Player disconnected"
        );
        Ok(())
    }

    pub fn get(&self, id: &PlayerId) -> Result<Player, RegistryError> {
        self.roster.read().get(id).cloned()
    }

    /// Every player except `exclude`, in registration order
    pub fn list_others(&self, exclude: &PlayerId) -> Vec<Player> {
        self.roster
            .read()
            .iter()
            .filter(|p| &p.id != exclude)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.roster.read().players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Players currently holding a bond
    pub fn bonded_count(&self) -> usize {
        self.roster.read().iter().filter(|p| p.is_bonded()).count()
    }
}

impl Default for PlayerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
