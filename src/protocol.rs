//! HTTP wire types shared by the server and the sync client

use serde::{Deserialize, Serialize};

use crate::game::{Attack, PlayerId, PlayerSnapshot, PositionUpdate};

/// Reply to `GET /join`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    pub player_id: PlayerId,
}

/// Body of `POST /mokepon/:playerId`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadoutRequest {
    pub mokepon: String,
}

/// Body of `POST /map/:playerId`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PositionRequest {
    pub x: i32,
    pub y: i32,
}

/// Reply to `POST /map/:playerId`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapResponse {
    pub opponents: Vec<PlayerSnapshotDto>,
    /// Who the requester is bonded to
    pub battling: Option<PlayerId>,
}

impl MapResponse {
    pub fn from_update(update: PositionUpdate, viewer: &PlayerId) -> Self {
        Self {
            opponents: update
                .others
                .into_iter()
                .map(|s| PlayerSnapshotDto::observed_by(s, viewer))
                .collect(),
            battling: update.bond_partner,
        }
    }
}

/// A peer as seen on the map
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshotDto {
    pub id: PlayerId,
    pub x: i32,
    pub y: i32,
    pub mokepon: Option<MokeponDto>,
    /// `null` when free. The viewer's id when bonded to the viewer, an empty
    /// id when bonded to anyone else.
    pub opponent: Option<PlayerId>,
    #[serde(default)]
    pub in_battle: bool,
}

impl PlayerSnapshotDto {
    pub fn observed_by(snapshot: PlayerSnapshot, viewer: &PlayerId) -> Self {
        let opponent = match (snapshot.in_battle, snapshot.bonded_to_viewer) {
            (false, _) => None,
            (true, true) => Some(viewer.clone()),
            (true, false) => Some(PlayerId::new("")),
        };

        Self {
            id: snapshot.id,
            x: snapshot.x,
            y: snapshot.y,
            mokepon: snapshot.loadout.map(|name| MokeponDto {
                name: name.as_str().to_string(),
                attacks: name.template().to_vec(),
            }),
            opponent,
            in_battle: snapshot.in_battle,
        }
    }

    /// Bonded to someone, whether or not the server named them
    pub fn is_battling(&self) -> bool {
        self.in_battle || self.opponent.is_some()
    }
}

/// Public loadout info of a peer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MokeponDto {
    pub name: String,
    #[serde(default)]
    pub attacks: Vec<Attack>,
}

/// Body of `POST /battle/start`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartBattleRequest {
    pub player_id: PlayerId,
    pub opponent_id: PlayerId,
}

/// Body of `POST /battle/:playerId` and reply to `GET /battle/:playerId`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttacksBody {
    pub attacks: Vec<Attack>,
}

/// Body of `GET /disconnect`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisconnectRequest {
    pub id: PlayerId,
}

/// Reply to `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub players: usize,
    pub bonded_players: usize,
}
