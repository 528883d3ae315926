//! Locally known peers, refreshed from each map response
//!
//! Peers that vanish from the server's view are never pruned here; they stay
//! at their last known position until the session ends.

use tracing::{debug, warn};

use crate::game::{LoadoutName, PlayerId};
use crate::protocol::PlayerSnapshotDto;

use super::movement::{BoundingBox, AVATAR_SIZE};

/// Another player as tracked by this client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    pub id: PlayerId,
    pub loadout: LoadoutName,
    pub x: i32,
    pub y: i32,
    pub in_battle: bool,
}

impl Peer {
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::square(self.x, self.y, AVATAR_SIZE)
    }

    /// Has reported a position at least once
    pub fn is_placed(&self) -> bool {
        self.x >= 0 && self.y >= 0
    }

    /// Can be collided with
    pub fn is_available(&self) -> bool {
        self.is_placed() && !self.in_battle
    }
}

/// Peers in first-seen order
#[derive(Debug, Default)]
pub struct PeerTable {
    peers: Vec<Peer>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a snapshot into the table. Players without a mokepon are
    /// skipped, as are mokepons this client does not know.
    pub fn ingest(&mut self, snapshots: &[PlayerSnapshotDto]) {
        for snapshot in snapshots {
            let Some(mokepon) = &snapshot.mokepon else {
                continue;
            };

            if let Some(peer) = self.peers.iter_mut().find(|p| p.id == snapshot.id) {
                peer.x = snapshot.x;
                peer.y = snapshot.y;
                peer.in_battle = snapshot.is_battling();
                continue;
            }

            let Some(loadout) = LoadoutName::parse(&mokepon.name) else {
                warn!(peer_id = %snapshot.id, mokepon = %mokepon.name, "Peer has an unknown mokepon");
                continue;
            };

            debug!(peer_id = %snapshot.id, mokepon = %loadout, "New peer");
            self.peers.push(Peer {
                id: snapshot.id.clone(),
                loadout,
                x: snapshot.x,
                y: snapshot.y,
                in_battle: snapshot.is_battling(),
            });
        }
    }

    pub fn get(&self, id: &PlayerId) -> Option<&Peer> {
        self.peers.iter().find(|p| &p.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Peer> {
        self.peers.iter()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
