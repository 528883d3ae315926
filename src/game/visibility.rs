//! Position updates and the peer view handed back to each player

use tracing::trace;

use super::attack::LoadoutName;
use super::registry::{Player, PlayerId, PlayerRegistry, RegistryError};

/// Public view of another player.
///
/// Carries whether the player is bonded, never who to, unless the partner is
/// the viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub x: i32,
    pub y: i32,
    pub loadout: Option<LoadoutName>,
    pub in_battle: bool,
    /// Bonded to the player who requested this view
    pub bonded_to_viewer: bool,
}

impl PlayerSnapshot {
    fn observe(player: &Player, viewer: &PlayerId) -> Self {
        Self {
            id: player.id.clone(),
            x: player.x,
            y: player.y,
            loadout: player.loadout.as_ref().map(|l| l.name),
            in_battle: player.is_bonded(),
            bonded_to_viewer: player.bond_partner.as_ref() == Some(viewer),
        }
    }
}

/// Reply to a position update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionUpdate {
    pub others: Vec<PlayerSnapshot>,
    /// The requester's own bond partner
    pub bond_partner: Option<PlayerId>,
}

impl PlayerRegistry {
    /// Store the requester's position and return everyone else.
    ///
    /// This is the only write path for coordinates. Repeating the same
    /// coordinates leaves state untouched.
    pub fn update_position(
        &self,
        id: &PlayerId,
        x: i32,
        y: i32,
    ) -> Result<PositionUpdate, RegistryError> {
        let mut roster = self.roster.write();

        let player = roster.get_mut(id)?;
        player.x = x;
        player.y = y;
        let bond_partner = player.bond_partner.clone();

        let others: Vec<PlayerSnapshot> = roster
            .iter()
            .filter(|p| &p.id != id)
            .map(|p| PlayerSnapshot::observe(p, id))
            .collect();

        trace!(player_id = %id, x, y, visible = others.len(), "Position updated");

        Ok(PositionUpdate {
            others,
            bond_partner,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_moves_player_and_lists_others() {
        let registry = PlayerRegistry::new();
        let a = registry.join().unwrap();
        let b = registry.join().unwrap();
        registry.set_loadout(&b, "Capipepo").unwrap();

        let update = registry.update_position(&a, 40, 12).unwrap();

        assert_eq!(update.bond_partner, None);
        assert_eq!(update.others.len(), 1);
        assert_eq!(update.others[0].id, b);
        assert_eq!(update.others[0].loadout, Some(LoadoutName::Capipepo));
        assert_eq!(update.others[0].x, -1);

        let stored = registry.get(&a).unwrap();
        assert_eq!((stored.x, stored.y), (40, 12));
    }

    #[test]
    fn repeated_update_is_idempotent() {
        let registry = PlayerRegistry::new();
        let a = registry.join().unwrap();
        registry.join().unwrap();

        let first = registry.update_position(&a, 5, 5).unwrap();
        let second = registry.update_position(&a, 5, 5).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn third_party_bond_is_not_revealed() {
        let registry = PlayerRegistry::new();
        let viewer = registry.join().unwrap();
        let b = registry.join().unwrap();
        let c = registry.join().unwrap();
        registry.bond(&b, &c).unwrap();

        let update = registry.update_position(&viewer, 0, 0).unwrap();

        assert!(update.others.iter().all(|s| s.in_battle));
        assert!(update.others.iter().all(|s| !s.bonded_to_viewer));

        let seen_by_b = registry.update_position(&b, 0, 0).unwrap();
        assert_eq!(seen_by_b.bond_partner, Some(c.clone()));
        let c_view = seen_by_b.others.iter().find(|s| s.id == c).unwrap();
        assert!(c_view.bonded_to_viewer);
    }

    #[test]
    fn unknown_player_cannot_move() {
        let registry = PlayerRegistry::new();
        let ghost = PlayerId::new("ghost");

        assert_eq!(
            registry.update_position(&ghost, 1, 1),
            Err(RegistryError::NotFound(ghost))
        );
    }
}
