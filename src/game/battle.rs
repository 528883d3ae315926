//! Battle coordination - pairwise bonds and submitted move sequences
//!
//! A bond is not stored on its own; it is the pair of `bond_partner`
//! fields pointing at each other. Teardown is one-sided: `unbond` only
//! clears the caller, and each side is expected to end its own battle.
//! Nothing here notices a partner that disconnects mid-battle.

use tracing::{info, warn};

use super::attack::{Attack, MOVES_PER_BATTLE};
use super::registry::{PlayerId, PlayerRegistry, RegistryError};

impl PlayerRegistry {
    /// Bond two players into a battle.
    ///
    /// Re-bonding a pair that is already bonded to each other is a no-op, so
    /// a collision check firing every tick is harmless.
    pub fn bond(&self, a: &PlayerId, b: &PlayerId) -> Result<(), RegistryError> {
        let mut roster = self.roster.write();

        let player_a = roster.get(a)?;
        let player_b = roster.get(b)?;

        if a == b {
            return Err(RegistryError::InvalidState("cannot battle yourself"));
        }

        if player_a.bond_partner.as_ref() == Some(b) && player_b.bond_partner.as_ref() == Some(a) {
            return Ok(());
        }

        for (player, wanted) in [(player_a, b), (player_b, a)] {
            if let Some(partner) = &player.bond_partner {
                if partner != wanted {
                    return Err(RegistryError::Conflict {
                        player: player.id.clone(),
                        partner: partner.clone(),
                    });
                }
            }
        }

        for (id, partner) in [(a, b), (b, a)] {
            let player = roster.get_mut(id)?;
            player.bond_partner = Some(partner.clone());
            player.submitted_moves.clear();
        }

        info!(player_a = %a, player_b = %b, "Battle started");
        Ok(())
    }

    /// Store a bonded player's move sequence.
    ///
    /// The sequence replaces whatever was stored until it reaches the full
    /// length, after which it is frozen until the battle ends.
    pub fn submit_moves(&self, id: &PlayerId, moves: Vec<Attack>) -> Result<(), RegistryError> {
        let mut roster = self.roster.write();
        let player = roster.get_mut(id)?;

        if !player.is_bonded() {
            return Err(RegistryError::InvalidState("not in a battle"));
        }
        if moves.is_empty() {
            return Err(RegistryError::InvalidState("no attacks submitted"));
        }
        if moves.len() > MOVES_PER_BATTLE {
            return Err(RegistryError::InvalidState("too many attacks"));
        }
        if player.moves_frozen() {
            warn!(player_id = %id, "Attacks already locked in");
            return Err(RegistryError::InvalidState("attacks already submitted"));
        }

        player.submitted_moves = moves;
        info!(
            player_id = %id,
            count = player.submitted_moves.len(),
            locked = player.moves_frozen(),
            "Attacks submitted"
        );
        Ok(())
    }

    /// Read a player's submitted moves
    pub fn peek_moves(&self, id: &PlayerId) -> Result<Vec<Attack>, RegistryError> {
        Ok(self.roster.read().get(id)?.submitted_moves.clone())
    }

    /// Leave the current battle. The partner keeps its own bond until it
    /// ends the battle itself.
    pub fn unbond(&self, id: &PlayerId) -> Result<(), RegistryError> {
        let mut roster = self.roster.write();
        let player = roster.get_mut(id)?;

        let partner = player.bond_partner.take();
        player.submitted_moves.clear();

        if let Some(partner) = partner {
            info!(player_id = %id, partner_id = %partner, "Battle ended");
        }
        Ok(())
    }
}
