//! Arena game core - attack catalog, registry, visibility, battles

pub mod attack;
pub mod battle;
pub mod combat;
pub mod registry;
pub mod visibility;

pub use attack::{Attack, Dominance, Loadout, LoadoutName, MOVES_PER_BATTLE};
pub use combat::{resolve_battle, BattleResult, ResolveError, Verdict};
pub use registry::{
    BattleState, IdSource, NumericIds, Player, PlayerId, PlayerRegistry, RegistryError, UuidIds,
};
pub use visibility::{PlayerSnapshot, PositionUpdate};
