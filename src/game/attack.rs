//! Attack catalog - move kinds, dominance and loadout templates

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of moves in every loadout and in every completed battle sequence
pub const MOVES_PER_BATTLE: usize = 5;

/// A move kind. Ranks are only ever compared, never summed or scaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "AttackRepr", into = "AttackRepr")]
pub enum Attack {
    Fire,
    Water,
    Earth,
}

/// Result of comparing one move against another, from the first move's side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dominance {
    Wins,
    Loses,
    Ties,
}

impl Attack {
    pub const ALL: [Attack; 3] = [Attack::Fire, Attack::Water, Attack::Earth];

    /// Dominance rank, 1..=3
    pub fn rank(self) -> i8 {
        match self {
            Attack::Fire => 1,
            Attack::Water => 2,
            Attack::Earth => 3,
        }
    }

    pub fn kind(self) -> AttackKind {
        match self {
            Attack::Fire => AttackKind::Fire,
            Attack::Water => AttackKind::Water,
            Attack::Earth => AttackKind::Earth,
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Attack::Fire => "🔥",
            Attack::Water => "💧",
            Attack::Earth => "🌵",
        }
    }

    /// Compare against an opponent's move.
    ///
    /// Adjacent ranks favour the higher rank; ranks two apart invert so the
    /// cycle closes: Fire > Earth > Water > Fire.
    pub fn against(self, opponent: Attack) -> Dominance {
        match self.rank() - opponent.rank() {
            0 => Dominance::Ties,
            1 | -2 => Dominance::Wins,
            _ => Dominance::Loses,
        }
    }
}

impl fmt::Display for Attack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Attack::Fire => "fire",
            Attack::Water => "water",
            Attack::Earth => "earth",
        };
        write!(f, "{} {}", self.icon(), label)
    }
}

/// Wire tag for an attack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackKind {
    Fire,
    Water,
    Earth,
}

/// Wire shape of an attack: `{ "type": "water", "icon": "💧", "value": 2 }`.
/// Only `type` is read back; `icon` and `value` are display hints.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AttackRepr {
    #[serde(rename = "type")]
    kind: AttackKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<i8>,
}

impl From<AttackRepr> for Attack {
    fn from(repr: AttackRepr) -> Self {
        match repr.kind {
            AttackKind::Fire => Attack::Fire,
            AttackKind::Water => Attack::Water,
            AttackKind::Earth => Attack::Earth,
        }
    }
}

impl From<Attack> for AttackRepr {
    fn from(attack: Attack) -> Self {
        Self {
            kind: attack.kind(),
            icon: Some(attack.icon().to_string()),
            value: Some(attack.rank()),
        }
    }
}

/// Character archetypes available for selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadoutName {
    Hipodoge,
    Capipepo,
    Ratigueya,
    Langostelvis,
    Tucapalma,
    Pydos,
}

impl LoadoutName {
    pub const ALL: [LoadoutName; 6] = [
        LoadoutName::Hipodoge,
        LoadoutName::Capipepo,
        LoadoutName::Ratigueya,
        LoadoutName::Langostelvis,
        LoadoutName::Tucapalma,
        LoadoutName::Pydos,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LoadoutName::Hipodoge => "Hipodoge",
            LoadoutName::Capipepo => "Capipepo",
            LoadoutName::Ratigueya => "Ratigueya",
            LoadoutName::Langostelvis => "Langostelvis",
            LoadoutName::Tucapalma => "Tucapalma",
            LoadoutName::Pydos => "Pydos",
        }
    }

    /// Case-sensitive lookup by display name
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.as_str() == name)
    }

    /// The immutable move template for this archetype
    pub fn template(self) -> &'static [Attack; MOVES_PER_BATTLE] {
        use Attack::{Earth as E, Fire as F, Water as W};

        match self {
            LoadoutName::Hipodoge => &[W, W, W, F, E],
            LoadoutName::Capipepo => &[E, E, E, F, W],
            LoadoutName::Ratigueya => &[F, F, F, W, E],
            LoadoutName::Langostelvis => &[F, F, W, W, E],
            LoadoutName::Tucapalma => &[E, E, W, W, F],
            LoadoutName::Pydos => &[F, F, E, E, W],
        }
    }
}

impl fmt::Display for LoadoutName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A player's own copy of a loadout template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loadout {
    pub name: LoadoutName,
    pub attacks: Vec<Attack>,
}

impl Loadout {
    /// Deep-copy the template so callers can consume moves freely
    pub fn from_template(name: LoadoutName) -> Self {
        Self {
            name,
            attacks: name.template().to_vec(),
        }
    }
}
