//! Local avatar movement, map containment and box collision

use rand::Rng;

/// Distance covered per movement tick on each active axis
pub const SPEED_UNIT: i32 = 5;
/// Side length of every mokepon's square bounding box
pub const AVATAR_SIZE: i32 = 24;

/// Direction held on the keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Heading {
    #[default]
    Stationary,
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Heading {
    pub const MOVING: [Heading; 8] = [
        Heading::North,
        Heading::NorthEast,
        Heading::East,
        Heading::SouthEast,
        Heading::South,
        Heading::SouthWest,
        Heading::West,
        Heading::NorthWest,
    ];

    /// Per-tick velocity; y grows downwards
    pub fn velocity(self) -> Velocity {
        let (dx, dy) = match self {
            Heading::Stationary => (0, 0),
            Heading::North => (0, -1),
            Heading::NorthEast => (1, -1),
            Heading::East => (1, 0),
            Heading::SouthEast => (1, 1),
            Heading::South => (0, 1),
            Heading::SouthWest => (-1, 1),
            Heading::West => (-1, 0),
            Heading::NorthWest => (-1, -1),
        };
        Velocity {
            dx: dx * SPEED_UNIT,
            dy: dy * SPEED_UNIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Velocity {
    pub dx: i32,
    pub dy: i32,
}

/// Axis-aligned box in map coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn square(x: i32, y: i32, size: i32) -> Self {
        Self {
            x,
            y,
            width: size,
            height: size,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Separating-axis test. Shared edges count as contact.
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        !(self.bottom() < other.y
            || self.y > other.bottom()
            || self.right() < other.x
            || self.x > other.right())
    }

    /// Strict overlap: the boxes share interior area
    pub fn interpenetrates(&self, other: &BoundingBox) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// Rectangular playing field anchored at the origin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapBounds {
    pub width: i32,
    pub height: i32,
}

impl MapBounds {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn contains(&self, bbox: &BoundingBox) -> bool {
        bbox.x >= 0 && bbox.y >= 0 && bbox.right() <= self.width && bbox.bottom() <= self.height
    }

    /// A random top-left corner for an avatar that fits on the map
    pub fn random_spawn(&self, rng: &mut impl Rng) -> (i32, i32) {
        let max_x = (self.width - AVATAR_SIZE).max(0);
        let max_y = (self.height - AVATAR_SIZE).max(0);
        (rng.gen_range(0..=max_x), rng.gen_range(0..=max_y))
    }
}

/// The locally controlled mokepon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Avatar {
    pub x: i32,
    pub y: i32,
    pub velocity: Velocity,
}

impl Avatar {
    pub fn at(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            velocity: Velocity::default(),
        }
    }

    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::square(self.x, self.y, AVATAR_SIZE)
    }

    pub fn steer(&mut self, heading: Heading) {
        self.velocity = heading.velocity();
    }

    pub fn stop(&mut self) {
        self.velocity = Velocity::default();
    }

    pub fn is_moving(&self) -> bool {
        self.velocity != Velocity::default()
    }

    fn advance(&mut self) {
        self.x += self.velocity.dx;
        self.y += self.velocity.dy;
    }

    /// Undo the last `advance`
    fn revert(&mut self) {
        self.x -= self.velocity.dx;
        self.y -= self.velocity.dy;
    }

    /// Integrate one movement tick. A move that would leave the map is
    /// undone and the avatar halts. Returns false when blocked.
    pub fn step(&mut self, bounds: &MapBounds) -> bool {
        self.advance();

        if bounds.contains(&self.bbox()) {
            return true;
        }

        self.revert();
        self.stop();
        false
    }

    /// Check contact with another box. On contact the last move is undone
    /// and the avatar halts.
    pub fn collide_with(&mut self, other: &BoundingBox) -> bool {
        if !self.bbox().overlaps(other) {
            return false;
        }

        self.revert();
        self.stop();
        true
    }
}
