//! Client side of the arena: local movement, peer tracking and the
//! request/response loop that keeps a player in sync with the server

pub mod movement;
pub mod peers;
pub mod session;
pub mod sync;
pub mod transport;

pub use movement::{Avatar, BoundingBox, Heading, MapBounds, AVATAR_SIZE, SPEED_UNIT};
pub use peers::{Peer, PeerTable};
pub use session::{Battle, BattleStage, ClientSession, Command, Epoch, Notice, Phase};
pub use sync::{Input, SyncLoop};
pub use transport::{ApiClient, ClientError};
