//! Application state shared across routes

use std::sync::Arc;

use crate::config::{Config, IdStyle};
use crate::game::{NumericIds, PlayerRegistry, UuidIds};
use crate::util::rate_limit::{create_limiter, Limiter};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<PlayerRegistry>,
    pub join_limiter: Arc<Limiter>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let registry = match config.id_style {
            IdStyle::Uuid => PlayerRegistry::with_id_source(UuidIds),
            IdStyle::Numeric => PlayerRegistry::with_id_source(NumericIds),
        };
        let join_limiter = create_limiter(config.join_rate_limit);

        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            join_limiter,
        }
    }
}
