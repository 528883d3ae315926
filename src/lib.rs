//! Mokepon Arena - authoritative session server and sync client
//!
//! Players roam a shared 2D map; walking into another player bonds the two
//! into a simultaneous-choice battle resolved from the attacks each submits.
//! - `game`: attack catalog, player registry, visibility, battles, resolver
//! - `http`: the REST surface over the registry
//! - `client`: movement, collision and the polling loop that drives a player

pub mod app;
pub mod client;
pub mod config;
pub mod game;
pub mod http;
pub mod protocol;
pub mod util;
