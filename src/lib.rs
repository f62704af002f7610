//! Licensy - license entitlement engine for Discord guilds
//!
//! Architecture:
//! - SeaORM for storage (SQLite), schema in the `migration` crate
//! - Services in [`sv`] implementing the entitlement operations
//! - Ports in [`port`] isolating the platform, Discord REST by default
//! - Plugins in [`plugins`] running the sweep scheduler and HTTP bridge

pub mod cache;
pub mod config;
pub mod entity;
pub mod error;
pub mod keygen;
pub mod lock;
pub mod plugins;
pub mod port;
pub mod prelude;
pub mod state;
pub mod sv;
pub mod utils;
