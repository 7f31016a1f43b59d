//! Shardline Engine library.
//!
//! The shard server: owns a slice of the world graph and moves players
//! between its maps, or hands them to the server owning their next one.
//!
//! ## Structure
//!
//! - `routing/` - Membership routers per scope and broadcast groups
//! - `session/` - Connected players and their movement state
//! - `use_cases/` - Transitions, handoffs, joining and leaving
//! - `infrastructure/` - Ports and their adapters (world file, gateway, clock)
//! - `api/` - HTTP and WebSocket entry points
//! - `app` - Application composition

pub mod api;
pub mod app;
pub mod infrastructure;
pub mod routing;
pub mod session;
pub mod stores;
pub mod use_cases;

/// Fixtures shared by the unit tests.
#[cfg(test)]
pub mod test_fixtures;

pub use app::{App, Ports};
