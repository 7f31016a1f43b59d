//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - World data access (could swap the JSON file for a map service)
//! - Account transfer between servers
//! - Encounter memory
//! - Clock/ids (for testing)

mod error;
mod external;
mod testing;
mod world;

// =============================================================================
// World Directory Port
// =============================================================================
pub use world::{ResolvedMap, WorldDirectory};

// =============================================================================
// External Service Ports
// =============================================================================
pub use external::{EncounterMemoryPort, GatewayPort};

// =============================================================================
// Testing Ports
// =============================================================================
pub use testing::{ClockPort, IdGenerator};

// =============================================================================
// Test-Only Mocks (only available during test builds)
// =============================================================================
#[cfg(test)]
pub use external::{MockEncounterMemoryPort, MockGatewayPort};
#[cfg(test)]
pub use testing::{MockClockPort, MockIdGenerator};
#[cfg(test)]
pub use world::MockWorldDirectory;

// =============================================================================
// Error Types
// =============================================================================
pub use error::{ConnectionError, GatewayError, RepoError};
