//! Use cases - User story orchestration.
//!
//! Each module contains use cases for a specific domain area.

pub mod movement;
pub mod session;

pub use movement::MovementUseCases;
pub use session::SessionUseCases;
