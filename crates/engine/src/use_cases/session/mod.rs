//! Session use cases.
//!
//! Orchestrates session-level flows (joining, leaving).

use std::sync::Arc;

mod join_game;
mod leave_game;

pub use join_game::{JoinGame, JoinGameError, JoinedPlayer};
pub use leave_game::LeaveGame;

/// Container for session use cases.
pub struct SessionUseCases {
    pub join_game: Arc<JoinGame>,
    pub leave_game: Arc<LeaveGame>,
}

impl SessionUseCases {
    pub fn new(join_game: Arc<JoinGame>, leave_game: Arc<LeaveGame>) -> Self {
        Self {
            join_game,
            leave_game,
        }
    }
}
