//! Movement interpolation state of a player.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::geometry::ScreenPoint;

/// Tracks the path a player is currently walking.
///
/// Path-finding and interpolation happen client side; the server only keeps
/// the last accepted path so it can relay it and clear it on map changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovementComposer {
    path: Vec<ScreenPoint>,
    moving: bool,
}

impl MovementComposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a new path. The path must hold at least one point.
    pub fn set_path(&mut self, path: Vec<ScreenPoint>, moving: bool) -> Result<(), DomainError> {
        if path.is_empty() {
            return Err(DomainError::validation("movement path is empty"));
        }
        self.path = path;
        self.moving = moving;
        Ok(())
    }

    /// Drop any in-flight movement.
    pub fn reset(&mut self) {
        self.path.clear();
        self.moving = false;
    }

    pub fn is_idle(&self) -> bool {
        !self.moving && self.path.is_empty()
    }

    pub fn path(&self) -> &[ScreenPoint] {
        &self.path
    }

    /// Final point of the current path.
    pub fn destination(&self) -> Option<ScreenPoint> {
        self.path.last().copied()
    }
}
