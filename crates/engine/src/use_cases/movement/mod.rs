//! Movement use cases.

mod enter_room;
mod insertion_point;
mod leave_map;
mod path_update;
mod remote_handoff;

pub use enter_room::{EnterRoom, EnterRoomError, EnterRoomOutcome};
pub use insertion_point::{InsertionPointResolver, FALLBACK_POINT};
pub use leave_map::{ErrorKind, LeaveMap, LeaveMapError, LeaveMapOutcome};
pub use path_update::{PathUpdate, PathUpdateError, PathUpdateInput};
pub use remote_handoff::{
    HandoffError, HandoffRecord, HandoffStatus, HandoffTarget, RemoteHandoff,
};

use std::sync::Arc;

/// Container for movement use cases.
pub struct MovementUseCases {
    pub leave_map: Arc<LeaveMap>,
    pub enter_room: Arc<EnterRoom>,
    pub path_update: Arc<PathUpdate>,
}

impl MovementUseCases {
    pub fn new(
        leave_map: Arc<LeaveMap>,
        enter_room: Arc<EnterRoom>,
        path_update: Arc<PathUpdate>,
    ) -> Self {
        Self {
            leave_map,
            enter_room,
            path_update,
        }
    }
}
