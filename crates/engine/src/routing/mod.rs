//! Membership routers: who is present in which scope, and broadcast to them.

mod membership_router;
mod registry;

pub use membership_router::MembershipRouter;
pub use registry::{BroadcastGroup, RouterRegistry};
