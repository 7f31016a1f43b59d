//! Connected players.

mod player;

pub use player::{
    PlayerHandle, PlayerPlacement, PlayerSession, PlayerState, PositionSnapshot, Presence,
    TransitionGuard,
};
