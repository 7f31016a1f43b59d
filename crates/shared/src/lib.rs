//! Shardline Protocol - wire types shared by shard servers and their clients
//!
//! - WebSocket message types (ClientMessage, ServerMessage)
//! - Gateway account-transfer DTOs
//!
//! Pure data types and serialization. Vocabulary types (Location, SyncId, ...)
//! come from `shardline-domain`.

pub mod gateway;
pub mod messages;

pub use gateway::{TransferAccountRequest, TransferAccountResponse};
pub use messages::{error_codes, ClientMessage, LeaveMapRequest, Occupant, ServerMessage};
