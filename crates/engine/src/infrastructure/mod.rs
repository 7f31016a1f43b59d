//! Infrastructure layer - ports and their adapters.

pub mod cache;
pub mod clock;
pub mod encounter;
pub mod gateway;
pub mod ports;
pub mod settings;
pub mod world_store;
