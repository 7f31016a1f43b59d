//! Ephemeral in-memory stores.

mod pending_arrivals;

pub use pending_arrivals::PendingArrivals;
