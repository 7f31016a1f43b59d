//! Testability ports for injecting time and identifiers.

use chrono::{DateTime, Utc};
use shardline_domain::HandoffId;

// =============================================================================
// Testability Ports
// =============================================================================

#[cfg_attr(test, mockall::automock)]
pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Source of ids that would otherwise come from process-wide counters.
#[cfg_attr(test, mockall::automock)]
pub trait IdGenerator: Send + Sync {
    fn next_handoff_id(&self) -> HandoffId;
}
