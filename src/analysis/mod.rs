//! Growth analytics over follower snapshots.
//!
//! Everything here is pure and synchronous: callers fetch and order the
//! snapshots, these functions only compute.

pub mod growth;
pub mod ranking;
pub mod window;

pub use growth::{compute_growth_metrics, ROLLING_WINDOW_DAYS};
pub use ranking::compute_comparison;
pub use window::nearest_at_or_before;
