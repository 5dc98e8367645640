// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod config;
pub mod display;
pub mod judge;
pub mod runtime;
pub mod session;

/// Interval between countdown ticks.
pub const TICK_INTERVAL_MS: u64 = 1000;
