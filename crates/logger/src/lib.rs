//! Tracing bootstrap shared by the netmon binaries.

mod subscriber;

pub use subscriber::{init_tracing, init_tracing_with};
