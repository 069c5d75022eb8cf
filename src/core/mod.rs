// Boundary protocol: codecs, memory staging, error channel, and the engine runtime.
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod handle;
pub mod last_error;
pub mod memory;
pub mod units;
pub mod wasm;
