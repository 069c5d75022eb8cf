// Engine location and host-side switches; env-driven defaults match the engine build output.
use std::env;
use std::path::{Path, PathBuf};

pub const WASM_ENV: &str = "TEMPORALZ_WASM";
pub const DEFAULT_WASM_PATH: &str = "zig-out/bin/temporalz.wasm";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EngineConfig {
    wasm_path: PathBuf,
    forward_console: bool,
}

impl EngineConfig {
    pub fn new(wasm_path: impl Into<PathBuf>) -> Self {
        Self {
            wasm_path: wasm_path.into(),
            forward_console: true,
        }
    }

    pub fn from_env() -> Self {
        let path = env::var_os(WASM_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_WASM_PATH));
        Self::new(path)
    }

    /// When false, engine console output is kept in memory but not emitted as tracing events.
    pub fn with_forward_console(mut self, forward_console: bool) -> Self {
        self.forward_console = forward_console;
        self
    }

    pub fn wasm_path(&self) -> &Path {
        &self.wasm_path
    }

    pub fn forward_console(&self) -> bool {
        self.forward_console
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
