//! Purpose: Host-side layer over the temporalz engine: Temporal value types behind an FFI.
//! Exports: `core` (boundary protocol, engine trait, wasm runtime), `api` (value objects).
//! Role: Library backing the `temporalz` CLI and any embedding host.
//! Invariants: All engine access goes through `core::engine::Engine`; `api` never touches
//! raw memory directly.
pub mod api;
pub mod core;
