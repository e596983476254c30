//! Routing service adapters for the Wayline engine.
//!
//! Responsibilities:
//! - Implement [`wayline_core::Router`] against external routing services.
//! - Translate service payloads into core [`wayline_core::Route`]s.
//! - Map transport and service failures onto [`wayline_core::ResultCode`]s.
//!
//! Boundaries:
//! - Do not encode route-following rules (live in `wayline-core`).
//! - Keep HTTP off the caller's thread; completions arrive via callbacks.
//!
//! Invariants:
//! - Every build reports exactly once unless it is cancelled.
//! - No global mutable state.

pub mod routing;
