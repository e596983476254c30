//! OSRM-backed routers.
//!
//! This module provides [`OsrmRouter`], an implementation of
//! [`wayline_core::Router`] that requests routes from an OSRM service's
//! Route API and converts them into [`wayline_core::Route`]s.
//!
//! # Architecture
//!
//! Each build is one HTTP request spawned on the router's own Tokio
//! runtime. The completion callback runs on that runtime's worker thread,
//! which suits [`wayline_core::RoutingSession`]: it forwards completions
//! over a channel drained by the owning thread.
//!
//! # Example
//!
//! ```no_run
//! use geo::Coord;
//! use wayline_core::{RoutingSession, SessionConfig, TravelProfile};
//! use wayline_data::routing::{OsrmRouter, OsrmRouterConfig};
//! use std::time::Duration;
//!
//! let config = OsrmRouterConfig::new("http://localhost:5000")
//!     .with_timeout(Duration::from_secs(10))
//!     .with_profile(TravelProfile::Bicycle)
//!     .with_origin(Coord { x: -0.1276, y: 51.5072 });
//! let router = OsrmRouter::with_config(config)?;
//!
//! let mut session = RoutingSession::new(SessionConfig::default());
//! session.set_router(Box::new(router));
//! session.build_route(
//!     Coord { x: 0.0, y: 0.0 },
//!     Coord { x: 1_200.0, y: 400.0 },
//!     |route, code| println!("{code}: {} m", route.total_length()),
//! )?;
//!
//! // Later, on the same thread:
//! session.poll_build_results();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod osrm;
mod router;

#[doc(hidden)]
pub mod test_support;

pub use router::{DEFAULT_USER_AGENT, OsrmRouter, OsrmRouterConfig, RouterBuildError};
