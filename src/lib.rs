//! Facade crate for the Wayline route-following engine.
//!
//! This crate re-exports the core domain types and exposes the OSRM-backed
//! router behind the `osrm` feature flag.

#![forbid(unsafe_code)]

pub use wayline_core::{
    DataRemoval, DistanceFormatError, DistanceFormatter, FollowingInfo, FormattedDistance,
    LocalProjection, LocationFix, MeasurementFormatter, MeasurementSystem, ResultCode, Route,
    RouteError, RouteReadyCallback, Router, RoutingSession, SessionConfig, SessionError,
    SessionState, TimeMark, TravelProfile, TurnDirection, TurnItem,
};

#[cfg(feature = "osrm")]
pub use wayline_data::routing::{OsrmRouter, OsrmRouterConfig, RouterBuildError};
