//! Core domain types for the Wayline route-following engine.
//!
//! A [`RoutingSession`] owns the active [`Route`], asks a [`Router`] to
//! (re)build it, follows the agent along it as [`LocationFix`]es arrive and
//! reports formatted progress as [`FollowingInfo`]. Constructors validate
//! their input and return `Result` to surface bad data early.

pub mod fix;
pub mod following;
pub mod format;
pub mod projection;
pub mod route;
pub mod router;
pub mod session;

#[doc(hidden)]
pub mod test_support;

pub use fix::LocationFix;
pub use following::FollowingInfo;
pub use format::{
    DistanceFormatError, DistanceFormatter, FormattedDistance, MeasurementFormatter,
    MeasurementSystem,
};
pub use projection::{EARTH_RADIUS_METRES, LocalProjection};
pub use route::{DEFAULT_END_TOLERANCE, Route, RouteError, TimeMark, TurnDirection, TurnItem};
pub use router::{ResultCode, RouteReadyCallback, Router, TravelProfile};
pub use session::{
    DEFAULT_DISTANCE_TOLERANCE_ULPS, DEFAULT_MOVE_AWAY_THRESHOLD, DataRemoval,
    ROUTING_DATA_EXTENSION, ReadyCallback, RoutingSession, SessionConfig, SessionError,
    SessionState,
};
