//! Route-following session: build coordination and off-route detection.
//!
//! [`RoutingSession`] owns the active [`Route`] and the installed
//! [`Router`]. Route builds complete through a channel that only the owning
//! thread drains, so the session itself needs no locking. Each build is
//! tagged with a generation number; completions from superseded builds are
//! dropped without reaching the caller.
//!
//! # Example
//!
//! ```
//! use geo::Coord;
//! use wayline_core::test_support::StubRouter;
//! use wayline_core::{LocationFix, ResultCode, Route, RoutingSession, SessionConfig, SessionState};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let route = Route::new(
//!     "car",
//!     vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 500.0, y: 0.0 }],
//!     Vec::new(),
//!     Vec::new(),
//! )?;
//! let mut session = RoutingSession::new(SessionConfig::default());
//! session.set_router(Box::new(StubRouter::succeeding(route)));
//! session.build_route(
//!     Coord { x: 0.0, y: 0.0 },
//!     Coord { x: 500.0, y: 0.0 },
//!     |_, code| assert_eq!(code, ResultCode::NoError),
//! )?;
//! assert_eq!(session.state(), SessionState::NotStarted);
//!
//! let fix = LocationFix::new(0.0, Coord { x: 100.0, y: 2.0 }, 10.0);
//! assert_eq!(session.on_location_position_changed(&fix), SessionState::OnRoute);
//! assert_eq!(session.route_following_info()?.distance_to_target, "400");
//! # Ok(())
//! # }
//! ```

mod config;
mod error;

pub use config::{DEFAULT_DISTANCE_TOLERANCE_ULPS, DEFAULT_MOVE_AWAY_THRESHOLD, SessionConfig};
pub use error::SessionError;

use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};

use camino::Utf8Path;
use geo::Coord;
use log::{debug, info, warn};

use crate::{
    DistanceFormatter, FollowingInfo, LocationFix, MeasurementFormatter, ResultCode, Route, Router,
};
use config::almost_equal_ulps;

/// File extension of per-profile routing data.
pub const ROUTING_DATA_EXTENSION: &str = "routing";

/// Lifecycle state of a [`RoutingSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum SessionState {
    /// No route requested.
    #[default]
    Inactive,
    /// Waiting for the router.
    Building,
    /// The last build failed and no usable route exists.
    NotReady,
    /// A route is ready and no fix has matched it yet.
    NotStarted,
    /// Fixes are matching the route.
    OnRoute,
    /// The agent drifted away; the caller should rebuild.
    NeedRebuild,
    /// The destination was reached.
    Finished,
}

impl SessionState {
    /// Return the state as a `snake_case` `&str`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Building => "building",
            Self::NotReady => "not_ready",
            Self::NotStarted => "not_started",
            Self::OnRoute => "on_route",
            Self::NeedRebuild => "need_rebuild",
            Self::Finished => "finished",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the file removal step of [`RoutingSession::delete_routing_data`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataRemoval {
    /// The routing file was deleted.
    Removed,
    /// No routing file existed.
    Absent,
    /// Removal failed; the failure was logged.
    Failed,
}

/// Caller notification for a finished build, run on the owning thread.
pub type ReadyCallback = Box<dyn FnOnce(&Route, ResultCode)>;

struct PendingBuild {
    generation: u64,
    on_ready: ReadyCallback,
}

struct BuildCompletion {
    generation: u64,
    route: Route,
    code: ResultCode,
}

/// Tracks progress along a route and decides when to rebuild it.
pub struct RoutingSession {
    router: Option<Box<dyn Router>>,
    route: Route,
    state: SessionState,
    move_away_counter: u32,
    last_distance: f64,
    generation: u64,
    pending: Option<PendingBuild>,
    completions_tx: Sender<BuildCompletion>,
    completions_rx: Receiver<BuildCompletion>,
    config: SessionConfig,
    formatter: Box<dyn DistanceFormatter>,
}

impl Default for RoutingSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl fmt::Debug for RoutingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingSession")
            .field("router", &self.router.as_ref().map(|router| router.name()))
            .field("route", &self.route.name())
            .field("state", &self.state)
            .field("move_away_counter", &self.move_away_counter)
            .field("last_distance", &self.last_distance)
            .field("generation", &self.generation)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Drop for RoutingSession {
    fn drop(&mut self) {
        if self.pending.is_some()
            && let Some(router) = self.router.as_mut()
        {
            router.cancel();
        }
    }
}

impl RoutingSession {
    /// Create an inactive session with metric distance formatting.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        let (completions_tx, completions_rx) = mpsc::channel();
        Self {
            router: None,
            route: Route::default(),
            state: SessionState::Inactive,
            move_away_counter: 0,
            last_distance: 0.0,
            generation: 0,
            pending: None,
            completions_tx,
            completions_rx,
            config,
            formatter: Box::new(MeasurementFormatter::default()),
        }
    }

    /// Replace the distance formatter.
    #[must_use]
    pub fn with_formatter(mut self, formatter: impl DistanceFormatter + 'static) -> Self {
        self.formatter = Box::new(formatter);
        self
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Whether a route has been requested since the last reset.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self.state, SessionState::Inactive)
    }

    /// The active route; invalid while none is adopted.
    #[must_use]
    pub const fn route(&self) -> &Route {
        &self.route
    }

    /// The installed router, if any.
    #[must_use]
    pub fn router(&self) -> Option<&dyn Router> {
        self.router.as_deref()
    }

    /// Consecutive qualifying misses recorded so far.
    #[must_use]
    pub const fn missed_fixes(&self) -> u32 {
        self.move_away_counter
    }

    /// Squared distance recorded by the last qualifying miss.
    #[must_use]
    pub const fn last_sq_distance(&self) -> f64 {
        self.last_distance
    }

    /// Session configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Install `router`, discarding any in-flight build and the current route.
    pub fn set_router(&mut self, router: Box<dyn Router>) {
        self.reset();
        info!(
            "router '{}' installed for {} routing",
            router.name(),
            router.profile()
        );
        self.router = Some(router);
    }

    /// Return to the inactive state, keeping the router.
    ///
    /// Any in-flight build is abandoned: the router is asked to cancel and
    /// a late completion will be ignored.
    pub fn reset(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.pending = None;
        if let Some(router) = self.router.as_mut() {
            router.cancel();
        }
        self.route = Route::default();
        self.state = SessionState::Inactive;
        self.move_away_counter = 0;
        self.last_distance = 0.0;
    }

    /// Set the destination and build a route to it from `start`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::RouterNotSet`] without touching the session
    /// when no router is installed.
    pub fn build_route(
        &mut self,
        start: Coord<f64>,
        end: Coord<f64>,
        on_ready: impl FnOnce(&Route, ResultCode) + 'static,
    ) -> Result<(), SessionError> {
        let router = self.router.as_mut().ok_or(SessionError::RouterNotSet)?;
        router.set_destination(end);
        self.rebuild_route(start, on_ready)
    }

    /// Discard the current route and build a new one from `start` to the
    /// destination already known to the router.
    ///
    /// `on_ready` runs once the build completes, from this method if the
    /// router answers synchronously or from a later
    /// [`poll_build_results`](Self::poll_build_results). It never runs if the
    /// build is superseded by a reset or another rebuild.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::RouterNotSet`] when no router is installed.
    pub fn rebuild_route(
        &mut self,
        start: Coord<f64>,
        on_ready: impl FnOnce(&Route, ResultCode) + 'static,
    ) -> Result<(), SessionError> {
        if self.router.is_none() {
            return Err(SessionError::RouterNotSet);
        }
        self.reset();
        self.state = SessionState::Building;
        let generation = self.generation;
        self.pending = Some(PendingBuild {
            generation,
            on_ready: Box::new(on_ready),
        });

        let sender = self.completions_tx.clone();
        let router = self.router.as_mut().ok_or(SessionError::RouterNotSet)?;
        debug!("requesting route build {generation} from '{}'", router.name());
        router.calculate_route(
            start,
            Box::new(move |route: Route, code: ResultCode| {
                if sender
                    .send(BuildCompletion {
                        generation,
                        route,
                        code,
                    })
                    .is_err()
                {
                    debug!("route build {generation} finished after its session was dropped");
                }
            }),
        );
        self.poll_build_results();
        Ok(())
    }

    /// Apply finished builds, returning the code of the one adopted, if any.
    ///
    /// Called automatically by [`rebuild_route`](Self::rebuild_route) and
    /// [`on_location_position_changed`](Self::on_location_position_changed);
    /// callers with asynchronous routers may also call it from their event
    /// loop.
    pub fn poll_build_results(&mut self) -> Option<ResultCode> {
        let mut applied = None;
        while let Ok(completion) = self.completions_rx.try_recv() {
            if let Some(code) = self.apply_completion(completion) {
                applied = Some(code);
            }
        }
        applied
    }

    fn apply_completion(&mut self, completion: BuildCompletion) -> Option<ResultCode> {
        let BuildCompletion {
            generation,
            route,
            code,
        } = completion;
        let Some(pending) = self
            .pending
            .take_if(|pending| pending.generation == generation)
        else {
            debug!("discarding stale route build {generation} ({code})");
            return None;
        };

        let code = if code.is_success() && !route.is_valid() {
            warn!("router reported success for build {generation} without a usable route");
            ResultCode::InternalError
        } else {
            code
        };

        if code.is_success() {
            info!(
                "route '{}' ready: {:.0} m",
                route.name(),
                route.total_length()
            );
            self.route = route;
            self.state = SessionState::NotStarted;
        } else {
            warn!("route build {generation} failed: {code}");
            self.route = Route::empty(route.name());
            self.state = SessionState::NotReady;
        }
        self.move_away_counter = 0;
        self.last_distance = 0.0;
        (pending.on_ready)(&self.route, code);
        Some(code)
    }

    /// Feed a location fix and return the resulting state.
    pub fn on_location_position_changed(&mut self, fix: &LocationFix) -> SessionState {
        self.poll_build_results();
        match self.state {
            SessionState::Inactive => {
                debug!("location fix at {} ignored: no route requested", fix.timestamp);
            }
            SessionState::Building | SessionState::NeedRebuild | SessionState::Finished => {}
            SessionState::NotReady => {
                self.move_away_counter = self.move_away_counter.saturating_add(1);
                self.escalate_if_moved_away();
            }
            SessionState::NotStarted | SessionState::OnRoute => self.track(fix),
        }
        self.state
    }

    fn track(&mut self, fix: &LocationFix) {
        if self.route.advance(fix) {
            self.move_away_counter = 0;
            self.last_distance = 0.0;
            self.state = if self.route.is_current_on_end() {
                info!("destination of route '{}' reached", self.route.name());
                SessionState::Finished
            } else {
                SessionState::OnRoute
            };
            return;
        }

        let distance = self.route.current_sq_distance(fix.position);
        if distance > self.last_distance
            || almost_equal_ulps(
                distance,
                self.last_distance,
                self.config.distance_tolerance_ulps,
            )
        {
            self.move_away_counter = self.move_away_counter.saturating_add(1);
            self.last_distance = distance;
        } else {
            self.move_away_counter = 0;
            self.last_distance = 0.0;
        }
        self.escalate_if_moved_away();
    }

    fn escalate_if_moved_away(&mut self) {
        if self.move_away_counter > self.config.move_away_threshold {
            info!(
                "{} consecutive fixes away from the route; rebuild needed",
                self.move_away_counter
            );
            self.state = SessionState::NeedRebuild;
        }
    }

    /// Formatted progress along the active route.
    ///
    /// Returns [`FollowingInfo::default`] while no usable route exists.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Format`] when the formatter output lacks the
    /// `"<value> <unit>"` shape.
    pub fn route_following_info(&self) -> Result<FollowingInfo, SessionError> {
        if !self.route.is_valid() {
            return Ok(FollowingInfo::default());
        }
        let target = self
            .formatter
            .format_split(self.route.current_distance_to_end())?;
        let (turn_distance, turn) = self.route.turn();
        let to_turn = self.formatter.format_split(turn_distance)?;
        Ok(FollowingInfo {
            distance_to_target: target.value,
            target_units_suffix: target.suffix,
            distance_to_turn: to_turn.value,
            turn_units_suffix: to_turn.suffix,
            turn: turn.direction,
            exit_num: turn.exit_num,
            time: self.route.time(),
        })
    }

    /// Reset, clear the router's cached state and delete
    /// `<data_dir>/<profile_id>.routing`.
    ///
    /// File removal is best effort: its outcome is reported, never raised.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::RouterNotSet`] when no router is installed and
    /// [`SessionError::InvalidProfileId`] when `profile_id` is not a bare
    /// file name. The session is left untouched in both cases.
    pub fn delete_routing_data(&mut self, profile_id: &str) -> Result<DataRemoval, SessionError> {
        if self.router.is_none() {
            return Err(SessionError::RouterNotSet);
        }
        if !is_bare_file_name(profile_id) {
            return Err(SessionError::InvalidProfileId {
                profile_id: profile_id.to_owned(),
            });
        }

        self.reset();
        if let Some(router) = self.router.as_mut() {
            router.clear_cached_state();
        }

        let path = self
            .config
            .data_dir
            .join(format!("{profile_id}.{ROUTING_DATA_EXTENSION}"));
        match wayline_fs::remove_file_if_exists(&path) {
            Ok(true) => {
                info!("removed routing data {path}");
                Ok(DataRemoval::Removed)
            }
            Ok(false) => {
                debug!("no routing data at {path}");
                Ok(DataRemoval::Absent)
            }
            Err(err) => {
                warn!("failed to remove routing data {path}: {err}");
                Ok(DataRemoval::Failed)
            }
        }
    }
}

fn is_bare_file_name(candidate: &str) -> bool {
    !candidate.is_empty() && Utf8Path::new(candidate).file_name() == Some(candidate)
}

#[cfg(test)]
mod tests;
