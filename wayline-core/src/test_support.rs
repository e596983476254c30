//! Test doubles for the [`Router`] capability used by unit, behaviour and
//! property tests.
//!
//! `StubRouter` answers synchronously with a configured outcome.
//! `DeferredRouter` queues every request so a test can complete builds later
//! and in any order.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use geo::Coord;

use crate::{ResultCode, Route, RouteReadyCallback, Router, TravelProfile};

/// Calls observed by a test router.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouterLog {
    /// Destinations passed to `set_destination`, in call order.
    pub destinations: Vec<Coord<f64>>,
    /// Start points passed to `calculate_route`, in call order.
    pub starts: Vec<Coord<f64>>,
    /// Number of `cancel` calls.
    pub cancels: usize,
    /// Number of `clear_cached_state` calls.
    pub clears: usize,
}

/// Shared handle onto a router's [`RouterLog`], kept by the test after the
/// router moves into a session.
#[derive(Debug, Clone, Default)]
pub struct RouterProbe(Arc<Mutex<RouterLog>>);

impl RouterProbe {
    /// Copy of the calls recorded so far.
    pub fn snapshot(&self) -> RouterLog {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, RouterLog> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, update: impl FnOnce(&mut RouterLog)) {
        update(&mut self.lock());
    }
}

#[derive(Debug, Clone)]
enum StubOutcome {
    Route(Route),
    Failure(ResultCode),
}

/// Router that reports a fixed outcome before `calculate_route` returns.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use wayline_core::test_support::StubRouter;
/// use wayline_core::{ResultCode, Route, Router};
///
/// let mut router = StubRouter::failing(ResultCode::NoRoute);
/// let probe = router.probe();
/// router.calculate_route(
///     Coord { x: 0.0, y: 0.0 },
///     Box::new(|route: Route, code: ResultCode| {
///         assert!(!route.is_valid());
///         assert_eq!(code, ResultCode::NoRoute);
///     }),
/// );
/// assert_eq!(probe.snapshot().starts.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct StubRouter {
    name: String,
    profile: TravelProfile,
    outcome: StubOutcome,
    probe: RouterProbe,
}

impl StubRouter {
    /// Router that always returns a copy of `route`.
    pub fn succeeding(route: Route) -> Self {
        Self {
            name: route.name().to_owned(),
            profile: TravelProfile::Car,
            outcome: StubOutcome::Route(route),
            probe: RouterProbe::default(),
        }
    }

    /// Router that always fails with `code`.
    pub fn failing(code: ResultCode) -> Self {
        Self {
            name: "stub".to_owned(),
            profile: TravelProfile::Car,
            outcome: StubOutcome::Failure(code),
            probe: RouterProbe::default(),
        }
    }

    /// Override the travel profile.
    #[must_use]
    pub fn with_profile(mut self, profile: TravelProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Handle onto the calls this router receives.
    pub fn probe(&self) -> RouterProbe {
        self.probe.clone()
    }
}

impl Router for StubRouter {
    fn name(&self) -> &str {
        &self.name
    }

    fn profile(&self) -> TravelProfile {
        self.profile
    }

    fn set_destination(&mut self, point: Coord<f64>) {
        self.probe.record(|log| log.destinations.push(point));
    }

    fn calculate_route(&mut self, start: Coord<f64>, on_ready: RouteReadyCallback) {
        self.probe.record(|log| log.starts.push(start));
        match &self.outcome {
            StubOutcome::Route(route) => on_ready(route.clone(), ResultCode::NoError),
            StubOutcome::Failure(code) => on_ready(Route::empty(self.name.as_str()), *code),
        }
    }

    fn cancel(&mut self) {
        self.probe.record(|log| log.cancels += 1);
    }

    fn clear_cached_state(&mut self) {
        self.probe.record(|log| log.clears += 1);
    }
}

/// Queue of build callbacks held back by a [`DeferredRouter`].
#[derive(Clone, Default)]
pub struct DeferredBuilds(Arc<Mutex<Vec<Option<RouteReadyCallback>>>>);

impl fmt::Debug for DeferredBuilds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredBuilds")
            .field("requested", &self.requested())
            .finish()
    }
}

impl DeferredBuilds {
    /// Number of builds requested so far, completed or not.
    pub fn requested(&self) -> usize {
        self.lock().len()
    }

    /// Complete the `index`th requested build.
    ///
    /// Returns `false` when no such build exists or it already completed.
    pub fn complete(&self, index: usize, route: Route, code: ResultCode) -> bool {
        let callback = self.lock().get_mut(index).and_then(Option::take);
        callback.is_some_and(|on_ready| {
            on_ready(route, code);
            true
        })
    }

    fn push(&self, on_ready: RouteReadyCallback) {
        self.lock().push(Some(on_ready));
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Option<RouteReadyCallback>>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Router that never answers on its own; see [`DeferredBuilds::complete`].
#[derive(Debug, Clone, Default)]
pub struct DeferredRouter {
    builds: DeferredBuilds,
    probe: RouterProbe,
}

impl DeferredRouter {
    /// Handle used to complete queued builds.
    pub fn builds(&self) -> DeferredBuilds {
        self.builds.clone()
    }

    /// Handle onto the calls this router receives.
    pub fn probe(&self) -> RouterProbe {
        self.probe.clone()
    }
}

impl Router for DeferredRouter {
    fn name(&self) -> &str {
        "deferred"
    }

    fn profile(&self) -> TravelProfile {
        TravelProfile::Car
    }

    fn set_destination(&mut self, point: Coord<f64>) {
        self.probe.record(|log| log.destinations.push(point));
    }

    fn calculate_route(&mut self, start: Coord<f64>, on_ready: RouteReadyCallback) {
        self.probe.record(|log| log.starts.push(start));
        self.builds.push(on_ready);
    }

    fn cancel(&mut self) {
        self.probe.record(|log| log.cancels += 1);
    }

    fn clear_cached_state(&mut self) {
        self.probe.record(|log| log.clears += 1);
    }
}

/// Straight route along the x axis through `xs`, named `"car"`.
///
/// # Panics
///
/// Panics when `xs` is empty or holds non-finite values.
pub fn straight_route(xs: &[f64]) -> Route {
    Route::new(
        "car",
        xs.iter().map(|&x| Coord { x, y: 0.0 }).collect(),
        Vec::new(),
        Vec::new(),
    )
    .expect("straight route inputs are valid")
}
