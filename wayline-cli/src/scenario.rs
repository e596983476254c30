//! Recorded journeys and the router that replays their route.
//!
//! A scenario file is JSON:
//!
//! ```json
//! {
//!   "profile": "pedestrian",
//!   "route": {
//!     "name": "pedestrian",
//!     "points": [{"x": 0.0, "y": 0.0}, {"x": 100.0, "y": 0.0}],
//!     "turns": [{"index": 1, "direction": "reached_your_destination"}],
//!     "times": [{"index": 0, "seconds": 0.0}, {"index": 1, "seconds": 72.0}]
//!   },
//!   "start": {"x": 0.0, "y": 0.0},
//!   "destination": {"x": 100.0, "y": 0.0},
//!   "fixes": [
//!     {"timestamp": 0.0, "position": {"x": 10.0, "y": 1.0}, "horizontal_accuracy": 5.0}
//!   ]
//! }
//! ```
//!
//! `build_result` (a snake-case result code, default `no_error`) makes the
//! replayed build fail instead.

use std::io::BufReader;
use std::time::Duration;

use camino::Utf8Path;
use geo::Coord;
use log::debug;
use serde::Deserialize;
use thiserror::Error;
use wayline_core::{
    LocationFix, ResultCode, Route, RouteError, RouteReadyCallback, Router, TimeMark,
    TravelProfile, TurnItem,
};
use wayline_fs::open_utf8_file;

use crate::CliError;

/// Reasons a scenario route cannot be built.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// A time mark carried a negative or non-finite number of seconds.
    #[error("time mark {position} has invalid seconds {seconds}")]
    InvalidSeconds {
        /// Position of the mark in the list.
        position: usize,
        /// Offending value.
        seconds: f64,
    },
    /// The route failed validation.
    #[error(transparent)]
    Route(#[from] RouteError),
}

/// Recorded journey.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Scenario {
    #[serde(default)]
    pub(crate) profile: TravelProfile,
    pub(crate) route: ScenarioRoute,
    pub(crate) start: Coord<f64>,
    pub(crate) destination: Coord<f64>,
    #[serde(default = "successful_build")]
    pub(crate) build_result: ResultCode,
    #[serde(default)]
    pub(crate) fixes: Vec<LocationFix>,
}

const fn successful_build() -> ResultCode {
    ResultCode::NoError
}

/// Route as stored in a scenario file.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ScenarioRoute {
    #[serde(default)]
    pub(crate) name: String,
    pub(crate) points: Vec<Coord<f64>>,
    #[serde(default)]
    pub(crate) turns: Vec<TurnItem>,
    #[serde(default)]
    pub(crate) times: Vec<ScenarioTimeMark>,
}

/// Elapsed seconds at a polyline point.
#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct ScenarioTimeMark {
    pub(crate) index: usize,
    pub(crate) seconds: f64,
}

impl ScenarioRoute {
    pub(crate) fn into_route(self) -> Result<Route, ScenarioError> {
        let times = self
            .times
            .iter()
            .enumerate()
            .map(|(position, mark)| {
                Duration::try_from_secs_f64(mark.seconds)
                    .map(|elapsed| TimeMark::new(mark.index, elapsed))
                    .map_err(|_| ScenarioError::InvalidSeconds {
                        position,
                        seconds: mark.seconds,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Route::new(self.name, self.points, self.turns, times)?)
    }
}

/// Loads a JSON-encoded [`Scenario`] from disk.
pub(crate) fn load_scenario(path: &Utf8Path) -> Result<Scenario, CliError> {
    let file = open_utf8_file(path).map_err(|source| CliError::OpenScenario {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).map_err(|source| CliError::ParseScenario {
        path: path.to_path_buf(),
        source,
    })
}

/// Router answering every build with the scenario's route.
#[derive(Debug)]
pub(crate) struct ScenarioRouter {
    route: Route,
    profile: TravelProfile,
    result: ResultCode,
    destination: Option<Coord<f64>>,
}

impl ScenarioRouter {
    pub(crate) const fn new(route: Route, profile: TravelProfile, result: ResultCode) -> Self {
        Self {
            route,
            profile,
            result,
            destination: None,
        }
    }
}

impl Router for ScenarioRouter {
    fn name(&self) -> &str {
        self.route.name()
    }

    fn profile(&self) -> TravelProfile {
        self.profile
    }

    fn set_destination(&mut self, point: Coord<f64>) {
        self.destination = Some(point);
    }

    fn calculate_route(&mut self, start: Coord<f64>, on_ready: RouteReadyCallback) {
        let Some(end) = self.destination else {
            on_ready(Route::empty(self.name()), ResultCode::EndPointNotFound);
            return;
        };
        debug!(
            "replaying {} build from ({}, {}) to ({}, {})",
            self.result, start.x, start.y, end.x, end.y
        );
        if self.result.is_success() {
            on_ready(self.route.clone(), ResultCode::NoError);
        } else {
            on_ready(Route::empty(self.name()), self.result);
        }
    }

    fn clear_cached_state(&mut self) {}
}
