//! Router capability: asynchronous route computation between two points.

use geo::Coord;

use crate::Route;

/// Outcome of a route computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum ResultCode {
    /// A route was built.
    NoError,
    /// The build was cancelled before completion.
    Cancelled,
    /// No start position was available.
    NoCurrentPosition,
    /// Start and end are not connected.
    NoRoute,
    /// The start could not be matched to the network.
    StartPointNotFound,
    /// The end could not be matched to the network.
    EndPointNotFound,
    /// The routing backend could not be reached.
    NetworkError,
    /// Any other router failure.
    InternalError,
}

impl ResultCode {
    /// Whether the code reports a successful build.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::NoError)
    }

    /// Return the code as a `snake_case` `&str`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NoError => "no_error",
            Self::Cancelled => "cancelled",
            Self::NoCurrentPosition => "no_current_position",
            Self::NoRoute => "no_route",
            Self::StartPointNotFound => "start_point_not_found",
            Self::EndPointNotFound => "end_point_not_found",
            Self::NetworkError => "network_error",
            Self::InternalError => "internal_error",
        }
    }
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Travel mode a router computes routes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum TravelProfile {
    /// Motor vehicle.
    #[default]
    Car,
    /// On foot.
    Pedestrian,
    /// Bicycle.
    Bicycle,
}

impl TravelProfile {
    /// Return the profile as a lowercase `&str`.
    ///
    /// # Examples
    /// ```
    /// use wayline_core::TravelProfile;
    ///
    /// assert_eq!(TravelProfile::Pedestrian.as_str(), "pedestrian");
    /// ```
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Car => "car",
            Self::Pedestrian => "pedestrian",
            Self::Bicycle => "bicycle",
        }
    }
}

impl std::fmt::Display for TravelProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TravelProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "car" => Ok(Self::Car),
            "pedestrian" => Ok(Self::Pedestrian),
            "bicycle" => Ok(Self::Bicycle),
            _ => Err(format!("unknown travel profile '{s}'")),
        }
    }
}

/// Single-shot completion for [`Router::calculate_route`].
///
/// The callback may run on any thread.
pub type RouteReadyCallback = Box<dyn FnOnce(Route, ResultCode) + Send + 'static>;

/// Compute routes for one travel profile.
///
/// Implementations report through `on_ready` exactly once per
/// [`calculate_route`](Router::calculate_route) call, unless the build is
/// cancelled. Reporting may happen synchronously, before `calculate_route`
/// returns, or later from another thread.
///
/// # Examples
///
/// ```rust
/// use geo::Coord;
/// use wayline_core::{ResultCode, Route, RouteReadyCallback, Router, TravelProfile};
///
/// #[derive(Default)]
/// struct StraightLine {
///     destination: Option<Coord<f64>>,
/// }
///
/// impl Router for StraightLine {
///     fn name(&self) -> &str {
///         "straight-line"
///     }
///
///     fn profile(&self) -> TravelProfile {
///         TravelProfile::Pedestrian
///     }
///
///     fn set_destination(&mut self, point: Coord<f64>) {
///         self.destination = Some(point);
///     }
///
///     fn calculate_route(&mut self, start: Coord<f64>, on_ready: RouteReadyCallback) {
///         let Some(end) = self.destination else {
///             on_ready(Route::empty(self.name()), ResultCode::EndPointNotFound);
///             return;
///         };
///         match Route::new(self.name(), vec![start, end], Vec::new(), Vec::new()) {
///             Ok(route) => on_ready(route, ResultCode::NoError),
///             Err(_) => on_ready(Route::empty(self.name()), ResultCode::InternalError),
///         }
///     }
///
///     fn clear_cached_state(&mut self) {}
/// }
///
/// let mut router = StraightLine::default();
/// router.set_destination(Coord { x: 10.0, y: 0.0 });
/// router.calculate_route(
///     Coord { x: 0.0, y: 0.0 },
///     Box::new(|route: Route, code: ResultCode| {
///         assert_eq!(code, ResultCode::NoError);
///         assert_eq!(route.total_length(), 10.0);
///     }),
/// );
/// ```
pub trait Router {
    /// Identifier stamped onto built routes.
    fn name(&self) -> &str;

    /// Travel profile this router serves.
    fn profile(&self) -> TravelProfile;

    /// Record the end point for subsequent builds.
    fn set_destination(&mut self, point: Coord<f64>);

    /// Start computing a route from `start` to the recorded destination.
    fn calculate_route(&mut self, start: Coord<f64>, on_ready: RouteReadyCallback);

    /// Abandon any in-flight build. The default does nothing.
    fn cancel(&mut self) {}

    /// Drop caches and prepared data held for the current profile.
    fn clear_cached_state(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("car", TravelProfile::Car)]
    #[case("Pedestrian", TravelProfile::Pedestrian)]
    #[case("BICYCLE", TravelProfile::Bicycle)]
    fn parses_profiles_case_insensitively(#[case] input: &str, #[case] expected: TravelProfile) {
        assert_eq!(input.parse::<TravelProfile>(), Ok(expected));
    }

    #[rstest]
    fn rejects_unknown_profile() {
        let err = "hovercraft"
            .parse::<TravelProfile>()
            .expect_err("unknown profile");
        assert!(err.contains("hovercraft"));
    }

    #[rstest]
    #[case(ResultCode::NoError, true)]
    #[case(ResultCode::Cancelled, false)]
    #[case(ResultCode::NetworkError, false)]
    fn only_no_error_is_success(#[case] code: ResultCode, #[case] expected: bool) {
        assert_eq!(code.is_success(), expected);
    }

    #[rstest]
    fn result_code_displays_snake_case() {
        assert_eq!(
            ResultCode::StartPointNotFound.to_string(),
            "start_point_not_found"
        );
    }
}
