//! OSRM API response types for the Route service and their conversion into
//! [`Route`]s.
//!
//! Requests ask for `overview=full&geometries=geojson&steps=true`, so every
//! route carries its full polyline as `[lon, lat]` pairs and one step per
//! manoeuvre.
//!
//! See: <http://project-osrm.org/docs/v5.24.0/api/#route-service>

use std::time::Duration;

use geo::Coord;
use log::warn;
use serde::Deserialize;
use wayline_core::{
    LocalProjection, ResultCode, Route, TimeMark, TravelProfile, TurnDirection, TurnItem,
};

/// OSRM Route API response.
#[derive(Debug, Deserialize)]
pub struct RouteResponse {
    /// Status code from OSRM.
    ///
    /// Common values:
    /// - `"Ok"` - Request was successful
    /// - `"NoRoute"` - No route found between the points
    /// - `"NoSegment"` - A coordinate could not be snapped to the network
    /// - `"InvalidQuery"` - Invalid query parameters
    pub code: String,

    /// Optional error message when `code` is not `"Ok"`.
    pub message: Option<String>,

    /// Alternative routes, best first.
    #[serde(default)]
    pub routes: Vec<OsrmRoute>,
}

impl RouteResponse {
    /// Check if the response indicates success.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.code == "Ok"
    }
}

/// One route alternative.
#[derive(Debug, Deserialize)]
pub struct OsrmRoute {
    /// Length in metres.
    pub distance: f64,
    /// Travel time in seconds.
    pub duration: f64,
    /// Full-resolution GeoJSON line string.
    pub geometry: Geometry,
    /// One leg per pair of consecutive waypoints.
    #[serde(default)]
    pub legs: Vec<Leg>,
}

/// GeoJSON `LineString` geometry.
#[derive(Debug, Deserialize)]
pub struct Geometry {
    /// `[lon, lat]` pairs.
    pub coordinates: Vec<[f64; 2]>,
}

/// Route between two waypoints.
#[derive(Debug, Deserialize)]
pub struct Leg {
    /// Turn-by-turn steps.
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// Stretch of road starting with a manoeuvre.
#[derive(Debug, Deserialize)]
pub struct Step {
    /// Length in metres.
    pub distance: f64,
    /// Travel time in seconds.
    pub duration: f64,
    /// Manoeuvre performed at the start of the step.
    pub maneuver: Maneuver,
}

/// Manoeuvre description.
#[derive(Debug, Deserialize)]
pub struct Maneuver {
    /// Manoeuvre type such as `"turn"` or `"roundabout"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Direction refinement such as `"slight left"`.
    pub modifier: Option<String>,
    /// `[lon, lat]` of the manoeuvre.
    pub location: [f64; 2],
    /// Roundabout exit number.
    pub exit: Option<u32>,
}

/// Path segment naming the OSRM profile for `profile`.
pub(crate) const fn profile_segment(profile: TravelProfile) -> &'static str {
    match profile {
        TravelProfile::Car => "driving",
        TravelProfile::Pedestrian => "walking",
        TravelProfile::Bicycle => "cycling",
    }
}

/// Map an OSRM status code onto a [`ResultCode`].
pub(crate) fn result_code(code: &str) -> ResultCode {
    match code {
        "Ok" => ResultCode::NoError,
        "NoRoute" => ResultCode::NoRoute,
        "NoSegment" => ResultCode::StartPointNotFound,
        _ => ResultCode::InternalError,
    }
}

/// Map a manoeuvre onto the announced turn, `None` when nothing is announced.
pub(crate) fn turn_direction(maneuver: &Maneuver) -> Option<TurnDirection> {
    let direction = match maneuver.kind.as_str() {
        "depart" => TurnDirection::NoTurn,
        "arrive" => TurnDirection::ReachedYourDestination,
        "roundabout" | "rotary" => TurnDirection::EnterRoundAbout,
        "exit roundabout" | "exit rotary" => TurnDirection::LeaveRoundAbout,
        "roundabout turn" if maneuver.modifier.as_deref() == Some("straight") => {
            TurnDirection::StayOnRoundAbout
        }
        "off ramp" => TurnDirection::TakeTheExit,
        _ => modifier_direction(maneuver.modifier.as_deref()),
    };
    (direction != TurnDirection::NoTurn).then_some(direction)
}

fn modifier_direction(modifier: Option<&str>) -> TurnDirection {
    match modifier {
        Some("uturn") => TurnDirection::UTurn,
        Some("sharp right") => TurnDirection::TurnSharpRight,
        Some("right") => TurnDirection::TurnRight,
        Some("slight right") => TurnDirection::TurnSlightRight,
        Some("straight") => TurnDirection::GoStraight,
        Some("slight left") => TurnDirection::TurnSlightLeft,
        Some("left") => TurnDirection::TurnLeft,
        Some("sharp left") => TurnDirection::TurnSharpLeft,
        _ => TurnDirection::NoTurn,
    }
}

fn to_coord([lon, lat]: [f64; 2]) -> Coord<f64> {
    Coord { x: lon, y: lat }
}

/// Index of the polyline point nearest `target`, searching from `from` on.
fn nearest_index(points: &[Coord<f64>], from: usize, target: Coord<f64>) -> usize {
    points
        .iter()
        .enumerate()
        .skip(from)
        .map(|(index, point)| {
            let d = *point - target;
            (index, d.x * d.x + d.y * d.y)
        })
        .fold(None, |best: Option<(usize, f64)>, (index, distance)| match best {
            Some((_, best_distance)) if best_distance <= distance => best,
            _ => Some((index, distance)),
        })
        .map_or(from, |(index, _)| index)
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.max(0.0)).unwrap_or_default()
}

/// Convert a response into a [`Route`] in the projection's local metres.
///
/// # Errors
///
/// Returns the [`ResultCode`] describing why no usable route was produced.
pub(crate) fn into_route(
    response: RouteResponse,
    name: &str,
    projection: &LocalProjection,
) -> Result<Route, ResultCode> {
    if !response.is_ok() {
        warn!(
            "OSRM returned {}: {}",
            response.code,
            response.message.as_deref().unwrap_or_default()
        );
        return Err(result_code(&response.code));
    }
    let best = response
        .routes
        .into_iter()
        .next()
        .ok_or(ResultCode::NoRoute)?;

    let polyline: Vec<Coord<f64>> = best
        .geometry
        .coordinates
        .into_iter()
        .map(|pair| projection.to_local(to_coord(pair)))
        .collect();

    let mut turns = Vec::new();
    let mut times = Vec::new();
    let mut elapsed = Duration::ZERO;
    let mut search_from = 0;
    for step in best.legs.iter().flat_map(|leg| &leg.steps) {
        let location = projection.to_local(to_coord(step.maneuver.location));
        let index = nearest_index(&polyline, search_from, location);
        search_from = index;
        if let Some(direction) = turn_direction(&step.maneuver) {
            turns.push(TurnItem::new(index, direction).with_exit(step.maneuver.exit.unwrap_or(0)));
        }
        times.push(TimeMark::new(index, elapsed));
        elapsed += seconds(step.duration);
    }

    Route::new(name, polyline, turns, times).map_err(|err| {
        warn!("OSRM route could not be used: {err}");
        ResultCode::InternalError
    })
}
