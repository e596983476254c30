//! Planned paths with turn instructions and a forward-only progress cursor.
//!
//! A [`Route`] is built once by a [`Router`](crate::Router) and then handed
//! to the session, which moves its cursor as location fixes arrive. All
//! distances are measured in the projected plane, in metres.

use std::time::Duration;

use geo::{Coord, Intersects, Rect};
use thiserror::Error;

use crate::LocationFix;

/// Distance from the final point at which an accepted fix counts as arrival.
pub const DEFAULT_END_TOLERANCE: f64 = 10.0;

/// Fixes further apart than this are not used to predict progress.
const MAX_PREDICTION_GAP_SECS: f64 = 10.0;

/// Manoeuvre announced at a turn point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum TurnDirection {
    /// No manoeuvre.
    #[default]
    NoTurn,
    /// Continue straight on.
    GoStraight,
    /// Turn right.
    TurnRight,
    /// Sharp right.
    TurnSharpRight,
    /// Slight right.
    TurnSlightRight,
    /// Turn left.
    TurnLeft,
    /// Sharp left.
    TurnSharpLeft,
    /// Slight left.
    TurnSlightLeft,
    /// Turn around.
    UTurn,
    /// Leave via a motorway exit or ramp.
    TakeTheExit,
    /// Enter a roundabout.
    EnterRoundAbout,
    /// Leave a roundabout.
    LeaveRoundAbout,
    /// Keep circulating on a roundabout.
    StayOnRoundAbout,
    /// Start at the end of a street.
    StartAtEndOfStreet,
    /// Arrival at the destination.
    ReachedYourDestination,
}

impl TurnDirection {
    /// Return the direction as a `snake_case` `&str`.
    ///
    /// # Examples
    /// ```
    /// use wayline_core::TurnDirection;
    ///
    /// assert_eq!(TurnDirection::EnterRoundAbout.as_str(), "enter_round_about");
    /// ```
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NoTurn => "no_turn",
            Self::GoStraight => "go_straight",
            Self::TurnRight => "turn_right",
            Self::TurnSharpRight => "turn_sharp_right",
            Self::TurnSlightRight => "turn_slight_right",
            Self::TurnLeft => "turn_left",
            Self::TurnSharpLeft => "turn_sharp_left",
            Self::TurnSlightLeft => "turn_slight_left",
            Self::UTurn => "u_turn",
            Self::TakeTheExit => "take_the_exit",
            Self::EnterRoundAbout => "enter_round_about",
            Self::LeaveRoundAbout => "leave_round_about",
            Self::StayOnRoundAbout => "stay_on_round_about",
            Self::StartAtEndOfStreet => "start_at_end_of_street",
            Self::ReachedYourDestination => "reached_your_destination",
        }
    }
}

impl std::fmt::Display for TurnDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TurnDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "no_turn" => Ok(Self::NoTurn),
            "go_straight" => Ok(Self::GoStraight),
            "turn_right" => Ok(Self::TurnRight),
            "turn_sharp_right" => Ok(Self::TurnSharpRight),
            "turn_slight_right" => Ok(Self::TurnSlightRight),
            "turn_left" => Ok(Self::TurnLeft),
            "turn_sharp_left" => Ok(Self::TurnSharpLeft),
            "turn_slight_left" => Ok(Self::TurnSlightLeft),
            "u_turn" => Ok(Self::UTurn),
            "take_the_exit" => Ok(Self::TakeTheExit),
            "enter_round_about" => Ok(Self::EnterRoundAbout),
            "leave_round_about" => Ok(Self::LeaveRoundAbout),
            "stay_on_round_about" => Ok(Self::StayOnRoundAbout),
            "start_at_end_of_street" => Ok(Self::StartAtEndOfStreet),
            "reached_your_destination" => Ok(Self::ReachedYourDestination),
            _ => Err(format!("unknown turn direction '{s}'")),
        }
    }
}

/// A turn instruction anchored at a polyline point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TurnItem {
    /// Index of the polyline point where the manoeuvre happens.
    pub index: usize,
    /// Manoeuvre to perform.
    pub direction: TurnDirection,
    /// Roundabout exit number, `0` when not applicable.
    #[cfg_attr(feature = "serde", serde(default))]
    pub exit_num: u32,
}

impl TurnItem {
    /// Construct a turn without a roundabout exit.
    #[must_use]
    pub const fn new(index: usize, direction: TurnDirection) -> Self {
        Self {
            index,
            direction,
            exit_num: 0,
        }
    }

    /// Attach a roundabout exit number.
    #[must_use]
    pub const fn with_exit(mut self, exit_num: u32) -> Self {
        self.exit_num = exit_num;
        self
    }
}

/// Cumulative travel time from the route start to a polyline point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeMark {
    /// Index of the polyline point.
    pub index: usize,
    /// Travel time from the first point.
    pub elapsed: Duration,
}

impl TimeMark {
    /// Construct a time mark.
    #[must_use]
    pub const fn new(index: usize, elapsed: Duration) -> Self {
        Self { index, elapsed }
    }
}

/// Errors returned by [`Route::new`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// No polyline points were supplied.
    #[error("route polyline must contain at least one point")]
    EmptyPolyline,
    /// A polyline point had a NaN or infinite coordinate.
    #[error("route point {index} is not finite")]
    NonFinitePoint {
        /// Offending point index.
        index: usize,
    },
    /// A turn referenced a point past the end of the polyline.
    #[error("turn {position} references point {index} beyond the polyline")]
    TurnOutOfRange {
        /// Position of the turn in the turn list.
        position: usize,
        /// Referenced point index.
        index: usize,
    },
    /// Turns were not ordered along the polyline.
    #[error("turn {position} precedes the turn before it")]
    TurnsOutOfOrder {
        /// Position of the first out-of-order turn.
        position: usize,
    },
    /// A time mark referenced a point past the end of the polyline.
    #[error("time mark {position} references point {index} beyond the polyline")]
    TimeMarkOutOfRange {
        /// Position of the mark in the mark list.
        position: usize,
        /// Referenced point index.
        index: usize,
    },
    /// Time marks went backwards in index or elapsed time.
    #[error("time mark {position} goes backwards")]
    TimeMarksOutOfOrder {
        /// Position of the first out-of-order mark.
        position: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Cursor {
    /// Segment the cursor sits on (`segment -> segment + 1`).
    segment: usize,
    /// Distance along the whole route.
    distance: f64,
    point: Coord<f64>,
}

/// A planned path plus a forward-only progress cursor.
///
/// An empty route is *invalid*; [`Route::new`] produces a *valid* one. The
/// cursor starts on the first point and only moves through
/// [`Route::advance`].
///
/// # Examples
/// ```
/// use geo::Coord;
/// use wayline_core::{LocationFix, Route};
///
/// # fn main() -> Result<(), wayline_core::RouteError> {
/// let mut route = Route::new(
///     "car",
///     vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 100.0, y: 0.0 }],
///     Vec::new(),
///     Vec::new(),
/// )?;
/// assert!(route.advance(&LocationFix::new(0.0, Coord { x: 40.0, y: 2.0 }, 5.0)));
/// assert_eq!(route.current_distance_to_end(), 60.0);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    name: String,
    polyline: Vec<Coord<f64>>,
    cumulative: Vec<f64>,
    turns: Vec<TurnItem>,
    times: Vec<TimeMark>,
    cursor: Cursor,
    on_end: bool,
    last_fix_time: Option<f64>,
    end_tolerance: f64,
}

impl Default for Route {
    fn default() -> Self {
        Self::empty("")
    }
}

impl Route {
    /// Validate inputs and construct a route with the cursor on the first point.
    ///
    /// # Errors
    ///
    /// Returns a [`RouteError`] when the polyline is empty or not finite, or
    /// when turns or time marks are out of range or out of order.
    pub fn new(
        name: impl Into<String>,
        polyline: Vec<Coord<f64>>,
        turns: Vec<TurnItem>,
        times: Vec<TimeMark>,
    ) -> Result<Self, RouteError> {
        let Some(&start) = polyline.first() else {
            return Err(RouteError::EmptyPolyline);
        };
        if let Some(index) = polyline
            .iter()
            .position(|p| !(p.x.is_finite() && p.y.is_finite()))
        {
            return Err(RouteError::NonFinitePoint { index });
        }
        validate_turns(&turns, polyline.len())?;
        validate_times(&times, polyline.len())?;

        let cumulative = cumulative_lengths(&polyline);
        Ok(Self {
            name: name.into(),
            polyline,
            cumulative,
            turns,
            times,
            cursor: Cursor {
                segment: 0,
                distance: 0.0,
                point: start,
            },
            on_end: false,
            last_fix_time: None,
            end_tolerance: DEFAULT_END_TOLERANCE,
        })
    }

    /// Construct an invalid, empty route.
    ///
    /// # Examples
    /// ```
    /// use wayline_core::Route;
    ///
    /// let route = Route::empty("car");
    /// assert!(!route.is_valid());
    /// assert_eq!(route.name(), "car");
    /// ```
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            polyline: Vec::new(),
            cumulative: Vec::new(),
            turns: Vec::new(),
            times: Vec::new(),
            cursor: Cursor::default(),
            on_end: false,
            last_fix_time: None,
            end_tolerance: DEFAULT_END_TOLERANCE,
        }
    }

    /// Override the arrival tolerance in metres.
    ///
    /// Non-finite or negative values are ignored.
    #[must_use]
    pub fn with_end_tolerance(mut self, tolerance: f64) -> Self {
        if tolerance.is_finite() && tolerance >= 0.0 {
            self.end_tolerance = tolerance;
        }
        self
    }

    /// Identifier of the router that produced the route.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the route holds a usable polyline.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.polyline.is_empty()
    }

    /// Polyline points in travel order.
    #[must_use]
    pub fn polyline(&self) -> &[Coord<f64>] {
        &self.polyline
    }

    /// Turn instructions in travel order.
    #[must_use]
    pub fn turns(&self) -> &[TurnItem] {
        &self.turns
    }

    /// Time marks in travel order.
    #[must_use]
    pub fn times(&self) -> &[TimeMark] {
        &self.times
    }

    /// Length of the whole polyline.
    #[must_use]
    pub fn total_length(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or_default()
    }

    /// Distance travelled along the route up to the cursor.
    #[must_use]
    pub const fn current_distance(&self) -> f64 {
        self.cursor.distance
    }

    /// Cursor position, or `None` for an invalid route.
    #[must_use]
    pub fn current_position(&self) -> Option<Coord<f64>> {
        self.is_valid().then_some(self.cursor.point)
    }

    /// Whether the cursor has reached the final point.
    #[must_use]
    pub const fn is_current_on_end(&self) -> bool {
        self.on_end
    }

    /// Try to move the cursor onto the route using `fix`.
    ///
    /// The fix is projected onto every segment from the cursor onwards and a
    /// projection is accepted when it falls inside the square accuracy window
    /// around the fix. Returns `false`, leaving the cursor untouched, when no
    /// projection qualifies. The cursor never moves backwards: a fix matching
    /// the route behind the cursor is accepted at the cursor position.
    pub fn advance(&mut self, fix: &LocationFix) -> bool {
        if !self.is_valid() {
            return false;
        }
        let accuracy = fix.horizontal_accuracy;
        let position = fix.position;
        if !(accuracy.is_finite() && accuracy >= 0.0)
            || !(position.x.is_finite() && position.y.is_finite())
        {
            return false;
        }

        let half = Coord {
            x: accuracy,
            y: accuracy,
        };
        let window = Rect::new(position - half, position + half);
        let predicted = self.predicted_distance(fix);
        let Some(candidate) = self.find_projection(position, &window, predicted) else {
            return false;
        };

        self.cursor = Cursor {
            distance: candidate.distance.max(self.cursor.distance),
            ..candidate
        };
        self.last_fix_time = Some(fix.timestamp);
        if self.total_length() - self.cursor.distance <= self.end_tolerance {
            self.snap_to_end();
        }
        true
    }

    /// Squared distance from `point` to the nearest point of the route ahead
    /// of the cursor.
    ///
    /// Returns `f64::INFINITY` for an invalid route.
    #[must_use]
    pub fn current_sq_distance(&self, point: Coord<f64>) -> f64 {
        self.candidates(point)
            .into_iter()
            .map(|candidate| sq_distance(candidate.point, point))
            .fold(f64::INFINITY, f64::min)
    }

    /// Remaining distance from the cursor to the final point.
    #[must_use]
    pub fn current_distance_to_end(&self) -> f64 {
        (self.total_length() - self.cursor.distance).max(0.0)
    }

    /// Distance to and details of the next turn ahead of the cursor.
    ///
    /// When no turn remains the destination is reported as a
    /// [`TurnDirection::ReachedYourDestination`] item at the final point.
    #[must_use]
    pub fn turn(&self) -> (f64, TurnItem) {
        let Some(last_index) = self.polyline.len().checked_sub(1) else {
            return (0.0, TurnItem::default());
        };
        let ahead = if self.on_end {
            None
        } else {
            self.turns.iter().find(|turn| {
                turn.index >= self.cursor.segment
                    && self.cumulative_at(turn.index) >= self.cursor.distance
            })
        };
        match ahead {
            Some(turn) => (
                (self.cumulative_at(turn.index) - self.cursor.distance).max(0.0),
                *turn,
            ),
            None => (
                self.current_distance_to_end(),
                TurnItem::new(last_index, TurnDirection::ReachedYourDestination),
            ),
        }
    }

    /// Estimated remaining travel time.
    ///
    /// Elapsed time is interpolated linearly by distance between time marks;
    /// a route without marks reports zero.
    #[must_use]
    pub fn time(&self) -> Duration {
        let Some(total) = self.times.last().map(|mark| mark.elapsed) else {
            return Duration::ZERO;
        };
        total.saturating_sub(self.elapsed_at(self.cursor.distance))
    }

    fn elapsed_at(&self, distance: f64) -> Duration {
        let mut previous = (0.0, Duration::ZERO);
        for mark in &self.times {
            let mark_distance = self.cumulative_at(mark.index);
            if mark_distance >= distance {
                let span = mark_distance - previous.0;
                if span <= 0.0 {
                    return previous.1;
                }
                let fraction = ((distance - previous.0) / span).clamp(0.0, 1.0);
                let delta = mark.elapsed.saturating_sub(previous.1);
                return previous.1 + delta.mul_f64(fraction);
            }
            previous = (mark_distance, mark.elapsed);
        }
        previous.1
    }

    fn segment_count(&self) -> usize {
        self.polyline.len().saturating_sub(1)
    }

    fn cumulative_at(&self, index: usize) -> f64 {
        self.cumulative
            .get(index)
            .copied()
            .unwrap_or_else(|| self.total_length())
    }

    fn predicted_distance(&self, fix: &LocationFix) -> Option<f64> {
        let speed = fix.usable_speed()?;
        let last = self.last_fix_time?;
        let elapsed = fix.timestamp - last;
        (elapsed > 0.0 && elapsed < MAX_PREDICTION_GAP_SECS)
            .then(|| self.cursor.distance + speed * elapsed)
    }

    fn find_projection(
        &self,
        position: Coord<f64>,
        window: &Rect<f64>,
        predicted: Option<f64>,
    ) -> Option<Cursor> {
        let mut best: Option<(f64, Cursor)> = None;
        for candidate in self.candidates(position) {
            if !window.intersects(&candidate.point) {
                continue;
            }
            let score = match predicted {
                Some(target) => (candidate.distance - target).abs(),
                None => sq_distance(candidate.point, position),
            };
            if best.is_none_or(|(best_score, _)| score < best_score) {
                best = Some((score, candidate));
            }
        }
        best.map(|(_, candidate)| candidate)
    }

    /// Projections of `position` onto each segment from the cursor onwards.
    fn candidates(&self, position: Coord<f64>) -> Vec<Cursor> {
        if !self.is_valid() {
            return Vec::new();
        }
        if self.segment_count() == 0 {
            return vec![self.cursor];
        }
        (self.cursor.segment..self.segment_count())
            .filter_map(|segment| {
                let start = *self.polyline.get(segment)?;
                let end = *self.polyline.get(segment + 1)?;
                let t = project(position, start, end);
                let offset = self.cumulative_at(segment);
                let length = self.cumulative_at(segment + 1) - offset;
                let candidate = Cursor {
                    segment,
                    distance: (offset + t * length).min(self.cumulative_at(segment + 1)),
                    point: start + (end - start) * t,
                };
                if segment == self.cursor.segment && candidate.distance < self.cursor.distance {
                    Some(self.cursor)
                } else {
                    Some(candidate)
                }
            })
            .collect()
    }

    fn snap_to_end(&mut self) {
        if let Some(&last) = self.polyline.last() {
            self.cursor = Cursor {
                segment: self.segment_count().saturating_sub(1),
                distance: self.total_length(),
                point: last,
            };
            self.on_end = true;
        }
    }
}

fn validate_turns(turns: &[TurnItem], len: usize) -> Result<(), RouteError> {
    let mut previous = 0;
    for (position, turn) in turns.iter().enumerate() {
        if turn.index >= len {
            return Err(RouteError::TurnOutOfRange {
                position,
                index: turn.index,
            });
        }
        if turn.index < previous {
            return Err(RouteError::TurnsOutOfOrder { position });
        }
        previous = turn.index;
    }
    Ok(())
}

fn validate_times(times: &[TimeMark], len: usize) -> Result<(), RouteError> {
    let mut previous = (0, Duration::ZERO);
    for (position, mark) in times.iter().enumerate() {
        if mark.index >= len {
            return Err(RouteError::TimeMarkOutOfRange {
                position,
                index: mark.index,
            });
        }
        if mark.index < previous.0 || mark.elapsed < previous.1 {
            return Err(RouteError::TimeMarksOutOfOrder { position });
        }
        previous = (mark.index, mark.elapsed);
    }
    Ok(())
}

fn cumulative_lengths(points: &[Coord<f64>]) -> Vec<f64> {
    let mut total = 0.0;
    std::iter::once(0.0)
        .chain(points.windows(2).map(|pair| {
            if let [a, b] = pair {
                total += sq_distance(*a, *b).sqrt();
            }
            total
        }))
        .collect()
}

pub(crate) fn sq_distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    let d = a - b;
    d.x * d.x + d.y * d.y
}

/// Parameter in `[0, 1]` of the projection of `point` onto `start -> end`.
fn project(point: Coord<f64>, start: Coord<f64>, end: Coord<f64>) -> f64 {
    let along = end - start;
    let length_sq = along.x * along.x + along.y * along.y;
    if length_sq <= 0.0 {
        return 0.0;
    }
    let offset = point - start;
    ((offset.x * along.x + offset.y * along.y) / length_sq).clamp(0.0, 1.0)
}
