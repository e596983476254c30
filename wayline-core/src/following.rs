//! Progress snapshot handed to presentation layers.

use std::time::Duration;

use crate::TurnDirection;

/// Formatted progress along the active route.
///
/// The default value, with empty strings, zero time and
/// [`TurnDirection::NoTurn`], is reported while no usable route exists.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FollowingInfo {
    /// Remaining distance magnitude, e.g. `"1.5"`.
    pub distance_to_target: String,
    /// Unit of [`distance_to_target`](Self::distance_to_target).
    pub target_units_suffix: String,
    /// Distance magnitude to the next turn.
    pub distance_to_turn: String,
    /// Unit of [`distance_to_turn`](Self::distance_to_turn).
    pub turn_units_suffix: String,
    /// Next manoeuvre.
    pub turn: TurnDirection,
    /// Roundabout exit number, `0` when not applicable.
    pub exit_num: u32,
    /// Remaining travel time.
    pub time: Duration,
}

impl FollowingInfo {
    /// Whether the snapshot describes a real route.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.distance_to_target.is_empty()
    }
}
