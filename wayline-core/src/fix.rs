//! Location fixes produced by an external positioning pipeline.

use geo::Coord;

/// A timestamped position sample.
///
/// `position` is expressed in projected map coordinates measured in metres
/// (see [`LocalProjection`](crate::LocalProjection)); converting raw
/// geographic degrees is the caller's responsibility.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use wayline_core::LocationFix;
///
/// let fix = LocationFix::new(1_700_000_000.0, Coord { x: 12.0, y: -3.5 }, 8.0)
///     .with_speed(1.4);
/// assert_eq!(fix.speed, Some(1.4));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LocationFix {
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    /// Projected position in metres.
    pub position: Coord<f64>,
    /// Horizontal accuracy radius in metres.
    pub horizontal_accuracy: f64,
    /// Ground speed in metres per second, when the sensor reports one.
    #[cfg_attr(feature = "serde", serde(default))]
    pub speed: Option<f64>,
}

impl LocationFix {
    /// Construct a fix without a speed estimate.
    #[must_use]
    pub const fn new(timestamp: f64, position: Coord<f64>, horizontal_accuracy: f64) -> Self {
        Self {
            timestamp,
            position,
            horizontal_accuracy,
            speed: None,
        }
    }

    /// Attach a ground speed in metres per second.
    #[must_use]
    pub const fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    /// Speed usable for progress prediction: finite and non-negative.
    pub(crate) fn usable_speed(&self) -> Option<f64> {
        self.speed.filter(|v| v.is_finite() && *v >= 0.0)
    }
}
