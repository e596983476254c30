//! Tunables for [`RoutingSession`](super::RoutingSession).

use camino::Utf8PathBuf;

/// Consecutive qualifying misses tolerated before a rebuild is requested.
pub const DEFAULT_MOVE_AWAY_THRESHOLD: u32 = 5;

/// Units in the last place within which two squared distances count as equal.
pub const DEFAULT_DISTANCE_TOLERANCE_ULPS: u64 = 1 << 16;

/// Session configuration.
///
/// # Examples
/// ```
/// use wayline_core::SessionConfig;
///
/// let config = SessionConfig::default()
///     .with_move_away_threshold(3)
///     .with_data_dir("/var/lib/wayline");
/// assert_eq!(config.move_away_threshold, 3);
/// assert_eq!(config.distance_tolerance_ulps, 1 << 16);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct SessionConfig {
    /// Misses beyond which a tracking session requests a rebuild.
    pub move_away_threshold: u32,
    /// Near-equality tolerance for the off-route distance comparison.
    pub distance_tolerance_ulps: u64,
    /// Directory holding per-profile `<profile>.routing` files.
    pub data_dir: Utf8PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            move_away_threshold: DEFAULT_MOVE_AWAY_THRESHOLD,
            distance_tolerance_ulps: DEFAULT_DISTANCE_TOLERANCE_ULPS,
            data_dir: Utf8PathBuf::from("."),
        }
    }
}

impl SessionConfig {
    /// Override the miss threshold.
    #[must_use]
    pub fn with_move_away_threshold(mut self, threshold: u32) -> Self {
        self.move_away_threshold = threshold;
        self
    }

    /// Override the near-equality tolerance.
    #[must_use]
    pub fn with_distance_tolerance_ulps(mut self, ulps: u64) -> Self {
        self.distance_tolerance_ulps = ulps;
        self
    }

    /// Override the routing data directory.
    #[must_use]
    pub fn with_data_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }
}

/// Whether `a` and `b` lie within `max_ulps` representable values of each other.
///
/// Signed zeros compare equal and NaN never compares equal.
pub(crate) fn almost_equal_ulps(a: f64, b: f64, max_ulps: u64) -> bool {
    if a.is_nan() || b.is_nan() {
        return false;
    }
    ordered_bits(a).abs_diff(ordered_bits(b)) <= max_ulps
}

/// Map an `f64` onto integers so adjacent floats differ by one.
fn ordered_bits(value: f64) -> i64 {
    let bits = value.to_bits().cast_signed();
    if bits < 0 {
        i64::MIN.wrapping_sub(bits)
    } else {
        bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(100.0, 100.0, true)]
    #[case(0.0, -0.0, true)]
    #[case(100.0, 100.0 + 1e-10, true)]
    #[case(100.0, 100.001, false)]
    #[case(-1.0, 1.0, false)]
    #[case(f64::NAN, f64::NAN, false)]
    fn compares_within_default_tolerance(#[case] a: f64, #[case] b: f64, #[case] expected: bool) {
        assert_eq!(
            almost_equal_ulps(a, b, DEFAULT_DISTANCE_TOLERANCE_ULPS),
            expected
        );
    }

    #[rstest]
    fn adjacent_floats_are_one_ulp_apart() {
        let next = f64::from_bits(1.5_f64.to_bits() + 1);
        assert!(almost_equal_ulps(1.5, next, 1));
        assert!(!almost_equal_ulps(1.5, next, 0));
    }

    #[rstest]
    fn default_config_uses_tuned_constants() {
        let config = SessionConfig::default();
        assert_eq!(config.move_away_threshold, 5);
        assert_eq!(config.distance_tolerance_ulps, 65_536);
        assert_eq!(config.data_dir, Utf8PathBuf::from("."));
    }
}
