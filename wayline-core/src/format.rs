//! Human-readable distance strings for progress reporting.
//!
//! Formatters emit `"<value> <unit>"` with exactly one space so the session
//! can hand the magnitude and the unit to a presentation layer separately.

use thiserror::Error;

/// Errors raised when formatted text breaks the `"<value> <unit>"` contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DistanceFormatError {
    /// The text contained no space.
    #[error("formatted distance '{text}' has no space between value and unit")]
    MissingSeparator {
        /// Offending text.
        text: String,
    },
    /// The value or the unit was empty.
    #[error("formatted distance '{text}' has an empty value or unit")]
    EmptyComponent {
        /// Offending text.
        text: String,
    },
}

/// A formatted distance split into magnitude and unit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FormattedDistance {
    /// Magnitude, e.g. `"1.5"`.
    pub value: String,
    /// Unit suffix, e.g. `"km"`.
    pub suffix: String,
}

impl FormattedDistance {
    /// Split `text` at its first space.
    ///
    /// # Examples
    /// ```
    /// use wayline_core::FormattedDistance;
    ///
    /// let parts = FormattedDistance::split("1.5 km")?;
    /// assert_eq!(parts.value, "1.5");
    /// assert_eq!(parts.suffix, "km");
    /// # Ok::<(), wayline_core::DistanceFormatError>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`DistanceFormatError`] when there is no space or either side
    /// of it is empty.
    pub fn split(text: &str) -> Result<Self, DistanceFormatError> {
        let (value, suffix) =
            text.split_once(' ')
                .ok_or_else(|| DistanceFormatError::MissingSeparator {
                    text: text.to_owned(),
                })?;
        if value.is_empty() || suffix.is_empty() {
            return Err(DistanceFormatError::EmptyComponent {
                text: text.to_owned(),
            });
        }
        Ok(Self {
            value: value.to_owned(),
            suffix: suffix.to_owned(),
        })
    }
}

/// Turn a distance in metres into display text.
pub trait DistanceFormatter {
    /// Format `metres` as `"<value> <unit>"`.
    fn format_distance(&self, metres: f64) -> String;

    /// Format `metres` and split the result into value and unit.
    ///
    /// # Errors
    ///
    /// Propagates [`FormattedDistance::split`] failures.
    fn format_split(&self, metres: f64) -> Result<FormattedDistance, DistanceFormatError> {
        FormattedDistance::split(&self.format_distance(metres))
    }
}

/// Unit family used by [`MeasurementFormatter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum MeasurementSystem {
    /// Metres and kilometres.
    #[default]
    Metric,
    /// Feet and miles.
    Imperial,
    /// Yards and miles.
    Yards,
}

impl MeasurementSystem {
    /// Return the system as a lowercase `&str`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Imperial => "imperial",
            Self::Yards => "yards",
        }
    }

    /// `(suffix, metres per unit)` for the small and the large unit.
    const fn units(self) -> ((&'static str, f64), (&'static str, f64)) {
        match self {
            Self::Metric => (("m", 1.0), ("km", 1000.0)),
            Self::Imperial => (("ft", 0.3048), ("mi", 1609.344)),
            Self::Yards => (("yd", 0.9144), ("mi", 1609.344)),
        }
    }
}

impl std::fmt::Display for MeasurementSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MeasurementSystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "metric" => Ok(Self::Metric),
            "imperial" => Ok(Self::Imperial),
            "yards" => Ok(Self::Yards),
            _ => Err(format!("unknown measurement system '{s}'")),
        }
    }
}

/// Default [`DistanceFormatter`] for the supported unit systems.
///
/// * below one small unit: `"0 m"`;
/// * below one large unit: whole small units, `"250 m"`;
/// * otherwise large units with one decimal below ten, `"1.5 km"`, and none
///   above, `"12 km"`.
///
/// # Examples
/// ```
/// use wayline_core::{DistanceFormatter, MeasurementFormatter, MeasurementSystem};
///
/// let formatter = MeasurementFormatter::new(MeasurementSystem::Metric);
/// assert_eq!(formatter.format_distance(250.4), "250 m");
/// assert_eq!(formatter.format_distance(1_500.0), "1.5 km");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MeasurementFormatter {
    system: MeasurementSystem,
}

impl MeasurementFormatter {
    /// Construct a formatter for `system`.
    #[must_use]
    pub const fn new(system: MeasurementSystem) -> Self {
        Self { system }
    }

    /// Unit family in use.
    #[must_use]
    pub const fn system(&self) -> MeasurementSystem {
        self.system
    }
}

impl DistanceFormatter for MeasurementFormatter {
    fn format_distance(&self, metres: f64) -> String {
        let ((small, small_size), (large, large_size)) = self.system.units();
        let small_units = metres / small_size;
        if small_units.is_nan() || small_units < 1.0 {
            return format!("0 {small}");
        }
        let whole = small_units.round();
        if whole * small_size < large_size {
            return format!("{whole:.0} {small}");
        }
        let large_units = metres / large_size;
        if (large_units * 10.0).round() < 100.0 {
            format!("{large_units:.1} {large}")
        } else {
            format!("{large_units:.0} {large}")
        }
    }
}
