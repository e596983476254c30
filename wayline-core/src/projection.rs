//! Local tangent-plane projection between WGS84 degrees and metres.

use geo::Coord;

/// Equatorial radius used by the projection, in metres.
pub const EARTH_RADIUS_METRES: f64 = 6_378_137.0;

/// Equirectangular projection centred on an origin.
///
/// `x` grows east and `y` grows north, both in metres from the origin.
/// Distortion stays small for the city-scale extents a single route covers.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use wayline_core::LocalProjection;
///
/// let projection = LocalProjection::new(Coord { x: -0.1276, y: 51.5072 });
/// let local = projection.to_local(Coord { x: -0.1276, y: 51.5172 });
/// assert!(local.x.abs() < 1e-6);
/// assert!((local.y - 1_113.2).abs() < 0.1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalProjection {
    origin: Coord<f64>,
    cos_lat: f64,
}

impl LocalProjection {
    /// Centre the projection on `origin`, given as longitude/latitude degrees.
    #[must_use]
    pub fn new(origin: Coord<f64>) -> Self {
        Self {
            origin,
            cos_lat: origin.y.to_radians().cos(),
        }
    }

    /// Origin in longitude/latitude degrees.
    #[must_use]
    pub const fn origin(&self) -> Coord<f64> {
        self.origin
    }

    /// Convert longitude/latitude degrees into local metres.
    #[must_use]
    pub fn to_local(&self, geographic: Coord<f64>) -> Coord<f64> {
        Coord {
            x: (geographic.x - self.origin.x).to_radians() * EARTH_RADIUS_METRES * self.cos_lat,
            y: (geographic.y - self.origin.y).to_radians() * EARTH_RADIUS_METRES,
        }
    }

    /// Convert local metres back into longitude/latitude degrees.
    ///
    /// At the poles the east offset cannot be recovered and the origin
    /// longitude is returned.
    #[must_use]
    pub fn to_geographic(&self, local: Coord<f64>) -> Coord<f64> {
        let lon = if self.cos_lat.abs() > f64::EPSILON {
            self.origin.x + (local.x / (EARTH_RADIUS_METRES * self.cos_lat)).to_degrees()
        } else {
            self.origin.x
        };
        Coord {
            x: lon,
            y: self.origin.y + (local.y / EARTH_RADIUS_METRES).to_degrees(),
        }
    }
}
