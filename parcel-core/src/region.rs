//! Geographic query region.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors returned by [`BoundingBox::new`] and its [`FromStr`] impl.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BoundingBoxError {
    /// A coordinate was NaN or infinite.
    #[error("{axis} coordinate {value} is not finite")]
    NotFinite {
        /// Which bound was rejected.
        axis: &'static str,
        /// Offending value.
        value: f64,
    },
    /// A minimum was not strictly below its maximum.
    #[error("{axis} minimum {min} must be less than maximum {max}")]
    Inverted {
        /// `"x"` or `"y"`.
        axis: &'static str,
        min: f64,
        max: f64,
    },
    /// A coordinate fell outside the geographic range.
    #[error("{axis} coordinate {value} is outside [{limit_min}, {limit_max}]")]
    OutOfRange {
        /// Which bound was rejected.
        axis: &'static str,
        value: f64,
        limit_min: f64,
        limit_max: f64,
    },
    /// The textual form did not contain four comma-separated numbers.
    #[error("expected \"min_x,min_y,max_x,max_y\", got {input:?}")]
    Syntax {
        /// Input that failed to parse.
        input: String,
    },
}

/// An axis-aligned rectangle in EPSG:4326 longitude/latitude degrees.
///
/// # Examples
///
/// ```
/// use parcel_core::BoundingBox;
///
/// let bbox: BoundingBox = "11.0,45.0,11.005,45.005".parse()?;
/// assert_eq!(bbox.to_params(), [11.0, 45.0, 11.005, 45.005]);
/// # Ok::<(), parcel_core::BoundingBoxError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl BoundingBox {
    /// Validate and construct a bounding box.
    ///
    /// # Errors
    ///
    /// Returns [`BoundingBoxError`] when a coordinate is not finite, lies
    /// outside longitude `[-180, 180]` or latitude `[-90, 90]`, or when a
    /// minimum is not strictly less than its maximum.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self, BoundingBoxError> {
        let bounds = [
            ("min_x", min_x, 180.0),
            ("min_y", min_y, 90.0),
            ("max_x", max_x, 180.0),
            ("max_y", max_y, 90.0),
        ];
        for (axis, value, limit) in bounds {
            if !value.is_finite() {
                return Err(BoundingBoxError::NotFinite { axis, value });
            }
            if !(-limit..=limit).contains(&value) {
                return Err(BoundingBoxError::OutOfRange {
                    axis,
                    value,
                    limit_min: -limit,
                    limit_max: limit,
                });
            }
        }
        if min_x >= max_x {
            return Err(BoundingBoxError::Inverted {
                axis: "x",
                min: min_x,
                max: max_x,
            });
        }
        if min_y >= max_y {
            return Err(BoundingBoxError::Inverted {
                axis: "y",
                min: min_y,
                max: max_y,
            });
        }
        Ok(Self {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }

    #[must_use]
    pub const fn min_x(&self) -> f64 {
        self.min_x
    }

    #[must_use]
    pub const fn min_y(&self) -> f64 {
        self.min_y
    }

    #[must_use]
    pub const fn max_x(&self) -> f64 {
        self.max_x
    }

    #[must_use]
    pub const fn max_y(&self) -> f64 {
        self.max_y
    }

    /// Bounds in request order: `[min_x, min_y, max_x, max_y]`.
    #[must_use]
    pub const fn to_params(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }

    /// Convert to a `geo` rectangle.
    #[must_use]
    pub fn to_rect(&self) -> geo::Rect<f64> {
        geo::Rect::new(
            geo::Coord {
                x: self.min_x,
                y: self.min_y,
            },
            geo::Coord {
                x: self.max_x,
                y: self.max_y,
            },
        )
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}

impl FromStr for BoundingBox {
    type Err = BoundingBoxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let syntax = || BoundingBoxError::Syntax {
            input: s.to_owned(),
        };
        let values = s
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| syntax())?;
        match values.as_slice() {
            [min_x, min_y, max_x, max_y] => Self::new(*min_x, *min_y, *max_x, *max_y),
            _ => Err(syntax()),
        }
    }
}
