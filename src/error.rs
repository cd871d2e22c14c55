//! Error handling for the country-matcher library.
//!
//! Classification itself never fails: a point either gets a country code or
//! it doesn't. Errors only arise at the edges, when loading boundary data.

use std::fmt;

/// Error type for boundary loading operations.
#[derive(Debug, Clone)]
pub enum CountryMatchError {
    /// The boundary document is not valid GeoJSON for a FeatureCollection
    InvalidGeoJson { message: String },
    /// A feature carries a geometry type other than Polygon/MultiPolygon
    UnsupportedGeometry {
        country_code: String,
        geometry_type: String,
    },
    /// HTTP/transport error while fetching boundaries
    HttpError {
        message: String,
        status_code: Option<u16>,
    },
    /// No boundary collection has been loaded yet
    BoundariesUnavailable,
}

impl fmt::Display for CountryMatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountryMatchError::InvalidGeoJson { message } => {
                write!(f, "Invalid boundary GeoJSON: {}", message)
            }
            CountryMatchError::UnsupportedGeometry {
                country_code,
                geometry_type,
            } => {
                write!(
                    f,
                    "Feature '{}' has unsupported geometry type '{}'",
                    country_code, geometry_type
                )
            }
            CountryMatchError::HttpError {
                message,
                status_code,
            } => {
                if let Some(code) = status_code {
                    write!(f, "HTTP error ({}): {}", code, message)
                } else {
                    write!(f, "HTTP error: {}", message)
                }
            }
            CountryMatchError::BoundariesUnavailable => {
                write!(f, "Boundary data has not been loaded")
            }
        }
    }
}

impl std::error::Error for CountryMatchError {}

impl From<serde_json::Error> for CountryMatchError {
    fn from(err: serde_json::Error) -> Self {
        CountryMatchError::InvalidGeoJson {
            message: err.to_string(),
        }
    }
}

/// Result type alias for country-matcher operations.
pub type Result<T> = std::result::Result<T, CountryMatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CountryMatchError::HttpError {
            message: "Service Unavailable".to_string(),
            status_code: Some(503),
        };
        assert_eq!(err.to_string(), "HTTP error (503): Service Unavailable");

        let err = CountryMatchError::UnsupportedGeometry {
            country_code: "FR".to_string(),
            geometry_type: "Point".to_string(),
        };
        assert!(err.to_string().contains("FR"));
        assert!(err.to_string().contains("Point"));
    }

    #[test]
    fn test_from_serde_error() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: CountryMatchError = parse.unwrap_err().into();
        assert!(matches!(err, CountryMatchError::InvalidGeoJson { .. }));
    }
}
