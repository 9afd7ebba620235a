use std::path::PathBuf;
use thiserror::Error;

/// Reasons the fire dataset could not be produced
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("expected a GeoJSON FeatureCollection")]
    NotFeatureCollection,

    #[error("feature collection has no features")]
    Empty,

    #[error("first feature has no year attributes (no property key contains a 4-digit year)")]
    NoYearAttributes,

    #[error("no feature has a usable geometry")]
    NoGeometry,
}
