mod model;

pub use model::{coerce_value, is_year_key, point_mean, ring_center, FireDataset, FireFeature, LineString};

use crate::error::LoadError;
use crate::map::MapRenderer;
use anyhow::{Context, Result};
use geojson::{GeoJson, Geometry, Value};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use tracing::{info, warn};

/// Where the fire feature collection comes from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataSource {
    File(PathBuf),
    Url(String),
}

impl DataSource {
    /// `http://` and `https://` are fetched, anything else is a path
    pub fn parse(s: &str) -> Self {
        if s.starts_with("http://") || s.starts_with("https://") {
            DataSource::Url(s.to_string())
        } else {
            DataSource::File(PathBuf::from(s))
        }
    }

    /// Read the raw document
    pub fn fetch(&self) -> Result<String, LoadError> {
        match self {
            DataSource::File(path) => fs::read_to_string(path).map_err(|source| LoadError::Io {
                path: path.clone(),
                source,
            }),
            DataSource::Url(url) => {
                let http = |source| LoadError::Http {
                    url: url.clone(),
                    source,
                };
                reqwest::blocking::get(url)
                    .and_then(|r| r.error_for_status())
                    .and_then(|r| r.text())
                    .map_err(http)
            }
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::File(path) => write!(f, "{}", path.display()),
            DataSource::Url(url) => f.write_str(url),
        }
    }
}

/// Fetch and parse the dataset
pub fn load_dataset(source: &DataSource, identity_field: &str) -> Result<FireDataset, LoadError> {
    let text = source.fetch()?;
    let dataset = parse_dataset(&text, identity_field)?;
    info!(
        %source,
        features = dataset.features.len(),
        years = dataset.attributes.len(),
        "loaded fire data"
    );
    Ok(dataset)
}

/// Load on a background thread. The receiver yields exactly one result.
pub fn spawn_load(source: DataSource, identity_field: String) -> Receiver<Result<FireDataset, LoadError>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let result = load_dataset(&source, &identity_field);
        if let Err(e) = &result {
            warn!(%source, "fire data unavailable: {e}");
        }
        // The UI may have quit already; nothing to do then
        let _ = tx.send(result);
    });
    rx
}

/// Build a typed dataset from a GeoJSON FeatureCollection
pub fn parse_dataset(text: &str, identity_field: &str) -> Result<FireDataset, LoadError> {
    let geojson: GeoJson = text.parse()?;
    let GeoJson::FeatureCollection(fc) = geojson else {
        return Err(LoadError::NotFeatureCollection);
    };

    let first = fc.features.first().ok_or(LoadError::Empty)?;
    let attributes: Vec<String> = first
        .properties
        .iter()
        .flat_map(|props| props.keys())
        .filter(|k| is_year_key(k))
        .cloned()
        .collect();
    if attributes.is_empty() {
        return Err(LoadError::NoYearAttributes);
    }

    let mut features = Vec::with_capacity(fc.features.len());
    for feature in &fc.features {
        let props = feature.properties.as_ref();

        let identity = props
            .and_then(|p| p.get(identity_field))
            .map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| "Unknown".to_string());

        let values_by_year = attributes
            .iter()
            .filter_map(|attr| {
                let raw = props?.get(attr)?;
                coerce_value(raw).map(|v| (attr.clone(), v))
            })
            .collect();

        let mut outlines = Vec::new();
        let mut point = None;
        if let Some(ref geometry) = feature.geometry {
            point = geometry_point(geometry);
            process_geometry_lines(geometry, &mut |line| outlines.push(line));
        }

        let anchor = point.or_else(|| {
            let centers: Vec<(f64, f64)> = outlines.iter().filter_map(|l| ring_center(l)).collect();
            point_mean(&centers)
        });
        let Some((lon, lat)) = anchor else {
            warn!(%identity, "skipping feature without usable geometry");
            continue;
        };

        features.push(FireFeature {
            identity,
            lon,
            lat,
            outlines,
            values_by_year,
        });
    }

    if features.is_empty() {
        return Err(LoadError::NoGeometry);
    }

    Ok(FireDataset {
        features,
        attributes,
    })
}

/// Load an optional basemap (state outlines, coastlines) into the map renderer
pub fn load_basemap(renderer: &mut MapRenderer, path: &Path) -> Result<()> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read basemap {}", path.display()))?;
    let geojson: GeoJson = content
        .parse()
        .with_context(|| format!("invalid basemap GeoJSON in {}", path.display()))?;
    let before = renderer.basemap.len();
    process_geojson_lines(&geojson, |line| renderer.add_basemap_line(line));
    info!(path = %path.display(), lines = renderer.basemap.len() - before, "loaded basemap");
    Ok(())
}

/// Position of a point geometry, if it is one
fn geometry_point(geometry: &Geometry) -> Option<(f64, f64)> {
    match &geometry.value {
        Value::Point(c) if c.len() >= 2 => Some((c[0], c[1])),
        Value::MultiPoint(points) => {
            let pts: Vec<(f64, f64)> = points
                .iter()
                .filter(|c| c.len() >= 2)
                .map(|c| (c[0], c[1]))
                .collect();
            point_mean(&pts)
        }
        _ => None,
    }
}

/// Process GeoJSON and extract line features
fn process_geojson_lines<F>(geojson: &GeoJson, mut add_line: F)
where
    F: FnMut(LineString),
{
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            for feature in &fc.features {
                if let Some(ref geometry) = feature.geometry {
                    process_geometry_lines(geometry, &mut add_line);
                }
            }
        }
        GeoJson::Feature(f) => {
            if let Some(ref geometry) = f.geometry {
                process_geometry_lines(geometry, &mut add_line);
            }
        }
        GeoJson::Geometry(geometry) => {
            process_geometry_lines(geometry, &mut add_line);
        }
    }
}

/// Lines and exterior rings of a geometry, holes dropped
fn process_geometry_lines<F>(geometry: &Geometry, add_line: &mut F)
where
    F: FnMut(LineString),
{
    let to_line = |coords: &Vec<Vec<f64>>| -> LineString {
        coords
            .iter()
            .filter(|c| c.len() >= 2)
            .map(|c| (c[0], c[1]))
            .collect()
    };

    match &geometry.value {
        Value::LineString(coords) => add_line(to_line(coords)),
        Value::MultiLineString(lines) => lines.iter().for_each(|l| add_line(to_line(l))),
        Value::Polygon(rings) => {
            if let Some(exterior) = rings.first() {
                add_line(to_line(exterior));
            }
        }
        Value::MultiPolygon(polygons) => {
            for exterior in polygons.iter().filter_map(|rings| rings.first()) {
                add_line(to_line(exterior));
            }
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                process_geometry_lines(g, add_line);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;

    /// Serve one HTTP response on localhost and return the URL to fetch
    fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap() > 0 && line != "\r\n" {
                line.clear();
            }
            write!(
                stream,
                "HTTP/1.1 {status}\r\nContent-Type: application/geo+json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
            .unwrap();
        });
        format!("http://{addr}/fires.geojson")
    }

    const FIRES: &str = r#"{
      "type": "FeatureCollection",
      "features": [
        {
          "type": "Feature",
          "geometry": { "type": "Point", "coordinates": [-122.8, 39.1] },
          "properties": { "COUNTY": "Lake", "2019": 700, "2015": 76000, "FIPS": "033", "2017": "1200" }
        },
        {
          "type": "Feature",
          "geometry": {
            "type": "Polygon",
            "coordinates": [[[-122.0, 38.0], [-121.0, 38.0], [-121.0, 39.0], [-122.0, 39.0], [-122.0, 38.0]]]
          },
          "properties": { "COUNTY": "Napa", "2019": null, "2015": 4500, "2017": "n/a" }
        },
        {
          "type": "Feature",
          "geometry": null,
          "properties": { "COUNTY": "Nowhere", "2019": 1, "2015": 1, "2017": 1 }
        }
      ]
    }"#;

    #[test]
    fn test_attributes_keep_source_order() {
        let ds = parse_dataset(FIRES, "COUNTY").unwrap();
        assert_eq!(ds.attributes, vec!["2019", "2015", "2017"]);
    }

    #[test]
    fn test_typed_features() {
        let ds = parse_dataset(FIRES, "COUNTY").unwrap();
        // Feature without geometry is dropped
        assert_eq!(ds.features.len(), 2);

        let lake = &ds.features[0];
        assert_eq!(lake.identity, "Lake");
        assert_eq!((lake.lon, lake.lat), (-122.8, 39.1));
        assert_eq!(lake.value("2015"), Some(76000.0));
        assert_eq!(lake.value("2017"), Some(1200.0));
        assert!(lake.outlines.is_empty());

        let napa = &ds.features[1];
        assert_eq!(napa.value("2019"), None);
        assert_eq!(napa.value("2017"), None);
        assert_eq!(napa.outlines.len(), 1);
        assert_eq!((napa.lon, napa.lat), (-121.5, 38.5));
    }

    #[test]
    fn test_missing_identity_field() {
        let ds = parse_dataset(FIRES, "NAME").unwrap();
        assert!(ds.features.iter().all(|f| f.identity == "Unknown"));
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            parse_dataset(r#"{"type": "Point", "coordinates": [0, 0]}"#, "COUNTY"),
            Err(LoadError::NotFeatureCollection)
        ));
        assert!(matches!(
            parse_dataset(r#"{"type": "FeatureCollection", "features": []}"#, "COUNTY"),
            Err(LoadError::Empty)
        ));
        let no_years = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [0, 0]},
             "properties": {"COUNTY": "X", "acres": 10}}]}"#;
        assert!(matches!(
            parse_dataset(no_years, "COUNTY"),
            Err(LoadError::NoYearAttributes)
        ));
        assert!(matches!(parse_dataset("not json", "COUNTY"), Err(LoadError::GeoJson(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FIRES.as_bytes()).unwrap();
        let source = DataSource::File(file.path().to_path_buf());
        let ds = load_dataset(&source, "COUNTY").unwrap();
        assert_eq!(ds.attribute_count(), 3);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let source = DataSource::parse("/definitely/not/here.geojson");
        assert!(matches!(source.fetch(), Err(LoadError::Io { .. })));
    }

    #[test]
    fn test_load_from_url() {
        let source = DataSource::parse(&serve_once("200 OK", FIRES));
        assert!(matches!(source, DataSource::Url(_)));
        let ds = load_dataset(&source, "COUNTY").unwrap();
        assert_eq!(ds.features.len(), 2);
        assert_eq!(ds.attributes, vec!["2019", "2015", "2017"]);
    }

    #[test]
    fn test_url_error_status_is_http_error() {
        let url = serve_once("404 Not Found", "");
        let source = DataSource::parse(&url);
        match source.fetch() {
            Err(LoadError::Http { url: failed, source }) => {
                assert_eq!(failed, url);
                assert_eq!(source.status(), Some(reqwest::StatusCode::NOT_FOUND));
            }
            other => panic!("expected an HTTP error, got {other:?}"),
        }
    }

    #[test]
    fn test_multipoint_anchor_is_plain_mean() {
        let text = r#"{"type": "FeatureCollection", "features": [{
            "type": "Feature",
            "geometry": {"type": "MultiPoint", "coordinates": [[0, 0], [3, 0], [0, 0]]},
            "properties": {"COUNTY": "Spread", "2015": 10}
        }]}"#;
        let ds = parse_dataset(text, "COUNTY").unwrap();
        assert_eq!((ds.features[0].lon, ds.features[0].lat), (1.0, 0.0));
    }

    #[test]
    fn test_spawn_load_delivers_once() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FIRES.as_bytes()).unwrap();
        let rx = spawn_load(DataSource::File(file.path().to_path_buf()), "COUNTY".into());
        let ds = rx.recv().unwrap().unwrap();
        assert_eq!(ds.features.len(), 2);
        assert!(rx.recv().is_err());
    }

    #[test]
    fn test_source_parse() {
        assert_eq!(
            DataSource::parse("http://localhost:8000/fires.geojson"),
            DataSource::Url("http://localhost:8000/fires.geojson".into())
        );
        assert_eq!(
            DataSource::parse("data/firedata.geojson"),
            DataSource::File(PathBuf::from("data/firedata.geojson"))
        );
    }

    #[test]
    fn test_load_basemap() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"{"type": "Feature", "properties": {},
                 "geometry": {"type": "MultiLineString", "coordinates": [[[0, 0], [1, 1]], [[2, 2], [3, 3]]]}}"#,
        )
        .unwrap();
        let mut renderer = MapRenderer::new();
        load_basemap(&mut renderer, file.path()).unwrap();
        assert_eq!(renderer.basemap.len(), 2);
        assert!(load_basemap(&mut renderer, Path::new("/nope.json")).is_err());
    }
}
