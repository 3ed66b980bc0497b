/// Outbreak map: markers, popups, view state and GeoJSON export.
///
/// One marker per report, placed at the report's coordinates and styled by
/// `diseases::classify`. View state (centre, zoom) belongs to the map and is
/// never touched by a data refresh.
///
/// # Coordinate policy
/// Reports whose coordinates are non-finite or outside WGS84 bounds are not
/// plotted. Each one is recorded as a `CoordinateWarning` and logged, so
/// `markers().len() + warnings().len()` always equals the number of reports
/// last shown.

use std::fmt;

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};

use crate::diseases::{self, ClassificationDescriptor, LegendEntry};
use crate::logging::{self, DataSource};
use crate::model::{Coordinates, Report, ReportId};

/// Geographic centroid of India, the initial view.
pub const DEFAULT_CENTER: Coordinates = Coordinates {
    lat: 20.5937,
    long: 78.9629,
};
pub const DEFAULT_ZOOM: u8 = 5;
pub const MAX_ZOOM: u8 = 19;

pub const TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const TILE_ATTRIBUTION: &str =
    "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors";

// ---------------------------------------------------------------------------
// View state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapView {
    pub center: Coordinates,
    pub zoom: u8,
}

impl Default for MapView {
    fn default() -> Self {
        Self {
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
        }
    }
}

impl MapView {
    /// Builds a view, clamping zoom to the tile server's range.
    pub fn new(center: Coordinates, zoom: u8) -> Self {
        Self {
            center,
            zoom: zoom.min(MAX_ZOOM),
        }
    }
}

// ---------------------------------------------------------------------------
// Markers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub report_id: ReportId,
    pub position: Coordinates,
    /// Raw classifier label of the report.
    pub label: String,
    pub descriptor: ClassificationDescriptor,
}

impl Marker {
    /// Popup text: the human-readable disease name.
    pub fn popup(&self) -> &str {
        &self.descriptor.display_name
    }

    pub fn icon_url(&self) -> String {
        self.descriptor.marker.icon_url()
    }
}

/// A report that was not plotted because of its coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateWarning {
    pub report_id: ReportId,
    pub lat: f64,
    pub long: f64,
}

impl fmt::Display for CoordinateWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "report {} has out-of-range coordinates ({}, {}); not plotted",
            self.report_id, self.lat, self.long
        )
    }
}

/// Turns reports into markers, splitting off those with unusable coordinates.
pub fn build_markers(reports: &[Report]) -> (Vec<Marker>, Vec<CoordinateWarning>) {
    let mut markers = Vec::with_capacity(reports.len());
    let mut warnings = Vec::new();

    for report in reports {
        if !report.has_valid_coordinates() {
            warnings.push(CoordinateWarning {
                report_id: report.id.clone(),
                lat: report.lat,
                long: report.long,
            });
            continue;
        }
        markers.push(Marker {
            report_id: report.id.clone(),
            position: Coordinates::new(report.lat, report.long),
            label: report.disease.clone(),
            descriptor: diseases::classify(&report.disease),
        });
    }

    (markers, warnings)
}

// ---------------------------------------------------------------------------
// Map
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct OutbreakMap {
    view: MapView,
    markers: Vec<Marker>,
    warnings: Vec<CoordinateWarning>,
}

impl OutbreakMap {
    pub fn new(view: MapView) -> Self {
        Self {
            view,
            markers: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn view(&self) -> MapView {
        self.view
    }

    /// User pan/zoom. Independent of the report data.
    pub fn set_view(&mut self, view: MapView) {
        self.view = MapView::new(view.center, view.zoom);
    }

    /// Replaces all markers with those for `reports`. The view is unchanged.
    pub fn show_reports(&mut self, reports: &[Report]) {
        let (markers, warnings) = build_markers(reports);
        for w in &warnings {
            let subject = w.report_id.to_string();
            logging::warn(DataSource::Map, Some(&subject), &w.to_string());
        }
        logging::debug(
            DataSource::Map,
            None,
            &format!("{} markers, {} skipped", markers.len(), warnings.len()),
        );
        self.markers = markers;
        self.warnings = warnings;
    }

    /// Removes every marker (e.g. after a failed fetch).
    pub fn clear(&mut self) {
        self.markers.clear();
        self.warnings.clear();
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn warnings(&self) -> &[CoordinateWarning] {
        &self.warnings
    }

    pub fn legend(&self) -> Vec<LegendEntry> {
        diseases::legend_entries()
    }

    /// Markers as a GeoJSON FeatureCollection of Points.
    pub fn to_geojson(&self) -> FeatureCollection {
        let features = self.markers.iter().map(marker_feature).collect();
        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }
}

fn marker_feature(marker: &Marker) -> Feature {
    // GeoJSON positions are [longitude, latitude].
    let geometry = Geometry::new(Value::Point(vec![marker.position.long, marker.position.lat]));

    let id = match &marker.report_id {
        ReportId::Number(n) => geojson::feature::Id::Number((*n).into()),
        ReportId::Text(s) => geojson::feature::Id::String(s.clone()),
    };

    let mut properties = JsonObject::new();
    properties.insert("disease".to_string(), marker.label.clone().into());
    properties.insert("display_name".to_string(), marker.popup().to_string().into());
    properties.insert("marker-color".to_string(), marker.descriptor.marker.hex().into());
    properties.insert("icon_url".to_string(), marker.icon_url().into());
    properties.insert("known".to_string(), marker.descriptor.known.into());

    Feature {
        bbox: None,
        geometry: Some(geometry),
        id: Some(id),
        properties: Some(properties),
        foreign_members: None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
