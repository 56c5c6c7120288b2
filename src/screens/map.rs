// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Map screen: markers for located log entries around the user.

use crate::backend::Backend;
use crate::models::{Location, LogEntry, RecordId};
use crate::screens::{Notice, Notices, ViewState};
use crate::services::{LocationError, LocationService, LogService};
use geo::{BoundingRect, MultiPoint, Point};
use geojson::{feature::Id, Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use std::fmt;

/// Centre used when the user's position is unknown.
pub const DEFAULT_CENTER: (f64, f64) = (37.78825, -122.4324);
pub const DEFAULT_LATITUDE_DELTA: f64 = 0.0922;
pub const DEFAULT_LONGITUDE_DELTA: f64 = 0.0421;

const FIT_PADDING: f64 = 1.2;
const MIN_FIT_DELTA: f64 = 0.01;

/// Visible map area: a centre plus its span in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapRegion {
    pub latitude: f64,
    pub longitude: f64,
    pub latitude_delta: f64,
    pub longitude_delta: f64,
}

impl Default for MapRegion {
    fn default() -> Self {
        Self {
            latitude: DEFAULT_CENTER.0,
            longitude: DEFAULT_CENTER.1,
            latitude_delta: DEFAULT_LATITUDE_DELTA,
            longitude_delta: DEFAULT_LONGITUDE_DELTA,
        }
    }
}

impl MapRegion {
    /// Default span centred on `location`.
    pub fn centered(location: Location) -> Self {
        Self {
            latitude: location.latitude,
            longitude: location.longitude,
            ..Self::default()
        }
    }

    pub fn contains(&self, location: Location) -> bool {
        (location.latitude - self.latitude).abs() <= self.latitude_delta / 2.0
            && (location.longitude - self.longitude).abs() <= self.longitude_delta / 2.0
    }
}

/// A pin for one log entry.
#[derive(Debug, Clone, PartialEq)]
pub struct MapMarker {
    pub id: RecordId,
    pub title: String,
    pub description: String,
    pub location: Location,
    pub user_id: uuid::Uuid,
}

impl MapMarker {
    pub fn from_entry(entry: &LogEntry) -> Option<Self> {
        let location = entry.location?;
        Some(Self {
            id: entry.id.clone(),
            title: entry.notes.clone(),
            description: entry.created_at.to_rfc2822(),
            location,
            user_id: entry.user_id,
        })
    }
}

/// Smallest region showing every marker, or `None` for no markers.
pub fn fit_region(markers: &[MapMarker]) -> Option<MapRegion> {
    let points: MultiPoint<f64> = markers
        .iter()
        .map(|m| Point::new(m.location.longitude, m.location.latitude))
        .collect();
    let rect = points.bounding_rect()?;
    let center = rect.center();
    Some(MapRegion {
        latitude: center.y,
        longitude: center.x,
        latitude_delta: (rect.height() * FIT_PADDING).max(MIN_FIT_DELTA),
        longitude_delta: (rect.width() * FIT_PADDING).max(MIN_FIT_DELTA),
    })
}

/// Markers as a GeoJSON feature collection of points.
pub fn to_geojson(markers: &[MapMarker]) -> GeoJson {
    let features = markers
        .iter()
        .map(|marker| {
            let mut properties = JsonObject::new();
            properties.insert("title".to_string(), marker.title.clone().into());
            properties.insert("description".to_string(), marker.description.clone().into());
            properties.insert("user_id".to_string(), marker.user_id.to_string().into());
            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Point(vec![
                    marker.location.longitude,
                    marker.location.latitude,
                ]))),
                id: Some(Id::String(marker.id.to_string())),
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    GeoJson::FeatureCollection(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

/// View model for the map.
pub struct MapScreen<B> {
    logs: LogService<B>,
    location: LocationService,
    region: MapRegion,
    user_location: Option<Location>,
    state: ViewState<Vec<MapMarker>>,
    pub notices: Notices,
}

impl<B: Backend> MapScreen<B> {
    pub fn new(logs: LogService<B>, location: LocationService) -> Self {
        Self {
            logs,
            location,
            region: MapRegion::default(),
            user_location: None,
            state: ViewState::Idle,
            notices: Notices::default(),
        }
    }

    pub fn region(&self) -> MapRegion {
        self.region
    }

    pub fn user_location(&self) -> Option<Location> {
        self.user_location
    }

    pub fn state(&self) -> &ViewState<Vec<MapMarker>> {
        &self.state
    }

    pub fn markers(&self) -> &[MapMarker] {
        self.state.data().map(Vec::as_slice).unwrap_or_default()
    }

    /// Centre on the user, then load markers.
    pub async fn mount(&mut self) {
        self.state = ViewState::Loading;
        self.locate().await;
        self.load_markers().await;
    }

    async fn locate(&mut self) {
        match self.location.current_position().await {
            Ok(location) => {
                self.user_location = Some(location);
                self.region = MapRegion::centered(location);
            }
            Err(LocationError::PermissionRequired) => {
                tracing::info!("Map shown without user location");
            }
            Err(e) => {
                self.notices.push(Notice::new(e.title(), e.user_message()));
            }
        }
    }

    async fn load_markers(&mut self) {
        match self.logs.list_located_entries().await {
            Ok(entries) => {
                let markers: Vec<MapMarker> =
                    entries.iter().filter_map(MapMarker::from_entry).collect();
                tracing::debug!(count = markers.len(), "Map markers loaded");
                self.state = ViewState::Loaded(markers);
            }
            Err(e) => {
                tracing::error!(error = %e, "Error fetching logs for map");
                self.notices
                    .push(Notice::error("Could not load log entries for the map."));
                self.state = ViewState::Failed(e.user_message());
            }
        }
    }

    /// Move the region to show every marker.
    pub fn fit_to_markers(&mut self) -> bool {
        match fit_region(self.markers()) {
            Some(region) => {
                self.region = region;
                true
            }
            None => false,
        }
    }
}

impl<B> fmt::Display for MapScreen<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Region: {:.5}, {:.5} (span {:.4} x {:.4})",
            self.region.latitude,
            self.region.longitude,
            self.region.latitude_delta,
            self.region.longitude_delta
        )?;
        if let Some(me) = self.user_location {
            writeln!(f, "You are at {:.6}, {:.6}", me.latitude, me.longitude)?;
        }
        match &self.state {
            ViewState::Idle | ViewState::Loading => writeln!(f, "Loading map..."),
            ViewState::Failed(reason) => writeln!(f, "Error: {}", reason),
            ViewState::Loaded(markers) => {
                writeln!(f, "{} marker(s)", markers.len())?;
                for marker in markers {
                    writeln!(
                        f,
                        "* {:.6}, {:.6}  {}",
                        marker.location.latitude, marker.location.longitude, marker.title
                    )?;
                }
                Ok(())
            }
        }
    }
}
