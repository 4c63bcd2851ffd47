//! Map overlay lifecycle.
//!
//! One overlay set exists at a time: a polyline, one marker per record, at most
//! one accuracy circle and the shared info window. Every redraw tears the
//! previous set down completely (listeners included) before drawing.

use serde::Serialize;
use tracing::debug;

use crate::model::{HistoryDay, LocationRecord, TimezoneInfo, UserProfile};
use crate::timefmt::{format_clock, wall_clock, HourFormat};

/// Radius of the per-record marker circle, in meters.
pub const MARKER_RADIUS_M: f64 = 10.0;

/// Radius of the latest-location dot, in meters.
pub const LOCATION_RADIUS_M: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl From<&LocationRecord> for LatLng {
    fn from(record: &LocationRecord) -> Self {
        Self {
            lat: record.latitude,
            lng: record.longitude,
        }
    }
}

/// Serializes as a maps `LatLngBoundsLiteral`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl Bounds {
    /// Smallest box holding every point, or `None` for an empty path.
    pub fn enclosing(points: &[LatLng]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let start = Bounds {
            north: first.lat,
            south: first.lat,
            east: first.lng,
            west: first.lng,
        };
        Some(rest.iter().fold(start, |b, p| Bounds {
            north: b.north.max(p.lat),
            south: b.south.min(p.lat),
            east: b.east.max(p.lng),
            west: b.west.min(p.lng),
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolylineStyle {
    pub stroke_color: &'static str,
    pub stroke_opacity: f64,
    pub stroke_weight: u32,
    pub clickable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleStyle {
    pub stroke_color: &'static str,
    pub stroke_opacity: f64,
    pub stroke_weight: u32,
    pub fill_color: &'static str,
    pub fill_opacity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
}

pub const TRACK_STYLE: PolylineStyle = PolylineStyle {
    stroke_color: "#CC0000",
    stroke_opacity: 1.0,
    stroke_weight: 3,
    clickable: false,
};

pub const MARKER_STYLE: CircleStyle = CircleStyle {
    stroke_color: "#CC0000",
    stroke_opacity: 0.8,
    stroke_weight: 2,
    fill_color: "#CC0000",
    fill_opacity: 0.8,
    z_index: None,
};

pub const ACCURACY_STYLE: CircleStyle = CircleStyle {
    stroke_color: "#66CCFF",
    stroke_opacity: 0.8,
    stroke_weight: 2,
    fill_color: "#66CCFF",
    fill_opacity: 0.35,
    z_index: Some(10),
};

pub const LOCATION_STYLE: CircleStyle = CircleStyle {
    stroke_color: "#6699FF",
    stroke_opacity: 0.8,
    stroke_weight: 2,
    fill_color: "#6699FF",
    fill_opacity: 0.8,
    z_index: Some(11),
};

/// Drawing surface the overlays live on. Handles are opaque map objects.
pub trait MapSurface {
    type Handle;

    fn draw_polyline(&mut self, path: &[LatLng], style: &PolylineStyle) -> Self::Handle;

    fn draw_circle(&mut self, center: LatLng, radius_m: f64, style: &CircleStyle) -> Self::Handle;

    /// Report clicks on `target` as a selection of record `index`.
    fn listen_click(&mut self, target: &Self::Handle, index: usize);

    fn clear_listeners(&mut self, target: &Self::Handle);

    /// Remove an object from the map. The handle is consumed.
    fn detach(&mut self, target: Self::Handle);

    fn open_info(&mut self, at: LatLng, html: &str);

    fn close_info(&mut self);

    fn fit_bounds(&mut self, bounds: Bounds);

    fn center_on(&mut self, at: LatLng);
}

/// Escape text for inclusion in info-window HTML, attribute values included.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Google Maps directions to `record`, starting from wherever the viewer is.
pub fn directions_url(record: &LocationRecord) -> String {
    format!(
        "https://maps.google.com/maps?saddr=&daddr={},{}",
        record.latitude, record.longitude
    )
}

/// Info-window text for one record.
pub fn format_info(record: &LocationRecord, timezone: &TimezoneInfo, format: HourFormat) -> String {
    let clock = wall_clock(
        record.timestamp_ms,
        timezone.raw_offset_seconds,
        timezone.dst_offset_seconds,
    );
    let mut text = String::new();
    text.push_str(&format!("Latitude: {}<br/>", record.latitude));
    text.push_str(&format!("Longitude: {}<br/>", record.longitude));
    text.push_str(&format!("Accuracy: {}m<br/><br/>", record.accuracy));
    text.push_str(&format!("At: {} local time<br/>", format_clock(clock, format)));
    text.push_str(&format!("{}<br/>", escape_html(&timezone.id)));
    text.push_str(&format!("{}<br/>", escape_html(&timezone.name)));
    text
}

/// What the latest-location info window says about when the fix was taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixTime {
    pub day: String,
    pub time: String,
    pub age: String,
}

/// Info-window text for the latest location: who, a directions link and when.
pub fn format_latest_info(record: &LocationRecord, profile: &UserProfile, taken: &FixTime) -> String {
    let mut text = String::new();
    if let Some(picture) = profile.picture.as_deref() {
        text.push_str(&format!(
            "<img class='info-avatar' src='{}' height='50' width='50'> ",
            escape_html(picture)
        ));
    }
    text.push_str(&format!(
        "<strong>{}'s location</strong><br/>",
        escape_html(profile.display_name())
    ));
    text.push_str(&format!(
        "<a href='{}'>Directions Link</a><br/>",
        escape_html(&directions_url(record))
    ));
    text.push_str(&format!("Last updated on:<br/>{}<br/>", escape_html(&taken.day)));
    text.push_str(&format!("at: {}<br/>", escape_html(&taken.time)));
    text.push_str(&format!("{}<br/>", escape_html(&taken.age)));
    text
}

pub struct OverlayManager<M: MapSurface> {
    map: M,
    polyline: Option<M::Handle>,
    markers: Vec<M::Handle>,
    accuracy_circle: Option<M::Handle>,
    day: Option<HistoryDay>,
    selected: Option<usize>,
    /// Position and text of the latest-location info window, when that is shown.
    latest: Option<(LatLng, String)>,
    hour_format: HourFormat,
}

impl<M: MapSurface> OverlayManager<M> {
    pub fn new(map: M, hour_format: HourFormat) -> Self {
        Self {
            map,
            polyline: None,
            markers: Vec::new(),
            accuracy_circle: None,
            day: None,
            selected: None,
            latest: None,
            hour_format,
        }
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn has_polyline(&self) -> bool {
        self.polyline.is_some()
    }

    pub fn has_accuracy_circle(&self) -> bool {
        self.accuracy_circle.is_some()
    }

    pub fn hour_format(&self) -> HourFormat {
        self.hour_format
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Change the clock style. An open history info window is rewritten in place.
    pub fn set_hour_format(&mut self, format: HourFormat) {
        if self.hour_format == format {
            return;
        }
        self.hour_format = format;

        let Some(index) = self.selected else {
            return;
        };
        let Some(day) = self.day.as_ref() else {
            return;
        };
        if let Some(record) = day.locations.get(index) {
            let html = format_info(record, &day.timezone, format);
            self.map.open_info(LatLng::from(record), &html);
        }
    }

    /// Replace whatever is drawn with `day`. Returns the number of markers drawn.
    pub fn render(&mut self, day: &HistoryDay) -> usize {
        self.dispose();
        if day.is_empty() {
            debug!("No locations for {}; leaving map view unchanged", day.date);
            return 0;
        }

        let path: Vec<LatLng> = day.locations.iter().map(LatLng::from).collect();
        self.polyline = Some(self.map.draw_polyline(&path, &TRACK_STYLE));

        for (index, point) in path.iter().enumerate() {
            let marker = self
                .map
                .draw_circle(*point, MARKER_RADIUS_M, &MARKER_STYLE);
            self.map.listen_click(&marker, index);
            self.markers.push(marker);
        }

        if let Some(bounds) = Bounds::enclosing(&path) {
            self.map.fit_bounds(bounds);
        }
        self.day = Some(day.clone());
        debug!("Rendered {} locations for {}", self.markers.len(), day.date);
        self.markers.len()
    }

    /// Open the info window on record `index` and move the accuracy circle there.
    /// Returns the info text, or `None` if no such record is displayed.
    pub fn select_point(&mut self, index: usize) -> Option<String> {
        if let Some((at, html)) = &self.latest {
            if index != 0 {
                return None;
            }
            self.map.open_info(*at, html);
            return Some(html.clone());
        }

        let day = self.day.as_ref()?;
        let record = day.locations.get(index)?;
        let html = format_info(record, &day.timezone, self.hour_format);
        let center = LatLng::from(record);
        let radius = record.accuracy;

        if let Some(previous) = self.accuracy_circle.take() {
            self.map.detach(previous);
        }
        self.map.open_info(center, &html);
        self.accuracy_circle = Some(self.map.draw_circle(center, radius, &ACCURACY_STYLE));
        self.selected = Some(index);
        Some(html)
    }

    /// Replace whatever is drawn with a single latest-location fix: the
    /// accuracy circle, a small location dot and an open info window showing
    /// `html`. Clicking either circle reopens the window.
    pub fn show_latest(&mut self, record: &LocationRecord, html: String) {
        self.dispose();
        let center = LatLng::from(record);

        let accuracy = self
            .map
            .draw_circle(center, record.accuracy, &ACCURACY_STYLE);
        self.map.listen_click(&accuracy, 0);
        self.accuracy_circle = Some(accuracy);

        let dot = self
            .map
            .draw_circle(center, LOCATION_RADIUS_M, &LOCATION_STYLE);
        self.map.listen_click(&dot, 0);
        self.markers.push(dot);

        self.map.center_on(center);
        self.map.open_info(center, &html);
        self.latest = Some((center, html));
    }

    /// Remove every overlay from the map. Safe to call when nothing is drawn.
    pub fn dispose(&mut self) {
        for marker in self.markers.drain(..) {
            self.map.clear_listeners(&marker);
            self.map.detach(marker);
        }
        if let Some(polyline) = self.polyline.take() {
            self.map.detach(polyline);
        }
        if let Some(circle) = self.accuracy_circle.take() {
            self.map.clear_listeners(&circle);
            self.map.detach(circle);
        }
        self.map.close_info();
        self.day = None;
        self.selected = None;
        self.latest = None;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use super::*;

    /// Keeps every live object so tests can look for leaks.
    #[derive(Default)]
    struct RecordingMap {
        next_id: u32,
        polylines: HashMap<u32, Vec<LatLng>>,
        circles: HashMap<u32, (LatLng, f64, CircleStyle)>,
        listeners: HashMap<u32, usize>,
        info: Option<(LatLng, String)>,
        fitted: Vec<Bounds>,
        centered: Vec<LatLng>,
        detached: HashSet<u32>,
    }

    impl MapSurface for RecordingMap {
        type Handle = u32;

        fn draw_polyline(&mut self, path: &[LatLng], _style: &PolylineStyle) -> u32 {
            self.next_id += 1;
            self.polylines.insert(self.next_id, path.to_vec());
            self.next_id
        }

        fn draw_circle(&mut self, center: LatLng, radius_m: f64, style: &CircleStyle) -> u32 {
            self.next_id += 1;
            self.circles
                .insert(self.next_id, (center, radius_m, style.clone()));
            self.next_id
        }

        fn listen_click(&mut self, target: &u32, index: usize) {
            self.listeners.insert(*target, index);
        }

        fn clear_listeners(&mut self, target: &u32) {
            self.listeners.remove(target);
        }

        fn detach(&mut self, target: u32) {
            assert!(self.detached.insert(target), "object {} detached twice", target);
            self.polylines.remove(&target);
            self.circles.remove(&target);
        }

        fn open_info(&mut self, at: LatLng, html: &str) {
            self.info = Some((at, html.to_string()));
        }

        fn close_info(&mut self) {
            self.info = None;
        }

        fn fit_bounds(&mut self, bounds: Bounds) {
            self.fitted.push(bounds);
        }

        fn center_on(&mut self, at: LatLng) {
            self.centered.push(at);
        }
    }

    fn record(lat: f64, lng: f64, accuracy: f64, timestamp_ms: i64) -> LocationRecord {
        LocationRecord {
            latitude: lat,
            longitude: lng,
            accuracy,
            timestamp_ms,
        }
    }

    fn day_with(locations: Vec<LocationRecord>) -> HistoryDay {
        HistoryDay {
            date: chrono::NaiveDate::from_ymd_opt(2013, 9, 24).unwrap(),
            locations,
            timezone: TimezoneInfo {
                raw_offset_seconds: 0,
                dst_offset_seconds: 3600,
                id: "Europe/London".to_string(),
                name: "British Summer Time".to_string(),
            },
        }
    }

    fn three_points() -> HistoryDay {
        day_with(vec![
            record(55.94, -3.19, 30.0, 0),
            record(55.95, -3.21, 15.0, 60_000),
            record(55.93, -3.18, 50.0, 120_000),
        ])
    }

    #[test]
    fn test_render_draws_one_marker_and_vertex_per_record_in_order() {
        let mut overlays = OverlayManager::new(RecordingMap::default(), HourFormat::TwelveHour);
        let day = three_points();

        assert_eq!(overlays.render(&day), 3);

        let map = overlays.map();
        assert_eq!(map.polylines.len(), 1);
        let path = map.polylines.values().next().unwrap();
        let expected: Vec<LatLng> = day.locations.iter().map(LatLng::from).collect();
        assert_eq!(path, &expected);
        assert_eq!(map.circles.len(), 3);
        let mut indices: Vec<usize> = map.listeners.values().copied().collect();
        indices.sort();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(
            map.fitted,
            vec![Bounds {
                north: 55.95,
                south: 55.93,
                east: -3.18,
                west: -3.21
            }]
        );
    }

    #[test]
    fn test_rerender_disposes_previous_set() {
        let mut overlays = OverlayManager::new(RecordingMap::default(), HourFormat::TwelveHour);
        overlays.render(&three_points());
        overlays.select_point(1);

        overlays.render(&day_with(vec![record(1.0, 2.0, 5.0, 0)]));

        let map = overlays.map();
        assert_eq!(map.polylines.len(), 1);
        assert_eq!(map.circles.len(), 1);
        assert_eq!(map.listeners.len(), 1);
        assert!(map.info.is_none());
        assert!(!overlays.has_accuracy_circle());
    }

    #[test]
    fn test_dispose_twice_leaves_map_empty() {
        let mut overlays = OverlayManager::new(RecordingMap::default(), HourFormat::TwelveHour);
        overlays.render(&three_points());
        overlays.select_point(0);

        overlays.dispose();
        overlays.dispose();

        let map = overlays.map();
        assert!(map.polylines.is_empty());
        assert!(map.circles.is_empty());
        assert!(map.listeners.is_empty());
        assert!(map.info.is_none());
        assert_eq!(overlays.marker_count(), 0);
        assert!(!overlays.has_polyline());
    }

    #[test]
    fn test_dispose_without_overlays_is_harmless() {
        let mut overlays = OverlayManager::new(RecordingMap::default(), HourFormat::TwelveHour);
        overlays.dispose();
        assert!(overlays.map().detached.is_empty());
    }

    #[test]
    fn test_empty_day_leaves_view_unchanged() {
        let mut overlays = OverlayManager::new(RecordingMap::default(), HourFormat::TwelveHour);
        overlays.render(&three_points());

        assert_eq!(overlays.render(&day_with(vec![])), 0);

        let map = overlays.map();
        assert!(map.polylines.is_empty());
        assert!(map.circles.is_empty());
        assert_eq!(map.fitted.len(), 1);
    }

    #[test]
    fn test_select_point_keeps_single_accuracy_circle() {
        let mut overlays = OverlayManager::new(RecordingMap::default(), HourFormat::TwentyFourHour);
        overlays.render(&three_points());

        overlays.select_point(0).unwrap();
        let html = overlays.select_point(2).unwrap();

        let map = overlays.map();
        let accuracy: Vec<_> = map
            .circles
            .values()
            .filter(|(_, _, style)| *style == ACCURACY_STYLE)
            .collect();
        assert_eq!(accuracy.len(), 1);
        assert_eq!(accuracy[0].0, LatLng { lat: 55.93, lng: -3.18 });
        assert_eq!(accuracy[0].1, 50.0);
        let (at, text) = map.info.as_ref().unwrap();
        assert_eq!(*at, LatLng { lat: 55.93, lng: -3.18 });
        assert_eq!(text, &html);
        assert!(html.contains("At: 01:02:00 local time"));
    }

    #[test]
    fn test_select_point_out_of_range() {
        let mut overlays = OverlayManager::new(RecordingMap::default(), HourFormat::TwelveHour);
        assert!(overlays.select_point(0).is_none());
        overlays.render(&three_points());
        assert!(overlays.select_point(3).is_none());
        assert!(!overlays.has_accuracy_circle());
    }

    #[test]
    fn test_format_info_layout() {
        let day = three_points();
        let text = format_info(&day.locations[0], &day.timezone, HourFormat::TwelveHour);
        assert_eq!(
            text,
            "Latitude: 55.94<br/>Longitude: -3.19<br/>Accuracy: 30m<br/><br/>\
             At: 1:00:00 AM local time<br/>Europe/London<br/>British Summer Time<br/>"
        );
    }

    #[test]
    fn test_format_info_escapes_timezone_text() {
        let mut day = three_points();
        day.timezone.id = "<b>Zone</b>".to_string();
        day.timezone.name = "Fish & Chips Time".to_string();

        let text = format_info(&day.locations[0], &day.timezone, HourFormat::TwelveHour);

        assert!(text.contains("&lt;b&gt;Zone&lt;/b&gt;<br/>"));
        assert!(text.contains("Fish &amp; Chips Time<br/>"));
        assert!(!text.contains("<b>"));
    }

    #[test]
    fn test_hour_format_change_rewrites_open_info() {
        let mut overlays = OverlayManager::new(RecordingMap::default(), HourFormat::TwelveHour);
        overlays.render(&three_points());
        overlays.select_point(2);
        let circles_before = overlays.map().circles.len();

        overlays.set_hour_format(HourFormat::TwentyFourHour);

        let (at, text) = overlays.map().info.clone().unwrap();
        assert_eq!(at, LatLng { lat: 55.93, lng: -3.18 });
        assert!(text.contains("At: 01:02:00 local time"));
        assert_eq!(overlays.map().circles.len(), circles_before);
        assert_eq!(overlays.selected(), Some(2));
    }

    #[test]
    fn test_hour_format_change_without_selection_keeps_info_closed() {
        let mut overlays = OverlayManager::new(RecordingMap::default(), HourFormat::TwelveHour);
        overlays.render(&three_points());

        overlays.set_hour_format(HourFormat::TwentyFourHour);

        assert!(overlays.map().info.is_none());
        assert_eq!(overlays.hour_format(), HourFormat::TwentyFourHour);
    }

    fn fix_time() -> FixTime {
        FixTime {
            day: "Tue Sep 24 2013".to_string(),
            time: "11:15:42".to_string(),
            age: "5 minutes ago".to_string(),
        }
    }

    #[test]
    fn test_latest_info_names_user_and_links_directions() {
        let profile = UserProfile {
            name: Some("Neil <admin>".to_string()),
            picture: Some("https://example.com/me.png".to_string()),
            ..Default::default()
        };

        let text = format_latest_info(&record(55.94, -3.19, 20.0, 0), &profile, &fix_time());

        assert!(text.starts_with("<img class='info-avatar' src='https://example.com/me.png'"));
        assert!(text.contains("<strong>Neil &lt;admin&gt;'s location</strong>"));
        assert!(text.contains(
            "<a href='https://maps.google.com/maps?saddr=&amp;daddr=55.94,-3.19'>Directions Link</a>"
        ));
        assert!(text.contains("Last updated on:<br/>Tue Sep 24 2013<br/>at: 11:15:42<br/>5 minutes ago<br/>"));
    }

    #[test]
    fn test_latest_info_without_picture() {
        let text = format_latest_info(&record(1.0, 2.0, 5.0, 0), &UserProfile::default(), &fix_time());
        assert!(!text.contains("<img"));
        assert!(text.starts_with("<strong>Signed in's location</strong>"));
    }

    #[test]
    fn test_show_latest_draws_dot_and_accuracy_circle() {
        let mut overlays = OverlayManager::new(RecordingMap::default(), HourFormat::TwelveHour);
        overlays.render(&three_points());
        let fix = record(55.94, -3.19, 20.0, 0);

        overlays.show_latest(&fix, "latest".to_string());

        let map = overlays.map();
        assert!(map.polylines.is_empty());
        assert_eq!(map.circles.len(), 2);
        let mut radii: Vec<(f64, &str)> = map
            .circles
            .values()
            .map(|(_, radius, style)| (*radius, style.fill_color))
            .collect();
        radii.sort_by(|a, b| a.0.total_cmp(&b.0));
        assert_eq!(radii, vec![(LOCATION_RADIUS_M, "#6699FF"), (20.0, "#66CCFF")]);
        assert_eq!(map.listeners.len(), 2);
        assert!(map.listeners.values().all(|index| *index == 0));
        assert_eq!(map.centered, vec![LatLng { lat: 55.94, lng: -3.19 }]);
        assert_eq!(map.info.as_ref().map(|(_, text)| text.as_str()), Some("latest"));
    }

    #[test]
    fn test_latest_click_reopens_info_and_dispose_clears_it() {
        let mut overlays = OverlayManager::new(RecordingMap::default(), HourFormat::TwelveHour);
        overlays.show_latest(&record(1.0, 2.0, 5.0, 0), "latest".to_string());
        overlays.map.close_info();

        assert_eq!(overlays.select_point(0).as_deref(), Some("latest"));
        assert!(overlays.select_point(1).is_none());
        assert!(overlays.map().info.is_some());

        overlays.dispose();
        let map = overlays.map();
        assert!(map.circles.is_empty());
        assert!(map.listeners.is_empty());
        assert!(overlays.select_point(0).is_none());
    }

    #[test]
    fn test_bounds_of_empty_path() {
        assert!(Bounds::enclosing(&[]).is_none());
    }
}
