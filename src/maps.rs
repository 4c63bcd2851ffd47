//! Google Maps widget bindings and the [`MapSurface`] they provide.

use std::collections::HashMap;
use std::rc::Rc;

use serde::Serialize;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::config::ViewerConfig;
use crate::error::ViewerError;
use crate::overlay::{Bounds, CircleStyle, LatLng, MapSurface, PolylineStyle};

#[wasm_bindgen(js_namespace = ["google", "maps"])]
extern "C" {
    #[wasm_bindgen(js_name = Map)]
    type MapWidget;

    #[wasm_bindgen(constructor, js_class = "Map")]
    fn new(container: &web_sys::Element, options: &JsValue) -> MapWidget;

    #[wasm_bindgen(method, js_class = "Map", js_name = fitBounds)]
    fn fit_bounds(this: &MapWidget, bounds: &JsValue);

    #[wasm_bindgen(method, js_class = "Map", js_name = setCenter)]
    fn set_center(this: &MapWidget, center: &JsValue);

    type Polyline;

    #[wasm_bindgen(constructor)]
    fn new(options: &JsValue) -> Polyline;

    #[wasm_bindgen(method, js_name = setMap)]
    fn set_map(this: &Polyline, map: &JsValue);

    type Circle;

    #[wasm_bindgen(constructor)]
    fn new(options: &JsValue) -> Circle;

    #[wasm_bindgen(method, js_name = setMap)]
    fn set_map(this: &Circle, map: &JsValue);

    type InfoWindow;

    #[wasm_bindgen(constructor)]
    fn new(options: &JsValue) -> InfoWindow;

    #[wasm_bindgen(method, js_name = setContent)]
    fn set_content(this: &InfoWindow, content: &str);

    #[wasm_bindgen(method, js_name = setPosition)]
    fn set_position(this: &InfoWindow, position: &JsValue);

    #[wasm_bindgen(method)]
    fn open(this: &InfoWindow, map: &MapWidget);

    #[wasm_bindgen(method)]
    fn close(this: &InfoWindow);
}

#[wasm_bindgen(js_namespace = ["google", "maps", "event"])]
extern "C" {
    #[wasm_bindgen(js_name = addListener)]
    fn add_listener(instance: &JsValue, event: &str, handler: &js_sys::Function) -> JsValue;

    #[wasm_bindgen(js_name = clearInstanceListeners)]
    fn clear_instance_listeners(instance: &JsValue);
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MapOptions {
    zoom: u8,
    center: LatLng,
    map_type_id: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PolylineOptions<'a> {
    path: &'a [LatLng],
    #[serde(flatten)]
    style: &'a PolylineStyle,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CircleOptions<'a> {
    center: LatLng,
    radius: f64,
    #[serde(flatten)]
    style: &'a CircleStyle,
}

#[derive(Serialize)]
struct InfoWindowOptions {
    content: &'static str,
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, ViewerError> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| ViewerError::Map(e.to_string()))
}

enum Drawn {
    Polyline(Polyline),
    Circle(Circle),
}

impl Drawn {
    fn as_js(&self) -> &JsValue {
        match self {
            Drawn::Polyline(p) => p.as_ref(),
            Drawn::Circle(c) => c.as_ref(),
        }
    }

    fn remove_from_map(&self) {
        match self {
            Drawn::Polyline(p) => p.set_map(&JsValue::NULL),
            Drawn::Circle(c) => c.set_map(&JsValue::NULL),
        }
    }
}

/// Handle to an object drawn on a [`GoogleMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlayId(u32);

/// A Google Maps widget mounted in a container element.
///
/// Marker clicks are forwarded to `on_select` with the record index the
/// marker was registered with.
pub struct GoogleMap {
    widget: MapWidget,
    info_window: InfoWindow,
    objects: HashMap<OverlayId, Drawn>,
    listeners: HashMap<OverlayId, Closure<dyn FnMut()>>,
    next_id: u32,
    on_select: Rc<dyn Fn(usize)>,
}

impl GoogleMap {
    pub fn attach(
        container: &web_sys::Element,
        config: &ViewerConfig,
        on_select: Rc<dyn Fn(usize)>,
    ) -> Result<Self, ViewerError> {
        let options = to_js(&MapOptions {
            zoom: config.default_zoom,
            center: LatLng {
                lat: config.default_center.lat,
                lng: config.default_center.lng,
            },
            map_type_id: "roadmap",
        })?;
        let widget = MapWidget::new(container, &options);
        let info_window = InfoWindow::new(&to_js(&InfoWindowOptions { content: "" })?);

        Ok(Self {
            widget,
            info_window,
            objects: HashMap::new(),
            listeners: HashMap::new(),
            next_id: 0,
            on_select,
        })
    }

    fn insert(&mut self, drawn: Drawn) -> OverlayId {
        self.next_id += 1;
        let id = OverlayId(self.next_id);
        self.objects.insert(id, drawn);
        id
    }
}

impl MapSurface for GoogleMap {
    type Handle = OverlayId;

    fn draw_polyline(&mut self, path: &[LatLng], style: &PolylineStyle) -> OverlayId {
        let polyline = match to_js(&PolylineOptions { path, style }) {
            Ok(options) => Polyline::new(&options),
            Err(e) => {
                tracing::error!("Failed to build polyline options: {}", e);
                Polyline::new(&JsValue::UNDEFINED)
            }
        };
        polyline.set_map(&self.widget);
        self.insert(Drawn::Polyline(polyline))
    }

    fn draw_circle(&mut self, center: LatLng, radius_m: f64, style: &CircleStyle) -> OverlayId {
        let circle = match to_js(&CircleOptions {
            center,
            radius: radius_m,
            style,
        }) {
            Ok(options) => Circle::new(&options),
            Err(e) => {
                tracing::error!("Failed to build circle options: {}", e);
                Circle::new(&JsValue::UNDEFINED)
            }
        };
        circle.set_map(&self.widget);
        self.insert(Drawn::Circle(circle))
    }

    fn listen_click(&mut self, target: &OverlayId, index: usize) {
        let Some(drawn) = self.objects.get(target) else {
            return;
        };
        let on_select = Rc::clone(&self.on_select);
        let handler = Closure::<dyn FnMut()>::new(move || on_select(index));
        add_listener(drawn.as_js(), "click", handler.as_ref().unchecked_ref());
        self.listeners.insert(*target, handler);
    }

    fn clear_listeners(&mut self, target: &OverlayId) {
        if let Some(drawn) = self.objects.get(target) {
            clear_instance_listeners(drawn.as_js());
        }
        self.listeners.remove(target);
    }

    fn detach(&mut self, target: OverlayId) {
        if let Some(drawn) = self.objects.remove(&target) {
            drawn.remove_from_map();
        }
    }

    fn open_info(&mut self, at: LatLng, html: &str) {
        self.info_window.set_content(html);
        match to_js(&at) {
            Ok(position) => self.info_window.set_position(&position),
            Err(e) => tracing::error!("Failed to position info window: {}", e),
        }
        self.info_window.open(&self.widget);
    }

    fn close_info(&mut self) {
        self.info_window.close();
    }

    fn fit_bounds(&mut self, bounds: Bounds) {
        match to_js(&bounds) {
            Ok(literal) => self.widget.fit_bounds(&literal),
            Err(e) => tracing::error!("Failed to fit map bounds: {}", e),
        }
    }

    fn center_on(&mut self, at: LatLng) {
        match to_js(&at) {
            Ok(literal) => self.widget.set_center(&literal),
            Err(e) => tracing::error!("Failed to center map: {}", e),
        }
    }
}
