use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, Local};
use leptos::html::Div;
use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::app::{AccessPhase, AppContext};
use crate::config::ViewerConfig;
use crate::error::ApiFailure;
use crate::maps::GoogleMap;
use crate::overlay::{directions_url, format_latest_info, FixTime, OverlayManager};
use crate::session::{API_ERROR_MESSAGE, NO_DATA_MESSAGE};
use crate::timefmt::describe_age;

#[derive(Debug, Clone, PartialEq)]
enum LatestView {
    Loading,
    Ready {
        user: String,
        picture: Option<String>,
        directions: String,
        taken: FixTime,
    },
    Missing,
    Failed(String),
}

#[component]
pub fn LatestPage() -> impl IntoView {
    let ctx = expect_context::<AppContext>();
    let config = expect_context::<ViewerConfig>();

    let (view_state, set_view_state) = signal(LatestView::Loading);
    let (picked_point, set_picked_point) = signal::<Option<usize>>(None);
    let overlays = StoredValue::new_local(None::<Rc<RefCell<OverlayManager<GoogleMap>>>>);
    let map_ref = NodeRef::<Div>::new();

    Effect::new(move |_| {
        if !ctx.access.get().is_granted() {
            return;
        }
        let Some(container) = map_ref.get() else {
            return;
        };
        if overlays.with_value(|o| o.is_some()) {
            return;
        }

        let on_select: Rc<dyn Fn(usize)> = Rc::new(move |index| set_picked_point.set(Some(index)));
        let map = match GoogleMap::attach(&container, &config, on_select) {
            Ok(map) => map,
            Err(e) => {
                set_view_state.set(LatestView::Failed(e.to_string()));
                return;
            }
        };
        let manager = Rc::new(RefCell::new(OverlayManager::new(
            map,
            ctx.prefs.get_untracked().hour_format(),
        )));
        overlays.set_value(Some(Rc::clone(&manager)));

        let client = ctx.client.get_value();
        spawn_local(async move {
            match client.fetch_latest().await {
                Ok(record) => {
                    let Some(taken) = DateTime::from_timestamp_millis(record.timestamp_ms) else {
                        set_view_state.set(LatestView::Failed("Invalid timestamp".to_string()));
                        return;
                    };
                    let taken = taken.with_timezone(&Local);
                    let taken = FixTime {
                        day: taken.format("%a %b %d %Y").to_string(),
                        time: taken.format("%H:%M:%S %Z").to_string(),
                        age: describe_age(js_sys::Date::now() as i64, record.timestamp_ms),
                    };
                    let profile = match ctx.access.get_untracked() {
                        AccessPhase::Granted(profile) => profile,
                        _ => Default::default(),
                    };

                    let html = format_latest_info(&record, &profile, &taken);
                    manager.borrow_mut().show_latest(&record, html);
                    set_view_state.set(LatestView::Ready {
                        user: profile.display_name().to_string(),
                        picture: profile.picture.clone(),
                        directions: directions_url(&record),
                        taken,
                    });
                }
                Err(ApiFailure::NoData) => set_view_state.set(LatestView::Missing),
                Err(e) => {
                    tracing::warn!("Latest location fetch failed: {}", e);
                    set_view_state.set(LatestView::Failed(e.to_string()));
                }
            }
        });
    });

    Effect::new(move |_| {
        if let Some(index) = picked_point.get() {
            if let Some(manager) = overlays.get_value() {
                manager.borrow_mut().select_point(index);
            }
        }
    });

    view! {
        <div class="page latest-page">
            <h2>"Latest Location"</h2>
            {move || match view_state.get() {
                LatestView::Loading => view! { <p class="status-text">"Loading..."</p> }.into_any(),
                LatestView::Ready { user, picture, directions, taken } => view! {
                    <div class="latest-summary">
                        {picture.map(|src| view! { <img class="latest-avatar" src=src height="50" width="50" /> })}
                        <p><strong>{user} "'s location"</strong></p>
                        <p><a href=directions target="_blank">"Directions Link"</a></p>
                        <p>"Last updated on: " {taken.day}</p>
                        <p>"at: " {taken.time}</p>
                        <p>{taken.age}</p>
                    </div>
                }
                .into_any(),
                LatestView::Missing => view! { <p class="status-text">{NO_DATA_MESSAGE}</p> }.into_any(),
                LatestView::Failed(detail) => view! {
                    <p class="status-text status-error" title=detail>{API_ERROR_MESSAGE}</p>
                }
                .into_any(),
            }}
            <div class="map-canvas" node_ref=map_ref></div>
        </div>
    }
}
