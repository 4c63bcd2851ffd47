use std::rc::Rc;

use chrono::NaiveDate;
use leptos::html::Div;
use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::app::AppContext;
use crate::calendar;
use crate::components::date_picker::DatePicker;
use crate::components::loading_indicator::{LoadingIndicator, LOADER_IMAGE_ID};
use crate::config::ViewerConfig;
use crate::gapi::GapiBackend;
use crate::image_loader::{ElementSprite, ImageLoader, IntervalScheduler};
use crate::maps::GoogleMap;
use crate::overlay::OverlayManager;
use crate::session::{HistorySession, StatusSurface, API_ERROR_MESSAGE};

type PageSession = HistorySession<GapiBackend, GoogleMap, PageStatus>;

/// Page signals plus the busy sprite, as seen by the session.
pub struct PageStatus {
    set_busy: WriteSignal<bool>,
    set_message: WriteSignal<Option<String>>,
    set_selected: WriteSignal<NaiveDate>,
    loader: ImageLoader<IntervalScheduler>,
}

impl StatusSurface for PageStatus {
    fn show_busy(&self) {
        self.loader.start();
        self.set_busy.set(true);
    }

    fn hide_busy(&self) {
        self.set_busy.set(false);
        self.loader.stop();
    }

    fn show_message(&self, text: &str) {
        self.set_message.set(Some(text.to_string()));
    }

    fn hide_message(&self) {
        self.set_message.set(None);
    }

    fn show_date(&self, date: NaiveDate) {
        self.set_selected.set(date);
    }
}

#[derive(Clone, Copy)]
enum Nav {
    Previous,
    Next,
    To(NaiveDate),
}

#[component]
pub fn HistoryPage() -> impl IntoView {
    let ctx = expect_context::<AppContext>();
    let config = expect_context::<ViewerConfig>();
    let today = chrono::Local::now().date_naive();

    let (busy, set_busy) = signal(true);
    let (message, set_message) = signal::<Option<String>>(None);
    let (selected, set_selected) = signal(today);
    let (picker_open, set_picker_open) = signal(false);
    let (picked_point, set_picked_point) = signal::<Option<usize>>(None);
    let session = StoredValue::new_local(None::<Rc<PageSession>>);
    let map_ref = NodeRef::<Div>::new();

    // Mount the map and load today once access is granted
    Effect::new(move |_| {
        if !ctx.access.get().is_granted() {
            return;
        }
        let Some(container) = map_ref.get() else {
            return;
        };
        if session.with_value(|s| s.is_some()) {
            return;
        }

        let on_select: Rc<dyn Fn(usize)> = Rc::new(move |index| set_picked_point.set(Some(index)));
        let map = match GoogleMap::attach(&container, &config, on_select) {
            Ok(map) => map,
            Err(e) => {
                tracing::error!("Failed to create map: {}", e);
                set_message.set(Some(API_ERROR_MESSAGE.to_string()));
                set_busy.set(false);
                return;
            }
        };
        let overlays = OverlayManager::new(map, ctx.prefs.get_untracked().hour_format());
        let status = PageStatus {
            set_busy,
            set_message,
            set_selected,
            loader: ImageLoader::new(IntervalScheduler, Rc::new(ElementSprite::new(LOADER_IMAGE_ID))),
        };
        let created = Rc::new(HistorySession::new(
            ctx.client.get_value(),
            overlays,
            status,
            today,
        ));
        session.set_value(Some(Rc::clone(&created)));

        spawn_local(async move {
            created.refresh().await;
        });
    });

    // Marker clicks
    Effect::new(move |_| {
        if let Some(index) = picked_point.get() {
            if let Some(s) = session.get_value() {
                s.select_point(index);
            }
        }
    });

    Effect::new(move |_| {
        let format = ctx.prefs.get().hour_format();
        if let Some(s) = session.get_value() {
            s.set_hour_format(format);
        }
    });

    let navigate = move |nav: Nav| {
        let Some(s) = session.get_value() else {
            return;
        };
        spawn_local(async move {
            match nav {
                Nav::Previous => s.retreat().await,
                Nav::Next => s.advance().await,
                Nav::To(date) => s.show(date).await,
            };
        });
    };

    let on_pick = Callback::new(move |date: NaiveDate| {
        set_picker_open.set(false);
        navigate(Nav::To(date));
    });

    view! {
        <div class="page history-page">
            <div class="history-toolbar">
                <button class="btn btn-secondary" on:click=move |_| navigate(Nav::Previous)>
                    "Previous day"
                </button>
                <h2
                    class="current-date"
                    title="Choose a date"
                    on:click=move |_| set_picker_open.update(|open| *open = !*open)
                >
                    {move || calendar::day_label(selected.get())}
                </h2>
                <button class="btn btn-secondary" on:click=move |_| navigate(Nav::Next)>
                    "Next day"
                </button>
                <label class="hour-toggle">
                    <input
                        type="checkbox"
                        prop:checked=move || ctx.prefs.get().use_24_hour
                        on:change=move |ev| {
                            let checked = event_target_checked(&ev);
                            ctx.set_prefs.update(|p| p.use_24_hour = checked);
                        }
                    />
                    "24-hour clock"
                </label>
            </div>

            <Show when=move || picker_open.get()>
                <DatePicker selected=selected on_pick=on_pick />
            </Show>

            <Show when=move || message.get().is_some()>
                <div class="no-location-data">{move || message.get().unwrap_or_default()}</div>
            </Show>

            <LoadingIndicator busy=busy />
            <div class="map-canvas" node_ref=map_ref></div>
        </div>
    }
}
