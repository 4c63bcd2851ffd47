use std::rc::Rc;

use leptos::prelude::*;
use leptos_router::components::*;
use leptos_router::path;
use wasm_bindgen_futures::spawn_local;

use crate::components::access_banner::AccessBanner;
use crate::components::sidebar::Sidebar;
use crate::config::ViewerConfig;
use crate::endpoints::{AccessState, ApiSettings, EndpointClient};
use crate::gapi::GapiBackend;
use crate::model::UserProfile;
use crate::pages::history::HistoryPage;
use crate::pages::latest::LatestPage;
use crate::prefs::DisplayPrefs;

pub type Client = EndpointClient<GapiBackend>;

/// Where the start-up handshake with the backend stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessPhase {
    Connecting,
    Granted(UserProfile),
    ConsentRequired,
    Failed(String),
}

impl From<AccessState> for AccessPhase {
    fn from(state: AccessState) -> Self {
        match state {
            AccessState::Granted(profile) => AccessPhase::Granted(profile),
            AccessState::ConsentRequired => AccessPhase::ConsentRequired,
            AccessState::Denied(message) => AccessPhase::Failed(message),
        }
    }
}

impl AccessPhase {
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessPhase::Granted(_))
    }
}

#[derive(Clone, Copy)]
pub struct AppContext {
    pub client: StoredValue<Rc<Client>, LocalStorage>,
    pub access: ReadSignal<AccessPhase>,
    pub set_access: WriteSignal<AccessPhase>,
    pub prefs: ReadSignal<DisplayPrefs>,
    pub set_prefs: WriteSignal<DisplayPrefs>,
}

impl AppContext {
    /// Interactive sign-in for a user who has not consented yet.
    pub fn request_access(&self) {
        let client = self.client.get_value();
        let set_access = self.set_access;
        set_access.set(AccessPhase::Connecting);
        spawn_local(async move {
            set_access.set(client.grant_access().await.into());
        });
    }
}

#[component]
pub fn App(config: ViewerConfig) -> impl IntoView {
    let client = StoredValue::new_local(Rc::new(EndpointClient::new(
        GapiBackend,
        ApiSettings::from(&config),
    )));
    let (access, set_access) = signal(AccessPhase::Connecting);
    let (prefs, set_prefs) = signal(DisplayPrefs::load_or(DisplayPrefs {
        use_24_hour: config.use_24_hour,
    }));

    provide_context(config);
    provide_context(AppContext {
        client,
        access,
        set_access,
        prefs,
        set_prefs,
    });

    // Load the APIs and check access once on mount
    Effect::new(move |_| {
        let client = client.get_value();
        spawn_local(async move {
            let phase = match client.connect().await {
                Ok(state) => AccessPhase::from(state),
                Err(e) => {
                    tracing::error!("Failed to load backend APIs: {}", e);
                    AccessPhase::Failed(e.to_string())
                }
            };
            set_access.set(phase);
        });
    });

    // Remember display choices
    Effect::new(move |_| {
        prefs.get().save();
    });

    view! {
        <Router>
            <div class="app-layout">
                <Sidebar />
                <main class="content">
                    <AccessBanner />
                    <Routes fallback=|| view! { <p>"Page not found"</p> }>
                        <Route path=path!("/") view=HistoryPage />
                        <Route path=path!("/latest") view=LatestPage />
                    </Routes>
                </main>
            </div>
        </Router>
    }
}
