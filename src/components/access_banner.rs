use leptos::prelude::*;

use crate::app::{AccessPhase, AppContext};
use crate::session::{API_ERROR_MESSAGE, NO_ACCESS_MESSAGE};

/// Start-up access problems: missing consent (with a button to grant it) or a
/// backend that could not be reached.
#[component]
pub fn AccessBanner() -> impl IntoView {
    let ctx = expect_context::<AppContext>();

    view! {
        {move || match ctx.access.get() {
            AccessPhase::ConsentRequired => view! {
                <div class="access-banner">
                    <span class="status-text">{NO_ACCESS_MESSAGE}</span>
                    <button class="btn btn-primary" on:click=move |_| ctx.request_access()>
                        "Grant access"
                    </button>
                </div>
            }
            .into_any(),
            AccessPhase::Failed(detail) => view! {
                <div class="access-banner">
                    <span class="status-text status-error" title=detail>{API_ERROR_MESSAGE}</span>
                </div>
            }
            .into_any(),
            AccessPhase::Connecting | AccessPhase::Granted(_) => ().into_any(),
        }}
    }
}
