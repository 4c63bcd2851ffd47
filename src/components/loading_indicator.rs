use leptos::prelude::*;

/// Element id the sprite animation draws into.
pub const LOADER_IMAGE_ID: &str = "loaderImage";

#[component]
pub fn LoadingIndicator(
    /// Whether a fetch is in progress
    #[prop(into)]
    busy: Signal<bool>,
) -> impl IntoView {
    view! {
        <div class="loading" class:hidden=move || !busy.get()>
            <div id=LOADER_IMAGE_ID class="loader-image"></div>
        </div>
    }
}
