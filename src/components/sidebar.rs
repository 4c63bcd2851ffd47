use leptos::prelude::*;

use crate::app::{AccessPhase, AppContext};

#[component]
pub fn Sidebar() -> impl IntoView {
    let ctx = expect_context::<AppContext>();

    let user_line = move || match ctx.access.get() {
        AccessPhase::Granted(profile) => profile.display_name().to_string(),
        AccessPhase::Connecting => "Connecting...".to_string(),
        AccessPhase::ConsentRequired => "Not signed in".to_string(),
        AccessPhase::Failed(_) => "Offline".to_string(),
    };

    view! {
        <nav class="sidebar">
            <div class="sidebar-header">
                <h1 class="sidebar-title">"MyLatitude"</h1>
                <p class="sidebar-subtitle">{user_line}</p>
            </div>
            <ul class="nav-list">
                <li class="nav-item">
                    <a href="/" class="nav-link">"History"</a>
                </li>
                <li class="nav-item">
                    <a href="/latest" class="nav-link">"Latest Location"</a>
                </li>
            </ul>
        </nav>
    }
}
