//! Browser viewer for a day of recorded locations.

mod app;
mod components;
mod pages;

pub mod calendar;
pub mod config;
pub mod controller;
pub mod endpoints;
pub mod error;
pub mod gapi;
pub mod image_loader;
pub mod logging;
pub mod maps;
pub mod model;
pub mod overlay;
pub mod prefs;
pub mod session;
pub mod timefmt;

use leptos::prelude::*;

use app::App;
use config::ViewerConfig;

/// Entry point: read the page configuration, start logging and mount the app.
pub fn run() {
    console_error_panic_hook::set_once();

    let loaded = ViewerConfig::from_document();
    let config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => ViewerConfig::default(),
    };
    logging::init(&config.log_level);

    if let Err(e) = loaded {
        tracing::error!("Using default configuration: {}", e);
    }
    tracing::info!("Starting MyLatitude viewer ({} {})", config.api_name, config.api_version);

    leptos::mount::mount_to_body(move || view! { <App config=config.clone() /> });
}
