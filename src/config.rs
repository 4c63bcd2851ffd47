use serde::{Deserialize, Serialize};

use crate::error::ViewerError;

/// Id of the `<script type="application/json">` block the host page fills in.
pub const CONFIG_ELEMENT_ID: &str = "mylatitude-config";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapCenter {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewerConfig {
    pub client_id: String,
    pub api_root: String,
    pub api_name: String,
    pub api_version: String,
    /// Show times as 24-hour clock instead of AM/PM.
    #[serde(rename = "use24Hour")]
    pub use_24_hour: bool,
    pub default_center: MapCenter,
    pub default_zoom: u8,
    pub log_level: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            api_root: String::new(),
            api_name: "mylatitude".to_string(),
            api_version: "v1".to_string(),
            use_24_hour: false,
            default_center: MapCenter {
                lat: 55.948346,
                lng: -3.198119,
            },
            default_zoom: 16,
            log_level: "info".to_string(),
        }
    }
}

impl ViewerConfig {
    pub fn from_json(json: &str) -> Result<Self, ViewerError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ViewerError::Config(format!("Invalid config JSON: {}", e)))?;
        if config.api_name.trim().is_empty() {
            return Err(ViewerError::Config("apiName must not be empty".to_string()));
        }
        Ok(config)
    }

    /// Read the config block embedded in the host page.
    pub fn from_document() -> Result<Self, ViewerError> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| ViewerError::Config("No document available".to_string()))?;
        let element = document.get_element_by_id(CONFIG_ELEMENT_ID).ok_or_else(|| {
            ViewerError::Config(format!("Missing #{} element", CONFIG_ELEMENT_ID))
        })?;
        let text = element.text_content().unwrap_or_default();
        Self::from_json(&text)
    }
}
