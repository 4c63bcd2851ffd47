pub mod access_banner;
pub mod date_picker;
pub mod loading_indicator;
pub mod sidebar;
