pub mod app;
pub mod camera;
pub mod geo;
pub mod i18n;
pub mod markers;
pub mod playback;
pub mod region;
pub mod scene;
pub mod station_list;
pub mod timezone;
pub mod zoom;

pub use app::{AppSettings, Effect, GlobeApp, GlobeEvent};
