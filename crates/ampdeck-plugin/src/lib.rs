pub mod artwork;
pub mod core;
pub mod dispatch;
pub mod error;
pub mod estimator;
pub mod fallback;
pub mod host;
pub mod input;
pub mod logging;
pub mod model;
pub mod plex;
pub mod reconcile;
pub mod render;
pub mod surface;
pub mod timers;
