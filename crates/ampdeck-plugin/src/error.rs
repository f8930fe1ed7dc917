use thiserror::Error;

/// Failures inside the engine.  None of them is fatal: every caller has a
/// degraded path (retry next tick, fall back, or draw the default).
#[derive(Error, Debug)]
pub enum DeckError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),
    #[error("missing configuration: {0}")]
    ConfigMissing(&'static str),
    #[error("unparseable response: {0}")]
    Parse(String),
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::DeError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, DeckError>;
