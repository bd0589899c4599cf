use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectionsError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Routing unavailable ({status}): {message}")]
    Unavailable { status: String, message: String },
}
