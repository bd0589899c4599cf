use thiserror::Error;

use crate::providers::directions::DirectionsError;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Invalid time zone: {0}")]
    InvalidZone(String),
    #[error("No route found from '{from}' to '{to}'")]
    NoRoute { from: String, to: String },
    #[error(transparent)]
    Directions(#[from] DirectionsError),
}
