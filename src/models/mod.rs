mod booking;
mod response;

pub use booking::{Booking, SchedulingRequest};
pub use response::{SchedulingData, SchedulingResponse, SchedulingResult, ShuttleTrips, TripEntry};
