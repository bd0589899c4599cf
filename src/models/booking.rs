use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A request to plan one calendar day of bookings.
///
/// The margin overrides are in seconds; when absent the configured defaults
/// apply.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SchedulingRequest {
    /// Calendar day in the "Month Day, Year" form, e.g. "January 15, 2025".
    pub date: String,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub before_pickup_time: Option<i64>,
    #[serde(default)]
    pub after_pickup_time: Option<i64>,
    #[serde(default)]
    pub dropoff_unloading_time: Option<i64>,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub bookings: Vec<Booking>,
}

/// A passenger trip request.
///
/// Only the fields the scheduler reads or writes are typed; everything else
/// (fares, payment, agency bookkeeping) passes through `extra` unmodified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    #[serde(default)]
    pub booking_id: Option<i64>,
    #[serde(default)]
    pub passenger_id: String,
    #[serde(default)]
    pub passenger_first_name: String,
    #[serde(default)]
    pub passenger_last_name: String,
    #[serde(default)]
    pub program_id: Option<i64>,
    #[serde(default)]
    pub program_name: Option<String>,
    /// IANA zone of the program; used when the pickup address yields none.
    #[serde(default)]
    pub program_time_zone: String,
    #[serde(default)]
    pub pickup_address: String,
    #[serde(default)]
    pub pickup_address_id: Option<i64>,
    #[serde(default)]
    pub pickup_latitude: Option<f64>,
    #[serde(default)]
    pub pickup_longitude: Option<f64>,
    #[serde(default)]
    pub dropoff_address: String,
    #[serde(default)]
    pub dropoff_address_id: Option<i64>,
    #[serde(default)]
    pub dropoff_latitude: Option<f64>,
    #[serde(default)]
    pub dropoff_longitude: Option<f64>,
    /// Requested pickup time of day, "HH:MM".
    #[serde(default)]
    pub pickup_time: String,
    #[serde(default)]
    pub mobility_assistance: Vec<String>,
    // Filled by the scheduler.
    #[serde(default)]
    pub travel_distance: Option<i64>,
    #[serde(default)]
    pub travel_time: Option<i64>,
    #[serde(default)]
    pub scheduled_pickup_time: Option<String>,
    #[serde(default)]
    pub scheduled_dropoff_time: Option<String>,
    // Always null in a fresh plan.
    #[serde(default)]
    pub actual_pickup_time: Option<String>,
    #[serde(default)]
    pub actual_dropoff_time: Option<String>,
    #[serde(default)]
    pub driver_arrival_time: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Booking {
    /// Identifier used to group trips per passenger: the passenger id when
    /// present, otherwise the full name.
    pub fn passenger_label(&self) -> String {
        if !self.passenger_id.is_empty() {
            self.passenger_id.clone()
        } else {
            format!("{} {}", self.passenger_first_name, self.passenger_last_name)
        }
    }
}
