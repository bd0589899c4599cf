use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Booking;

/// Response envelope for the scheduling endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SchedulingResponse {
    pub result: SchedulingResult,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SchedulingResult {
    pub status: String,
    pub error_code: i32,
    pub message: String,
    pub data: SchedulingData,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SchedulingData {
    pub vehicle_trip_list: Vec<ShuttleTrips>,
}

/// One synthetic shuttle and the trips assigned to it, in service order.
///
/// The shuttle and driver identity fields are placeholders: the planner
/// invents vehicles, dispatch assigns real ones later.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ShuttleTrips {
    pub shuttle_name: String,
    pub shuttle_id: Option<i64>,
    pub shuttle_vin: Option<String>,
    pub shuttle_license_plate: Option<String>,
    pub driver_id: Option<i64>,
    pub driver_first_name: Option<String>,
    pub driver_last_name: Option<String>,
    pub trips: Vec<TripEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TripEntry {
    pub program_id: Option<i64>,
    pub program_name: Option<String>,
    /// 12-hour clock, rendered in the trip's time zone.
    pub first_pickup_time: String,
    pub last_dropoff_time: String,
    pub first_pickup_latitude: Option<f64>,
    pub first_pickup_longitude: Option<f64>,
    pub last_dropoff_latitude: Option<f64>,
    pub last_dropoff_longitude: Option<f64>,
    pub driver_id: Option<i64>,
    pub driver_first_name: Option<String>,
    pub driver_last_name: Option<String>,
    pub driver_arrival_time: Option<String>,
    #[schema(value_type = Vec<Object>)]
    pub bookings: Vec<Booking>,
}

impl SchedulingResponse {
    pub fn success(vehicle_trip_list: Vec<ShuttleTrips>) -> Self {
        Self {
            result: SchedulingResult {
                status: "success".to_string(),
                error_code: 0,
                message: String::new(),
                data: SchedulingData { vehicle_trip_list },
            },
        }
    }
}
