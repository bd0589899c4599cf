use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

use super::assistance::Assistance;
use super::SchedulingContext;
use crate::models::{Booking, TripEntry};

/// Per-booking scheduling data derived at trip construction.
///
/// Immutable once built except for the scheduler's outputs: `is_last`,
/// `adjusted_pickup_time` and `earliest_arrival_time`.
#[derive(Debug, Clone)]
pub struct Trip {
    pub booking: Booking,
    pub pickup_address: String,
    pub dropoff_address: String,
    /// Grouping key: passenger id, or the full name when the id is empty.
    pub passenger: String,
    pub assistance: Assistance,
    pub timezone: Tz,
    /// Absolute instant of the requested pickup.
    pub pickup_time: DateTime<Utc>,
    pub distance_meters: i64,
    pub duration_secs: i64,
    /// True for the latest trip of a passenger with several trips that day.
    pub is_last: bool,
    pub adjusted_pickup_time: Option<DateTime<Utc>>,
    pub earliest_arrival_time: Option<DateTime<Utc>>,
}

impl Trip {
    /// Only a last leg tolerates a late arrival; an outgoing trip must be
    /// picked up by its requested time.
    pub fn latest_pickup_time(&self, ctx: &SchedulingContext) -> DateTime<Utc> {
        if self.is_last {
            self.pickup_time + Duration::seconds(ctx.after_pickup_secs)
        } else {
            self.pickup_time
        }
    }

    /// Outgoing trips want the driver on site `before_pickup` early; a last
    /// leg has no early window.
    pub fn earliest_pickup_time(&self, ctx: &SchedulingContext) -> DateTime<Utc> {
        if self.is_last {
            self.pickup_time
        } else {
            self.pickup_time - Duration::seconds(ctx.before_pickup_secs)
        }
    }

    pub fn dropoff_time(&self) -> DateTime<Utc> {
        self.adjusted_pickup_time.unwrap_or(self.pickup_time) + Duration::seconds(self.duration_secs)
    }

    /// When the shuttle is free again after serving this trip.
    pub fn finish_time(&self, ctx: &SchedulingContext) -> DateTime<Utc> {
        self.dropoff_time() + Duration::seconds(ctx.dropoff_unloading_secs)
    }

    /// Render the trip into its output entry, filling the scheduled times
    /// on the booking and nulling the actuals.
    pub fn render(&self) -> TripEntry {
        let pickup_local = self
            .adjusted_pickup_time
            .unwrap_or(self.pickup_time)
            .with_timezone(&self.timezone);
        let dropoff_local = self.dropoff_time().with_timezone(&self.timezone);

        let mut booking = self.booking.clone();
        booking.scheduled_pickup_time = Some(format_clock(pickup_local));
        booking.scheduled_dropoff_time = Some(format_clock(dropoff_local));
        booking.actual_pickup_time = None;
        booking.actual_dropoff_time = None;
        booking.driver_arrival_time = None;

        TripEntry {
            program_id: booking.program_id,
            program_name: booking.program_name.clone(),
            first_pickup_time: format_clock(pickup_local),
            last_dropoff_time: format_clock(dropoff_local),
            first_pickup_latitude: booking.pickup_latitude,
            first_pickup_longitude: booking.pickup_longitude,
            last_dropoff_latitude: booking.dropoff_latitude,
            last_dropoff_longitude: booking.dropoff_longitude,
            driver_id: None,
            driver_first_name: None,
            driver_last_name: None,
            driver_arrival_time: None,
            bookings: vec![booking],
        }
    }
}

fn format_clock(instant: DateTime<Tz>) -> String {
    instant.format("%I:%M %p").to_string()
}
