//! Greedy, multi-pass assignment of a day's bookings to the smallest
//! feasible fleet.
//!
//! Trips are built in input order, sorted by pickup instant, grouped into
//! mobility priority buckets (stretcher, wheelchair, rest) and assigned
//! bucket by bucket. A trip joins the best vehicle whose last assignment
//! still allows a timely arrival, otherwise a new vehicle is created.

pub mod assistance;
pub mod error;
pub mod trip;
pub mod vehicle;
pub mod zones;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::config::SchedulingDefaults;
use crate::models::{Booking, SchedulingRequest, SchedulingResponse};
use crate::providers::directions::Directions;

pub use assistance::Assistance;
pub use error::ScheduleError;
pub use trip::Trip;
pub use vehicle::Vehicle;

/// Per-request scheduling parameters. Built once per request so concurrent
/// schedules never share mutable state.
#[derive(Debug, Clone)]
pub struct SchedulingContext {
    /// Calendar day in "Month Day, Year" form.
    pub date: String,
    pub before_pickup_secs: i64,
    pub after_pickup_secs: i64,
    pub dropoff_unloading_secs: i64,
    pub debug: bool,
}

impl SchedulingContext {
    pub fn from_request(request: &SchedulingRequest, defaults: SchedulingDefaults) -> Self {
        Self {
            date: request.date.clone(),
            before_pickup_secs: request
                .before_pickup_time
                .unwrap_or(defaults.before_pickup_secs),
            after_pickup_secs: request
                .after_pickup_time
                .unwrap_or(defaults.after_pickup_secs),
            dropoff_unloading_secs: request
                .dropoff_unloading_time
                .unwrap_or(defaults.dropoff_unloading_secs),
            debug: request.debug,
        }
    }
}

pub struct Scheduler {
    directions: Arc<dyn Directions>,
    context: SchedulingContext,
}

impl Scheduler {
    pub fn new(directions: Arc<dyn Directions>, context: SchedulingContext) -> Self {
        Self {
            directions,
            context,
        }
    }

    /// Plan the given bookings and render the response envelope.
    pub async fn run(&self, bookings: Vec<Booking>) -> Result<SchedulingResponse, ScheduleError> {
        let vehicles = self.plan(bookings).await?;
        Ok(SchedulingResponse::success(
            vehicles.iter().map(Vehicle::render).collect(),
        ))
    }

    /// Plan the given bookings into an ordered list of vehicles.
    pub async fn plan(&self, bookings: Vec<Booking>) -> Result<Vec<Vehicle>, ScheduleError> {
        let booking_count = bookings.len();
        let mut trips = self.build_trips(bookings).await?;
        trips.sort_by_key(|trip| trip.pickup_time);
        mark_last_legs(&mut trips);

        let mut vehicles: Vec<Vehicle> = Vec::new();
        for bucket in bucket_by_priority(trips) {
            for trip in bucket {
                self.assign(&mut vehicles, trip).await?;
            }
        }

        if self.context.debug {
            for vehicle in &vehicles {
                tracing::debug!(
                    shuttle = %vehicle.shuttle_name(),
                    trips = vehicle.trips.len(),
                    "Planned vehicle"
                );
            }
        }
        tracing::info!(
            bookings = booking_count,
            vehicles = vehicles.len(),
            date = %self.context.date,
            "Completed schedule"
        );
        Ok(vehicles)
    }

    /// Build one trip per booking, in input order. A booking the provider
    /// cannot route fails the whole request.
    async fn build_trips(&self, bookings: Vec<Booking>) -> Result<Vec<Trip>, ScheduleError> {
        let mut trips = Vec::with_capacity(bookings.len());
        for mut booking in bookings {
            let timezone = match zones::timezone_from_address(&booking.pickup_address) {
                Some(tz) => tz,
                None => zones::parse_zone(&booking.program_time_zone)?,
            };
            let pickup_time =
                zones::resolve_instant(&self.context.date, &booking.pickup_time, timezone)?;
            let route = self
                .directions
                .get_direction(&booking.pickup_address, &booking.dropoff_address, pickup_time)
                .await?
                .ok_or_else(|| ScheduleError::NoRoute {
                    from: booking.pickup_address.clone(),
                    to: booking.dropoff_address.clone(),
                })?;

            booking.travel_distance = Some(route.distance_meters);
            booking.travel_time = Some(route.duration_seconds);

            let assistance = Assistance::from_tags(&booking.mobility_assistance);
            let passenger = booking.passenger_label();
            let pickup_address = booking.pickup_address.clone();
            let dropoff_address = booking.dropoff_address.clone();
            trips.push(Trip {
                booking,
                pickup_address,
                dropoff_address,
                passenger,
                assistance,
                timezone,
                pickup_time,
                distance_meters: route.distance_meters,
                duration_secs: route.duration_seconds,
                is_last: false,
                adjusted_pickup_time: None,
                earliest_arrival_time: None,
            });
        }
        Ok(trips)
    }

    /// Can `vehicle` serve `trip` after its current assignments? Returns
    /// the estimated arrival at the new pickup, or `None` when the timing
    /// does not work out or the reposition is unroutable.
    async fn fit(
        &self,
        vehicle: &Vehicle,
        trip: &Trip,
    ) -> Result<Option<DateTime<Utc>>, ScheduleError> {
        let Some(last) = vehicle.last_trip() else {
            return Ok(None);
        };
        let finish = last.finish_time(&self.context);
        let latest = trip.latest_pickup_time(&self.context);
        if finish > latest {
            return Ok(None);
        }
        if last.dropoff_address == trip.pickup_address {
            return Ok(Some(finish));
        }
        let Some(route) = self
            .directions
            .get_direction(&last.dropoff_address, &trip.pickup_address, finish)
            .await?
        else {
            // Unroutable reposition disqualifies this vehicle only.
            return Ok(None);
        };
        let arrival = finish + Duration::seconds(route.duration_seconds);
        Ok((arrival <= latest).then_some(arrival))
    }

    /// Preference between two feasible arrivals. Comfortably inside the
    /// window, a later arrival wins (less idle waiting); once the current
    /// best is already marginal, an earlier one wins.
    fn is_better(
        &self,
        incoming: DateTime<Utc>,
        current: DateTime<Utc>,
        trip: &Trip,
    ) -> bool {
        if trip.is_last {
            if current > trip.pickup_time {
                incoming < current
            } else {
                incoming > current
            }
        } else {
            let early = trip.pickup_time - Duration::seconds(self.context.before_pickup_secs);
            if current > early {
                incoming < current
            } else {
                incoming > current
            }
        }
    }

    async fn assign(
        &self,
        vehicles: &mut Vec<Vehicle>,
        mut trip: Trip,
    ) -> Result<(), ScheduleError> {
        let mut best: Option<(usize, DateTime<Utc>)> = None;
        for (index, vehicle) in vehicles.iter().enumerate() {
            if let Some(arrival) = self.fit(vehicle, &trip).await? {
                best = match best {
                    Some((_, current)) if self.is_better(arrival, current, &trip) => {
                        Some((index, arrival))
                    }
                    None => Some((index, arrival)),
                    keep => keep,
                };
            }
        }

        match best {
            Some((index, arrival)) => {
                trip.earliest_arrival_time = Some(arrival);
                trip.adjusted_pickup_time = Some(arrival.max(trip.pickup_time));
                vehicles[index].add_trip(trip);
            }
            None => {
                let mut vehicle = Vehicle::new(vehicles.len() + 1);
                trip.earliest_arrival_time = Some(trip.earliest_pickup_time(&self.context));
                trip.adjusted_pickup_time = Some(trip.pickup_time);
                vehicle.add_trip(trip);
                vehicles.push(vehicle);
            }
        }
        Ok(())
    }
}

/// For a passenger with several trips in the day, the one with the latest
/// pickup earns the late-arrival tolerance. Expects `trips` sorted by
/// pickup instant.
fn mark_last_legs(trips: &mut [Trip]) {
    let mut by_passenger: HashMap<String, Vec<usize>> = HashMap::new();
    for (index, trip) in trips.iter().enumerate() {
        by_passenger
            .entry(trip.passenger.clone())
            .or_default()
            .push(index);
    }
    for indices in by_passenger.values() {
        if indices.len() < 2 {
            continue;
        }
        if let Some(&last) = indices.last() {
            trips[last].is_last = true;
        }
    }
}

/// Stretcher trips first, wheelchair second, the rest last; the pickup-time
/// order within each bucket is preserved.
fn bucket_by_priority(trips: Vec<Trip>) -> [Vec<Trip>; 3] {
    let mut buckets: [Vec<Trip>; 3] = Default::default();
    for trip in trips {
        buckets[trip.assistance.priority_bucket()].push(trip);
    }
    buckets
}
