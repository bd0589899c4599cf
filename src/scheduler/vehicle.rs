use super::assistance::Assistance;
use super::trip::Trip;
use crate::models::ShuttleTrips;

/// An ordered sequence of trips served by one hypothetical shuttle.
#[derive(Debug, Clone)]
pub struct Vehicle {
    /// 1-based, assigned in creation order.
    pub index: usize,
    pub trips: Vec<Trip>,
}

impl Vehicle {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            trips: Vec::new(),
        }
    }

    pub fn last_trip(&self) -> Option<&Trip> {
        self.trips.last()
    }

    pub fn add_trip(&mut self, trip: Trip) {
        self.trips.push(trip);
    }

    /// Union of the mobility requirements of every assigned trip.
    pub fn capability(&self) -> Assistance {
        let mut trips = self.trips.iter();
        let first = trips
            .next()
            .map(|trip| trip.assistance)
            .unwrap_or(Assistance::AMBULATORY);
        trips.fold(first, |acc, trip| acc.union(trip.assistance))
    }

    /// Synthetic name, e.g. "1AMBI", "2GURWC".
    pub fn shuttle_name(&self) -> String {
        format!("{}{}", self.index, self.capability().capability_code())
    }

    pub fn render(&self) -> ShuttleTrips {
        ShuttleTrips {
            shuttle_name: self.shuttle_name(),
            shuttle_id: None,
            shuttle_vin: None,
            shuttle_license_plate: None,
            driver_id: None,
            driver_first_name: None,
            driver_last_name: None,
            trips: self.trips.iter().map(Trip::render).collect(),
        }
    }
}
