use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::info;

use crate::error::AppError;
use crate::models::trip::{NewTrip, ParticipantRef, Trip, TripStatus};

/// Authoritative in-memory store of all trips for the process lifetime.
///
/// Trips are never persisted or expired; a restart starts empty. Insertion
/// order is the list order. The lock linearizes creations, so two
/// near-simultaneous requests each observe the state left by the other.
pub struct TripRegistry {
    trips: RwLock<Vec<Trip>>,
    next_id: AtomicU64,
}

impl TripRegistry {
    pub fn new() -> Self {
        Self {
            trips: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Store a new trip and return the canonical record.
    ///
    /// Assigns a process-unique id, stamps `created_at`, and starts the trip
    /// as `active` with no passengers. Input presence is the HTTP layer's
    /// concern; nothing is validated here.
    pub async fn create(&self, input: NewTrip, driver: ParticipantRef) -> Trip {
        let trip = Trip {
            id: self.next_id.fetch_add(1, Ordering::Relaxed).to_string(),
            vehicle_type: input.vehicle_type,
            from: input.from,
            to: input.to,
            date: input.date,
            time: input.time,
            seats: input.seats,
            cost_per_person: input.cost_per_person,
            driver,
            status: TripStatus::Active,
            passengers: Vec::new(),
            created_at: Utc::now(),
        };

        let mut trips = self.trips.write().await;
        trips.push(trip.clone());
        info!(
            trip_id = %trip.id,
            from = %trip.from,
            to = %trip.to,
            status = trip.status.as_str(),
            "trip created"
        );
        trip
    }

    /// Snapshot of all trips in insertion order.
    pub async fn list(&self) -> Vec<Trip> {
        self.trips.read().await.clone()
    }

    pub async fn get(&self, id: &str) -> Result<Trip, AppError> {
        let trips = self.trips.read().await;
        trips
            .iter()
            .find(|trip| trip.id == id)
            .cloned()
            .ok_or(AppError::NotFound)
    }

    pub async fn count(&self) -> usize {
        self.trips.read().await.len()
    }
}

impl Default for TripRegistry {
    fn default() -> Self {
        Self::new()
    }
}
