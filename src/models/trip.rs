use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VehicleType {
    #[serde(rename = "2-wheeler")]
    TwoWheeler,
    #[serde(rename = "4-wheeler")]
    FourWheeler,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TripStatus {
    #[default]
    Active,
    Full,
    Cancelled,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Active => "active",
            TripStatus::Full => "full",
            TripStatus::Cancelled => "cancelled",
        }
    }
}

/// Denormalized participant snapshot embedded in a trip, taken at creation
/// time. Later profile edits do not flow back into existing trips.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantRef {
    pub id: String,
    pub name: String,
    pub avatar: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: String,
    pub vehicle_type: VehicleType,
    pub from: String,
    pub to: String,
    pub date: String,
    pub time: String,
    pub seats: u32,
    pub cost_per_person: f64,
    pub driver: ParticipantRef,
    pub status: TripStatus,
    pub passengers: Vec<ParticipantRef>,
    pub created_at: DateTime<Utc>,
}

/// Creation payload. The browser form submits `seats` and `costPerPerson`
/// as strings, so both fields also accept their stringified form.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTrip {
    pub vehicle_type: VehicleType,
    pub from: String,
    pub to: String,
    pub date: String,
    pub time: String,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub seats: u32,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub cost_per_person: f64,
}
