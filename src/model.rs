use chrono::{DateTime, Utc};
use num_derive::FromPrimitive;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

/// Normalized result of one poll cycle. Replaced as a whole, never mutated
/// after creation.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub last_updated: Option<DateTime<Utc>>,
    pub connection_status: ConnectionStatus,
    pub inverters: BTreeMap<String, InverterReading>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meter: Option<MeterReading>,
}

impl Snapshot {
    /// Placeholder served until the first poll cycle completes.
    pub fn placeholder() -> Self {
        Snapshot {
            last_updated: None,
            connection_status: ConnectionStatus::Disconnected,
            inverters: BTreeMap::new(),
            meter: None,
        }
    }

    /// Result of a cycle that could not reach the device.
    pub fn disconnected(at: DateTime<Utc>) -> Self {
        Snapshot {
            last_updated: Some(at),
            ..Snapshot::placeholder()
        }
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Snapshot::placeholder()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InverterReading {
    pub sn: String,
    pub model: String,
    pub number_of_strings: u16,
    pub number_of_mppt: u16,
    /* epoch seconds as reported by the device clock */
    pub system_time: u32,
    pub total_input_power: i64,
    pub internal_temperature: f64,
    pub pv: BTreeMap<String, PvReading>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PvReading {
    pub voltage: f64,
    pub current: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MeterType {
    SinglePhase = 0,
    ThreePhase = 1,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeterReading {
    pub meter_type: MeterType,
    pub active_power: i64,
    pub reactive_power: i64,
    pub power_factor: f64,
    pub grid_frequency: f64,
    pub phase_a: PhaseReading,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase_b: Option<PhaseReading>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase_c: Option<PhaseReading>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhaseReading {
    pub voltage: f64,
    pub current: f64,
}
