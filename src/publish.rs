use crate::model::{InverterReading, MeterReading, Snapshot};
use crate::Error;
use chrono::{DateTime, Utc};
use futures::stream;
use influxdb2::models::DataPoint;
use influxdb2::Client;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Best-effort forwarder of snapshots to the time-series sink. Write
/// failures are reported to the caller and never touch the snapshot store.
pub struct Publisher {
    client: Client,
    bucket: String,
    unit: String,
}

impl Publisher {
    pub fn new(url: &str, org: &str, token: &str, bucket: String, unit: String) -> Self {
        Publisher {
            client: Client::new(url, org, token),
            bucket,
            unit,
        }
    }

    pub async fn publish(&self, snapshot: &Snapshot) -> Result<(), Error> {
        let points = points(snapshot, &self.unit)?;
        if points.is_empty() {
            return Ok(());
        }

        self.client
            .write(&self.bucket, stream::iter(points))
            .await
            .map_err(|e| Error::PublishError(e.to_string()))
    }
}

/// One `inverter` point per inverter, timestamped with the device clock, plus
/// one `meter` point timestamped with the collection time when a meter is
/// attached.
fn points(snapshot: &Snapshot, unit: &str) -> Result<Vec<DataPoint>, Error> {
    let mut points = Vec::new();

    for inverter in snapshot.inverters.values() {
        points.push(inverter_point(inverter, unit)?);

        if let Some(meter) = &snapshot.meter {
            let collected_at = snapshot
                .last_updated
                .ok_or_else(|| Error::PublishError("snapshot carries no timestamp".to_string()))?;
            points.push(meter_point(meter, &inverter.sn, unit, collected_at)?);
        }
    }

    Ok(points)
}

fn inverter_point(inverter: &InverterReading, unit: &str) -> Result<DataPoint, Error> {
    let mut builder = DataPoint::builder("inverter")
        .tag("serial_number", inverter.sn.clone())
        .tag("unit", unit.to_string())
        .field("total_input_power", inverter.total_input_power)
        .field("internal_temperature", inverter.internal_temperature)
        .timestamp(i64::from(inverter.system_time) * NANOS_PER_SECOND);

    for (index, pv) in &inverter.pv {
        builder = builder
            .field(format!("pv{}_voltage", index), pv.voltage)
            .field(format!("pv{}_current", index), pv.current);
    }

    builder
        .build()
        .map_err(|e| Error::PublishError(e.to_string()))
}

fn meter_point(
    meter: &MeterReading,
    serial_number: &str,
    unit: &str,
    collected_at: DateTime<Utc>,
) -> Result<DataPoint, Error> {
    let mut builder = DataPoint::builder("meter")
        .tag("serial_number", serial_number.to_string())
        .tag("unit", unit.to_string())
        .field("active_power", meter.active_power)
        .field("reactive_power", meter.reactive_power)
        .field("power_factor", meter.power_factor)
        .field("grid_frequency", meter.grid_frequency)
        .field("phase_a_voltage", meter.phase_a.voltage)
        .field("phase_a_current", meter.phase_a.current)
        .timestamp(collected_at.timestamp() * NANOS_PER_SECOND);

    if let Some(phase_b) = &meter.phase_b {
        builder = builder
            .field("phase_b_voltage", phase_b.voltage)
            .field("phase_b_current", phase_b.current);
    }
    if let Some(phase_c) = &meter.phase_c {
        builder = builder
            .field("phase_c_voltage", phase_c.voltage)
            .field("phase_c_current", phase_c.current);
    }

    builder
        .build()
        .map_err(|e| Error::PublishError(e.to_string()))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{ConnectionStatus, MeterType, PhaseReading, PvReading};
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn inverter() -> InverterReading {
        let mut pv = BTreeMap::new();
        pv.insert(
            "0".to_string(),
            PvReading {
                voltage: 230.0,
                current: 5.5,
            },
        );
        pv.insert(
            "1".to_string(),
            PvReading {
                voltage: 225.0,
                current: 5.25,
            },
        );

        InverterReading {
            sn: "HV2150012345".to_string(),
            model: "SUN2000-10KTL-M1".to_string(),
            number_of_strings: 2,
            number_of_mppt: 2,
            system_time: 1700000000,
            total_input_power: 5230,
            internal_temperature: 41.2,
            pv,
        }
    }

    fn meter() -> MeterReading {
        MeterReading {
            meter_type: MeterType::SinglePhase,
            active_power: 1500,
            reactive_power: -20,
            power_factor: 0.995,
            grid_frequency: 50.02,
            phase_a: PhaseReading {
                voltage: 230.5,
                current: 6.52,
            },
            phase_b: None,
            phase_c: None,
        }
    }

    fn snapshot(meter: Option<MeterReading>) -> Snapshot {
        let mut inverters = BTreeMap::new();
        inverters.insert("0".to_string(), inverter());
        Snapshot {
            last_updated: Some(Utc.timestamp_opt(1700000100, 0).unwrap()),
            connection_status: ConnectionStatus::Connected,
            inverters,
            meter,
        }
    }

    #[test]
    fn one_point_per_measurement() {
        assert_eq!(1, points(&snapshot(None), "0").unwrap().len());
        assert_eq!(2, points(&snapshot(Some(meter())), "0").unwrap().len());
    }

    #[test]
    fn placeholder_produces_no_points() {
        assert!(points(&Snapshot::placeholder(), "0").unwrap().is_empty());
    }

    #[test]
    fn meter_without_collection_time_is_rejected() {
        let mut snapshot = snapshot(Some(meter()));
        snapshot.last_updated = None;

        match points(&snapshot, "0") {
            Err(Error::PublishError(_)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
