use crate::bus::{Register, RegisterSource};
use crate::model::{
    ConnectionStatus, InverterReading, MeterReading, MeterType, PhaseReading, PvReading, Snapshot,
};
use crate::Error;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/* Two PV strings are modeled regardless of the reported string count. */
const PV_STRINGS: [(&str, Register, Register); 2] = [
    ("0", Register::Pv1Voltage, Register::Pv1Current),
    ("1", Register::Pv2Voltage, Register::Pv2Current),
];

/// Read all registers of one poll cycle and normalize them into a snapshot.
/// Any read failure aborts the whole build; a partially populated snapshot is
/// never returned.
pub async fn build<S>(source: &mut S, at: DateTime<Utc>) -> Result<Snapshot, Error>
where
    S: RegisterSource + Send,
{
    let inverter = read_inverter(source).await?;
    let meter = read_meter(source).await?;

    let mut inverters = BTreeMap::new();
    inverters.insert("0".to_string(), inverter);

    Ok(Snapshot {
        last_updated: Some(at),
        connection_status: ConnectionStatus::Connected,
        inverters,
        meter,
    })
}

async fn read_inverter<S>(source: &mut S) -> Result<InverterReading, Error>
where
    S: RegisterSource + Send,
{
    let sn = read_text(source, Register::SerialNumber).await?;
    let model = read_text(source, Register::Model).await?;
    let number_of_strings = read_integer(source, Register::NumberOfPvStrings).await? as u16;
    let number_of_mppt = read_integer(source, Register::NumberOfMpptTrackers).await? as u16;
    let system_time = read_integer(source, Register::SystemTime).await? as u32;
    let total_input_power = read_integer(source, Register::InputPower).await?;
    let internal_temperature = read_scaled(source, Register::InternalTemperature).await?;

    let mut pv = BTreeMap::new();
    for (index, voltage_register, current_register) in &PV_STRINGS {
        let reading = PvReading {
            voltage: read_scaled(source, *voltage_register).await?,
            current: read_scaled(source, *current_register).await?,
        };
        pv.insert((*index).to_string(), reading);
    }

    Ok(InverterReading {
        sn,
        model,
        number_of_strings,
        number_of_mppt,
        system_time,
        total_input_power,
        internal_temperature,
        pv,
    })
}

/// Meter section of the snapshot. Absent unless the meter status register
/// reports an attached meter; phases B and C only exist on three-phase
/// meters.
async fn read_meter<S>(source: &mut S) -> Result<Option<MeterReading>, Error>
where
    S: RegisterSource + Send,
{
    let status = read_integer(source, Register::MeterStatus).await?;
    if status == 0 {
        return Ok(None);
    }

    let raw_type = read_integer(source, Register::MeterType).await? as u16;
    let meter_type: MeterType = num::FromPrimitive::from_u16(raw_type).ok_or_else(|| {
        Error::DecodeError(
            Register::MeterType,
            format!("unknown meter type {}", raw_type),
        )
    })?;

    let active_power = read_integer(source, Register::ActivePower).await?;
    let reactive_power = read_integer(source, Register::ReactivePower).await?;
    let power_factor = read_scaled(source, Register::PowerFactor).await?;
    let grid_frequency = read_scaled(source, Register::GridFrequency).await?;

    let phase_a = read_phase(source, Register::PhaseAVoltage, Register::PhaseACurrent).await?;
    let (phase_b, phase_c) = match meter_type {
        MeterType::SinglePhase => (None, None),
        MeterType::ThreePhase => (
            Some(read_phase(source, Register::PhaseBVoltage, Register::PhaseBCurrent).await?),
            Some(read_phase(source, Register::PhaseCVoltage, Register::PhaseCCurrent).await?),
        ),
    };

    Ok(Some(MeterReading {
        meter_type,
        active_power,
        reactive_power,
        power_factor,
        grid_frequency,
        phase_a,
        phase_b,
        phase_c,
    }))
}

async fn read_phase<S>(
    source: &mut S,
    voltage_register: Register,
    current_register: Register,
) -> Result<PhaseReading, Error>
where
    S: RegisterSource + Send,
{
    Ok(PhaseReading {
        voltage: read_scaled(source, voltage_register).await?,
        current: read_scaled(source, current_register).await?,
    })
}

async fn read_text<S>(source: &mut S, register: Register) -> Result<String, Error>
where
    S: RegisterSource + Send,
{
    let value = source.read(register).await?;
    value
        .text()
        .map(str::to_string)
        .ok_or_else(|| Error::DecodeError(register, format!("expected text, got {:?}", value)))
}

async fn read_integer<S>(source: &mut S, register: Register) -> Result<i64, Error>
where
    S: RegisterSource + Send,
{
    let value = source.read(register).await?;
    value
        .integer()
        .ok_or_else(|| Error::DecodeError(register, format!("expected number, got {:?}", value)))
}

async fn read_scaled<S>(source: &mut S, register: Register) -> Result<f64, Error>
where
    S: RegisterSource + Send,
{
    let value = source.read(register).await?;
    value
        .scaled(register.gain())
        .ok_or_else(|| Error::DecodeError(register, format!("expected number, got {:?}", value)))
}
