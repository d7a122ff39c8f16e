use crate::Error;

/// Logical register map of the SUN2000 inverter and its attached power meter.
/// Addresses and word counts follow the vendor register list; gains encode the
/// device's fixed-point register scaling and are not configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    Model,
    SerialNumber,
    NumberOfPvStrings,
    NumberOfMpptTrackers,
    Pv1Voltage,
    Pv1Current,
    Pv2Voltage,
    Pv2Current,
    InputPower,
    InternalTemperature,
    SystemTime,
    MeterStatus,
    MeterType,
    PhaseAVoltage,
    PhaseBVoltage,
    PhaseCVoltage,
    PhaseACurrent,
    PhaseBCurrent,
    PhaseCCurrent,
    ActivePower,
    ReactivePower,
    PowerFactor,
    GridFrequency,
}

/// Raw encoding of a register's words on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Text,
    U16,
    I16,
    U32,
    I32,
}

impl Register {
    fn layout(self) -> (u16, u16, Kind) {
        match self {
            Register::Model => (30000, 15, Kind::Text),
            Register::SerialNumber => (30015, 10, Kind::Text),
            Register::NumberOfPvStrings => (30071, 1, Kind::U16),
            Register::NumberOfMpptTrackers => (30072, 1, Kind::U16),
            Register::Pv1Voltage => (32016, 1, Kind::I16),
            Register::Pv1Current => (32017, 1, Kind::I16),
            Register::Pv2Voltage => (32018, 1, Kind::I16),
            Register::Pv2Current => (32019, 1, Kind::I16),
            Register::InputPower => (32064, 2, Kind::I32),
            Register::InternalTemperature => (32087, 1, Kind::I16),
            Register::SystemTime => (40000, 2, Kind::U32),
            Register::MeterStatus => (37100, 1, Kind::U16),
            Register::PhaseAVoltage => (37101, 2, Kind::I32),
            Register::PhaseBVoltage => (37103, 2, Kind::I32),
            Register::PhaseCVoltage => (37105, 2, Kind::I32),
            Register::PhaseACurrent => (37107, 2, Kind::I32),
            Register::PhaseBCurrent => (37109, 2, Kind::I32),
            Register::PhaseCCurrent => (37111, 2, Kind::I32),
            Register::ActivePower => (37113, 2, Kind::I32),
            Register::ReactivePower => (37115, 2, Kind::I32),
            Register::PowerFactor => (37117, 1, Kind::I16),
            Register::GridFrequency => (37118, 1, Kind::I16),
            Register::MeterType => (37125, 1, Kind::U16),
        }
    }

    pub fn address(self) -> u16 {
        self.layout().0
    }

    /// Number of 16-bit words occupied on the bus.
    pub fn quantity(self) -> u16 {
        self.layout().1
    }

    pub fn kind(self) -> Kind {
        self.layout().2
    }

    /// Fixed-point divisor applied when normalizing the raw value.
    pub fn gain(self) -> u16 {
        match self {
            Register::Pv1Voltage
            | Register::Pv2Voltage
            | Register::PhaseAVoltage
            | Register::PhaseBVoltage
            | Register::PhaseCVoltage
            | Register::InternalTemperature => 10,
            Register::Pv1Current
            | Register::Pv2Current
            | Register::PhaseACurrent
            | Register::PhaseBCurrent
            | Register::PhaseCCurrent => 100,
            Register::PowerFactor => 1000,
            Register::GridFrequency => 100,
            _ => 1,
        }
    }
}

/// Raw value read from a single logical register. Produced fresh each poll
/// cycle and not retained.
#[derive(Debug, Clone, PartialEq)]
pub enum RegisterValue {
    Text(String),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
}

impl RegisterValue {
    /// Decode raw holding-register words into the register's value kind.
    /// 32-bit values are big-endian word pairs; text registers are
    /// NUL-padded ASCII.
    pub fn decode(register: Register, words: &[u16]) -> Result<RegisterValue, Error> {
        if words.len() != register.quantity() as usize {
            return Err(Error::DecodeError(
                register,
                format!("expected {} words, got {}", register.quantity(), words.len()),
            ));
        }

        let value = match register.kind() {
            Kind::Text => {
                let mut bytes = Vec::with_capacity(words.len() * 2);
                for word in words {
                    bytes.extend_from_slice(&word.to_be_bytes());
                }
                let text = String::from_utf8_lossy(&bytes)
                    .trim_end_matches('\0')
                    .to_string();
                RegisterValue::Text(text)
            }
            Kind::U16 => RegisterValue::U16(words[0]),
            Kind::I16 => RegisterValue::I16(words[0] as i16),
            Kind::U32 => RegisterValue::U32((u32::from(words[0]) << 16) | u32::from(words[1])),
            Kind::I32 => {
                RegisterValue::I32(((u32::from(words[0]) << 16) | u32::from(words[1])) as i32)
            }
        };

        Ok(value)
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            RegisterValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn integer(&self) -> Option<i64> {
        match *self {
            RegisterValue::U16(raw) => Some(i64::from(raw)),
            RegisterValue::I16(raw) => Some(i64::from(raw)),
            RegisterValue::U32(raw) => Some(i64::from(raw)),
            RegisterValue::I32(raw) => Some(i64::from(raw)),
            RegisterValue::Text(_) => None,
        }
    }

    /// Raw value divided by the fixed-point `gain`.
    pub fn scaled(&self, gain: u16) -> Option<f64> {
        self.integer().map(|raw| raw as f64 / f64::from(gain))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn decode_text_trims_nul_padding() {
        /* "SUN2000" followed by NUL padding over 10 words */
        let mut words = vec![0x5355, 0x4e32, 0x3030, 0x3000];
        words.resize(10, 0x0000);
        let value = RegisterValue::decode(Register::SerialNumber, &words).unwrap();
        assert_eq!(Some("SUN2000"), value.text());
    }

    #[test]
    fn decode_i16_is_sign_extended() {
        let value = RegisterValue::decode(Register::InternalTemperature, &[0xFFF6]).unwrap();
        assert_eq!(Some(-10), value.integer());
    }

    #[test]
    fn decode_i32_joins_big_endian_word_pair() {
        let value = RegisterValue::decode(Register::InputPower, &[0x0001, 0x0000]).unwrap();
        assert_eq!(Some(65536), value.integer());

        let negative = RegisterValue::decode(Register::ActivePower, &[0xFFFF, 0xFFFE]).unwrap();
        assert_eq!(Some(-2), negative.integer());
    }

    #[test]
    fn decode_rejects_short_reads() {
        let result = RegisterValue::decode(Register::InputPower, &[0x0001]);
        match result {
            Err(crate::Error::DecodeError(Register::InputPower, _)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn gains_match_fixed_point_encoding() {
        assert_eq!(10, Register::Pv1Voltage.gain());
        assert_eq!(100, Register::Pv1Current.gain());
        assert_eq!(10, Register::InternalTemperature.gain());
        assert_eq!(1000, Register::PowerFactor.gain());
        assert_eq!(100, Register::GridFrequency.gain());
        assert_eq!(10, Register::PhaseBVoltage.gain());
        assert_eq!(100, Register::PhaseCCurrent.gain());
        assert_eq!(1, Register::InputPower.gain());
    }

    #[test]
    fn scaled_divides_by_gain() {
        assert_eq!(Some(230.0), RegisterValue::U16(2300).scaled(10));
        assert_eq!(Some(5.5), RegisterValue::U16(550).scaled(100));
        assert_eq!(Some(0.995), RegisterValue::I16(995).scaled(1000));
        assert_eq!(Some(-1.0), RegisterValue::I16(-10).scaled(10));
    }
}
