use std::collections::BTreeMap;

use crate::error::DecodeError;
use crate::tristar::charge_state::ChargeState;
use crate::tristar::record::{FieldValue, MeasurementRecord};
use crate::tristar::scaling::{compute_scaling, ScalingFactors};

/// Number of holding registers read from address 0 on every poll.
pub const REGISTER_COUNT: usize = 93;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Unit {
    Volt,
    Amp,
    Watt,
    Celsius,
    ChargeState,
    Seconds,
}

impl Unit {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Volt => "V",
            Self::Amp => "A",
            Self::Watt => "W",
            Self::Celsius => "°C",
            Self::ChargeState => "",
            Self::Seconds => "s",
        }
    }
}

/// How the raw register value becomes a field value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scale {
    /// raw * voltage_scale * 2^-15
    Voltage,
    /// raw * amperage_scale * 2^-15
    Current,
    /// raw * voltage_scale * amperage_scale * 2^-17
    Power,
    /// register value as read, no scaling
    Unsigned,
    /// ordinal checked against [`ChargeState`]
    ChargeState,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub register: usize,
    pub unit: Unit,
    pub scale: Scale,
    /// decimal places used in diagnostics
    pub precision: usize,
}

const fn field(
    name: &'static str,
    label: &'static str,
    register: usize,
    unit: Unit,
    scale: Scale,
    precision: usize,
) -> FieldSpec {
    FieldSpec {
        name,
        label,
        register,
        unit,
        scale,
        precision,
    }
}

pub static FIELDS: [FieldSpec; 18] = [
    field("battery_voltage", "Battery Voltage", 24, Unit::Volt, Scale::Voltage, 2),
    field("battery_sense_voltage", "Battery Sense Voltage", 26, Unit::Volt, Scale::Voltage, 2),
    field("battery_voltage_slow", "Battery Voltage (Slow)", 38, Unit::Volt, Scale::Voltage, 2),
    field("battery_daily_minimum_voltage", "Battery Daily Minimum Voltage", 64, Unit::Volt, Scale::Voltage, 2),
    field("battery_daily_maximum_voltage", "Battery Daily Maximum Voltage", 65, Unit::Volt, Scale::Voltage, 2),
    field("target_regulation_voltage", "Target Regulation Voltage", 51, Unit::Volt, Scale::Voltage, 2),
    field("array_voltage", "Array Voltage", 27, Unit::Volt, Scale::Voltage, 2),
    field("array_charge_current", "Array Charge Current", 29, Unit::Amp, Scale::Current, 2),
    field("battery_charge_current", "Battery Charge Current", 28, Unit::Amp, Scale::Current, 2),
    field("battery_charge_current_slow", "Battery Charge Current (Slow)", 39, Unit::Amp, Scale::Current, 2),
    field("input_power", "Array Input Power", 59, Unit::Watt, Scale::Power, 2),
    field("output_power", "Controller Output Power", 58, Unit::Watt, Scale::Power, 2),
    field("heatsink_temperature", "Heatsink Temperature", 35, Unit::Celsius, Scale::Unsigned, 0),
    field("battery_temperature", "Battery Temperature", 36, Unit::Celsius, Scale::Unsigned, 0),
    field("charge_state", "Charge State", 50, Unit::ChargeState, Scale::ChargeState, 0),
    field("seconds_in_absorption_daily", "Seconds in Absorption", 77, Unit::Seconds, Scale::Unsigned, 0),
    field("seconds_in_float_daily", "Seconds in Float", 79, Unit::Seconds, Scale::Unsigned, 0),
    field("seconds_in_equalize_daily", "Seconds in Equalization", 78, Unit::Seconds, Scale::Unsigned, 0),
];

pub fn field_spec(name: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|f| f.name == name)
}

impl FieldSpec {
    pub fn decode(&self, raw: u16, scaling: &ScalingFactors) -> Result<FieldValue, DecodeError> {
        Ok(match self.scale {
            Scale::Voltage => FieldValue::Float(scaling.volts(raw)),
            Scale::Current => FieldValue::Float(scaling.amps(raw)),
            Scale::Power => FieldValue::Float(scaling.watts(raw)),
            Scale::Unsigned => FieldValue::Integer(raw as i64),
            Scale::ChargeState => {
                let state = ChargeState::try_from(raw).map_err(|_| DecodeError::OutOfRangeEnum {
                    kind: "charge state",
                    register: self.register,
                    value: raw,
                })?;
                FieldValue::Integer(state.ordinal() as i64)
            }
        })
    }

    /// Human readable rendering of a decoded value, for diagnostics only.
    pub fn describe(&self, value: FieldValue) -> String {
        match (self.unit, value) {
            (Unit::Celsius, v) => {
                let c = v.as_f64();
                format!("{}: {:.p$} {} ({:.1} °F)", self.label, c, self.unit.symbol(), celsius_to_fahrenheit(c), p = self.precision)
            }
            (Unit::ChargeState, v) => {
                let name = u16::try_from(v.as_f64() as i64)
                    .ok()
                    .and_then(|ordinal| ChargeState::try_from(ordinal).ok())
                    .map(|state| state.name())
                    .unwrap_or("UNKNOWN");
                format!("{} {:.0} - {}", self.label, v.as_f64(), name)
            }
            (Unit::Seconds, v) => {
                format!("{}: {:.0} ({:.1} minutes)", self.label, v.as_f64(), v.as_f64() / 60.0)
            }
            (unit, v) => format!("{}: {:.p$} {}", self.label, v.as_f64(), unit.symbol(), p = self.precision),
        }
    }
}

pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    9.0 / 5.0 * c + 32.0
}

/// Decodes every field in [`FIELDS`] from a full register block.
///
/// Either every field decodes or an error is returned; there are no partial records.
pub fn decode(raw: &[u16], scaling: &ScalingFactors) -> Result<MeasurementRecord, DecodeError> {
    if raw.len() < REGISTER_COUNT {
        return Err(DecodeError::MalformedInput {
            expected: REGISTER_COUNT,
            actual: raw.len(),
        });
    }

    let values = FIELDS
        .iter()
        .map(|spec| Ok((spec.name, spec.decode(raw[spec.register], scaling)?)))
        .collect::<Result<BTreeMap<_, _>, DecodeError>>()?;

    Ok(MeasurementRecord::from_values(values))
}

/// Computes scaling from the block itself, then decodes it.
pub fn decode_block(raw: &[u16]) -> Result<MeasurementRecord, DecodeError> {
    let scaling = compute_scaling(raw)?;
    decode(raw, &scaling)
}
