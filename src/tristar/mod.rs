pub mod charge_state;
pub mod client;
pub mod decoder;
pub mod record;
pub mod scaling;

pub use charge_state::ChargeState;
pub use client::{ModbusSource, RegisterSource};
pub use decoder::{decode, decode_block, FieldSpec, Scale, Unit, FIELDS, REGISTER_COUNT};
pub use record::{FieldValue, MeasurementRecord, Reading};
pub use scaling::{compute_scaling, ScalingFactors};
