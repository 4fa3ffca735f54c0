use crate::error::DecodeError;

/// Normalization applied to voltage and current readings.
pub const VOLTAGE_CURRENT_SHIFT: f64 = 1.0 / 32768.0; // 2^-15

/// Normalization applied to power readings. Power is the product of two 15-bit scaled
/// quantities, so it carries an extra 2^-2 relative to voltage and current.
pub const POWER_SHIFT: f64 = 1.0 / 131072.0; // 2^-17

const V_PU_HI: usize = 0;
const V_PU_LO: usize = 1;
const I_PU_HI: usize = 2;
const I_PU_LO: usize = 3;

/// Device scaling read from the first four registers of every block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScalingFactors {
    pub voltage_scale: f64,
    pub amperage_scale: f64,
}

impl ScalingFactors {
    pub fn new(voltage_scale: f64, amperage_scale: f64) -> Self {
        Self {
            voltage_scale,
            amperage_scale,
        }
    }

    pub fn volts(&self, raw: u16) -> f64 {
        raw as f64 * self.voltage_scale * VOLTAGE_CURRENT_SHIFT
    }

    pub fn amps(&self, raw: u16) -> f64 {
        raw as f64 * self.amperage_scale * VOLTAGE_CURRENT_SHIFT
    }

    pub fn watts(&self, raw: u16) -> f64 {
        raw as f64 * self.voltage_scale * self.amperage_scale * POWER_SHIFT
    }
}

/// Derives voltage and amperage scaling from registers 0-3.
///
/// Each factor is stored as an integer part followed by a hundredths part, so
/// `[12, 34, ..]` gives a voltage scale of 12.34.
pub fn compute_scaling(raw: &[u16]) -> Result<ScalingFactors, DecodeError> {
    if raw.len() <= I_PU_LO {
        return Err(DecodeError::MalformedInput {
            expected: I_PU_LO + 1,
            actual: raw.len(),
        });
    }

    Ok(ScalingFactors {
        voltage_scale: combine(raw[V_PU_HI], raw[V_PU_LO]),
        amperage_scale: combine(raw[I_PU_HI], raw[I_PU_LO]),
    })
}

fn combine(whole: u16, hundredths: u16) -> f64 {
    whole as f64 + hundredths as f64 / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combines_whole_and_hundredths() {
        let scaling = compute_scaling(&[12, 34, 5, 6]).unwrap();
        assert!((scaling.voltage_scale - 12.34).abs() < 1e-12);
        assert!((scaling.amperage_scale - 5.06).abs() < 1e-12);
    }

    #[test]
    fn short_block_is_malformed() {
        assert_eq!(
            compute_scaling(&[1, 2, 3]),
            Err(DecodeError::MalformedInput {
                expected: 4,
                actual: 3
            })
        );
        assert!(compute_scaling(&[]).is_err());
    }

    #[test]
    fn unit_conversions() {
        let scaling = ScalingFactors::new(2.0, 3.0);
        assert_eq!(scaling.volts(32768), 2.0);
        assert_eq!(scaling.amps(16384), 1.5);
        assert_eq!(scaling.watts(1 << 15), 1.5);
    }
}
