use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Charger state machine as reported in the charge_state register.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u16)]
pub enum ChargeState {
    Start = 0,
    NightCheck = 1,
    Disconnect = 2,
    Night = 3,
    Fault = 4,
    Mppt = 5,
    Absorption = 6,
    Float = 7,
    Equalize = 8,
    Slave = 9,
}

impl ChargeState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::NightCheck => "NIGHT_CHECK",
            Self::Disconnect => "DISCONNECT",
            Self::Night => "NIGHT",
            Self::Fault => "FAULT",
            Self::Mppt => "MPPT",
            Self::Absorption => "ABSORPTION",
            Self::Float => "FLOAT",
            Self::Equalize => "EQUALIZE",
            Self::Slave => "SLAVE",
        }
    }

    pub fn ordinal(&self) -> u16 {
        (*self).into()
    }
}

impl std::fmt::Display for ChargeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_round_trip() {
        for ordinal in 0u16..=9 {
            let state = ChargeState::try_from(ordinal).unwrap();
            assert_eq!(state.ordinal(), ordinal);
        }
        assert_eq!(ChargeState::try_from(0u16), Ok(ChargeState::Start));
        assert_eq!(ChargeState::try_from(5u16), Ok(ChargeState::Mppt));
        assert_eq!(ChargeState::try_from(9u16), Ok(ChargeState::Slave));
    }

    #[test]
    fn names() {
        assert_eq!(ChargeState::NightCheck.to_string(), "NIGHT_CHECK");
        assert_eq!(ChargeState::Mppt.name(), "MPPT");
        assert_eq!(ChargeState::Slave.name(), "SLAVE");
    }

    #[test]
    fn rejects_unknown_ordinal() {
        let err = ChargeState::try_from(10u16).unwrap_err();
        assert_eq!(err.number, 10);
        assert!(ChargeState::try_from(u16::MAX).is_err());
    }
}
