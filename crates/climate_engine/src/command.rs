//! Actuation state and the command published for it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dwell::Actuator;

/// Operating mode of the unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HvacMode {
    #[default]
    Off,
    FanOnly,
    Cooling,
    Heating,
}

impl HvacMode {
    pub fn actuation(self) -> ActuationState {
        ActuationState::from_mode(self)
    }
}

impl fmt::Display for HvacMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HvacMode::Off => write!(f, "OFF"),
            HvacMode::FanOnly => write!(f, "FAN_ONLY"),
            HvacMode::Cooling => write!(f, "COOLING"),
            HvacMode::Heating => write!(f, "HEATING"),
        }
    }
}

/// On/off state of the three actuators.
///
/// Only constructible from an [`HvacMode`], so cooling and heating are never
/// both on and the fan always runs with either of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActuationState {
    fan: bool,
    cooling: bool,
    heating: bool,
}

impl ActuationState {
    pub fn from_mode(mode: HvacMode) -> Self {
        match mode {
            HvacMode::Off => Self::default(),
            HvacMode::FanOnly => Self {
                fan: true,
                cooling: false,
                heating: false,
            },
            HvacMode::Cooling => Self {
                fan: true,
                cooling: true,
                heating: false,
            },
            HvacMode::Heating => Self {
                fan: true,
                cooling: false,
                heating: true,
            },
        }
    }

    pub fn fan(&self) -> bool {
        self.fan
    }

    pub fn cooling(&self) -> bool {
        self.cooling
    }

    pub fn heating(&self) -> bool {
        self.heating
    }

    pub fn is_on(&self, actuator: Actuator) -> bool {
        match actuator {
            Actuator::Fan => self.fan,
            Actuator::Cooling => self.cooling,
            Actuator::Heating => self.heating,
        }
    }

    pub fn mode(&self) -> HvacMode {
        match (self.fan, self.cooling, self.heating) {
            (_, true, _) => HvacMode::Cooling,
            (_, _, true) => HvacMode::Heating,
            (true, false, false) => HvacMode::FanOnly,
            (false, false, false) => HvacMode::Off,
        }
    }

    pub fn command(&self) -> ControlCommand {
        ControlCommand::from(*self)
    }
}

/// `"ON"` / `"OFF"` label used by the operator surface
pub fn on_off(flag: bool) -> &'static str {
    if flag { "ON" } else { "OFF" }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanCommand {
    FanOn,
    FanOff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoolingCommand {
    CoolingOn,
    CoolingOff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeatingCommand {
    HeatingOn,
    HeatingOff,
}

/// Relay command serialized as
/// `{"fan": "fan_on", "cooling": "cooling_off", "heating": "heating_off"}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlCommand {
    pub fan: FanCommand,
    pub cooling: CoolingCommand,
    pub heating: HeatingCommand,
}

impl ControlCommand {
    pub fn to_payload(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl From<ActuationState> for ControlCommand {
    fn from(state: ActuationState) -> Self {
        Self {
            fan: if state.fan {
                FanCommand::FanOn
            } else {
                FanCommand::FanOff
            },
            cooling: if state.cooling {
                CoolingCommand::CoolingOn
            } else {
                CoolingCommand::CoolingOff
            },
            heating: if state.heating {
                HeatingCommand::HeatingOn
            } else {
                HeatingCommand::HeatingOff
            },
        }
    }
}
