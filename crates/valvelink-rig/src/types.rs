//! Domain types shared by the session and its callers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ============================================================================
// Device Variants
// ============================================================================

/// Firmware variants, told apart by the identity string in `probe_result`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceVariant {
    /// Standard three-position water system.
    #[default]
    Normal,
    /// Three-arm maze water system.
    ThreeArm,
}

impl DeviceVariant {
    /// Identity string the firmware reports.
    pub const fn identity(&self) -> &'static str {
        match self {
            DeviceVariant::Normal => "water_system_normal",
            DeviceVariant::ThreeArm => "three_arm_water_system",
        }
    }

    /// Config/CLI spelling.
    pub const fn as_str(&self) -> &'static str {
        match self {
            DeviceVariant::Normal => "normal",
            DeviceVariant::ThreeArm => "three_arm",
        }
    }
}

impl fmt::Display for DeviceVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" | "water_system_normal" => Ok(DeviceVariant::Normal),
            "three_arm" | "three-arm" | "three_arm_water_system" => Ok(DeviceVariant::ThreeArm),
            other => Err(format!("unknown device variant: {}", other)),
        }
    }
}

// ============================================================================
// Operation Modes
// ============================================================================

/// How the firmware reacts to beam breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationMode {
    /// Valves follow `set_valves_state` only.
    DirectValveControl = 0,
    /// Dispense at whichever position's beam is broken.
    RewardDispensing = 1,
    /// Dispense only when the animal moves to a different position.
    AlternatingRewardDispensing = 2,
}

impl OperationMode {
    /// All modes, in code order.
    pub const ALL: [OperationMode; 3] = [
        OperationMode::DirectValveControl,
        OperationMode::RewardDispensing,
        OperationMode::AlternatingRewardDispensing,
    ];

    /// Wire code.
    pub const fn code(&self) -> i32 {
        *self as i32
    }

    /// Human-readable description.
    pub const fn description(&self) -> &'static str {
        match self {
            OperationMode::DirectValveControl => "Direct valve control",
            OperationMode::RewardDispensing => "Reward dispensing",
            OperationMode::AlternatingRewardDispensing => "Alternating reward dispensing",
        }
    }
}

impl TryFrom<i32> for OperationMode {
    type Error = String;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        OperationMode::ALL
            .into_iter()
            .find(|mode| mode.code() == code)
            .ok_or_else(|| format!("unknown operation mode code: {}", code))
    }
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl FromStr for OperationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(code) = s.parse::<i32>() {
            return OperationMode::try_from(code);
        }
        match s {
            "direct" | "direct_valve_control" => Ok(OperationMode::DirectValveControl),
            "reward" | "reward_dispensing" => Ok(OperationMode::RewardDispensing),
            "alternating" | "alternating_reward_dispensing" => {
                Ok(OperationMode::AlternatingRewardDispensing)
            }
            other => Err(format!("unknown operation mode: {}", other)),
        }
    }
}
