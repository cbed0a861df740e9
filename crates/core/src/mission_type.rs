//! Mission type parameters
//!
//! Each mission carries a `type` key selecting the reward rate, earning
//! cycle and cancellation penalty that apply to it.

use crate::error::{CoreError, Result};
use crate::mission::Mission;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key of the built-in mission type
pub const DEFAULT_MISSION_TYPE: &str = "staking";

/// Lifecycle parameters for one mission type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionTypeParams {
    /// Display name
    pub name: String,

    /// Nominal reward paid for a full earning cycle
    pub reward: f64,

    /// Length of one earning cycle in hours
    pub earning_cycle_hours: u32,

    /// Fraction of the accrued reward withheld on cancellation (0.0 to 1.0)
    #[serde(default)]
    pub cancel_penalty: f64,
}

impl MissionTypeParams {
    /// Parameters of the built-in `staking` type
    pub fn staking() -> Self {
        Self {
            name: "Staking".to_string(),
            reward: 8.0,
            earning_cycle_hours: 24,
            cancel_penalty: 0.0,
        }
    }

    fn validate(&self, key: &str) -> Result<()> {
        if !self.reward.is_finite() || self.reward < 0.0 {
            return Err(CoreError::Validation(format!(
                "mission type '{}' has invalid reward {}",
                key, self.reward
            )));
        }
        if !(0.0..=1.0).contains(&self.cancel_penalty) {
            return Err(CoreError::Validation(format!(
                "mission type '{}' has cancel_penalty {} outside [0, 1]",
                key, self.cancel_penalty
            )));
        }
        Ok(())
    }
}

/// Lookup table from mission `type` key to its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MissionTypeRegistry {
    types: BTreeMap<String, MissionTypeParams>,
}

impl MissionTypeRegistry {
    /// Create an empty registry
    pub fn empty() -> Self {
        Self {
            types: BTreeMap::new(),
        }
    }

    /// Register (or replace) a mission type
    pub fn insert(&mut self, key: impl Into<String>, params: MissionTypeParams) {
        self.types.insert(key.into(), params);
    }

    /// Parameters for a type key
    pub fn get(&self, key: &str) -> Option<&MissionTypeParams> {
        self.types.get(key)
    }

    /// Parameters for a mission's type
    pub fn for_mission(&self, mission: &Mission) -> Result<&MissionTypeParams> {
        self.get(&mission.mission_type)
            .ok_or_else(|| CoreError::UnknownMissionType(mission.mission_type.clone()))
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if no types are registered
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Validate every registered type
    pub fn validate(&self) -> Result<()> {
        if self.types.is_empty() {
            return Err(CoreError::Validation(
                "at least one mission type must be configured".to_string(),
            ));
        }
        for (key, params) in &self.types {
            params.validate(key)?;
        }
        Ok(())
    }
}

impl Default for MissionTypeRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.insert(DEFAULT_MISSION_TYPE, MissionTypeParams::staking());
        registry
    }
}
