use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

/// The autopilot mode keys. Only these may ever appear in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ApMode {
    Master,
    WingLevel,
    Heading,
    AltitudeHold,
    VerticalSpeed,
    AutoThrottle,
    TerrainFollow,
    AutoTakeoff,
}

impl ApMode {
    /// Whether this key carries a numeric target rather than a plain flag.
    const fn is_target(self) -> bool {
        matches!(
            self,
            Self::Heading | Self::AltitudeHold | Self::VerticalSpeed | Self::AutoThrottle
        )
    }
}

/// A registry slot: flag modes are `Off`/`On`, target modes are `Off` or
/// `Target(value)`. On the wire this is the operator's `false`/`true`/
/// number shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModeValue {
    Off,
    On,
    Target(f64),
}

impl Serialize for ModeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Off => serializer.serialize_bool(false),
            Self::On => serializer.serialize_bool(true),
            Self::Target(value) => serializer.serialize_f64(*value),
        }
    }
}

impl<'de> Deserialize<'de> for ModeValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Number(f64),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Flag(false) => Self::Off,
            Raw::Flag(true) => Self::On,
            Raw::Number(value) => Self::Target(value),
        })
    }
}

/// Errors rejected at the parameter boundary; the registry is never left
/// partially updated.
#[derive(Debug, Display, PartialEq)]
pub enum ParameterError {
    /// The key is not a registered mode.
    UnknownMode(String),
    /// The value shape does not match the mode (flag vs. target).
    WrongKind(ApMode),
}

impl std::error::Error for ParameterError {}

/// The mode registry: a fixed key set mapping each mode to its current
/// value. Owned exclusively by the autopilot core and only mutated through
/// it.
#[derive(Debug, Clone)]
pub struct ModeRegistry {
    entries: HashMap<ApMode, ModeValue>,
}

impl Default for ModeRegistry {
    fn default() -> Self { Self::new() }
}

impl ModeRegistry {
    /// All modes off.
    pub fn new() -> Self {
        Self { entries: ApMode::iter().map(|mode| (mode, ModeValue::Off)).collect() }
    }

    /// Validates one operator key/value pair without applying it.
    ///
    /// # Errors
    /// [`ParameterError`] for unknown keys or mismatched value shapes.
    pub fn validate(key: &str, value: ModeValue) -> Result<(ApMode, ModeValue), ParameterError> {
        let mode: ApMode =
            key.parse().map_err(|_| ParameterError::UnknownMode(String::from(key)))?;
        match value {
            ModeValue::On if mode.is_target() => Err(ParameterError::WrongKind(mode)),
            ModeValue::Target(_) if !mode.is_target() => Err(ParameterError::WrongKind(mode)),
            _ => Ok((mode, value)),
        }
    }

    /// Stores a validated value. Internal callers only; the key set never
    /// grows.
    pub(crate) fn apply(&mut self, mode: ApMode, value: ModeValue) {
        self.entries.insert(mode, value);
    }

    /// Whether a mode participates in the current cycle.
    pub fn is_enabled(&self, mode: ApMode) -> bool {
        !matches!(self.entries.get(&mode), Some(ModeValue::Off) | None)
    }

    /// The numeric target of a target mode, if one is set.
    pub fn target(&self, mode: ApMode) -> Option<f64> {
        match self.entries.get(&mode) {
            Some(ModeValue::Target(value)) => Some(*value),
            _ => None,
        }
    }

    pub(crate) fn set_flag(&mut self, mode: ApMode, enabled: bool) {
        self.apply(mode, if enabled { ModeValue::On } else { ModeValue::Off });
    }

    pub(crate) fn set_target(&mut self, mode: ApMode, value: f64) {
        self.apply(mode, ModeValue::Target(value));
    }

    /// Stable, ordered copy of the whole registry for notifications.
    pub fn snapshot(&self) -> BTreeMap<String, ModeValue> {
        self.entries.iter().map(|(mode, value)| (mode.to_string(), *value)).collect()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize { self.entries.len() }
}
