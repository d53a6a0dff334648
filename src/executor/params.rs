//! Executor parameters and the typed targets they describe.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{Error, Result};

/// Raw parameters handed to an executor factory.
pub type Params = HashMap<String, Value>;

/// Controller address of a server or chassis.
pub const PARAM_HOST: &str = "host";
/// Slot number of a blade.
pub const PARAM_BLADE_POS: &str = "bladePos";
/// Serial number of a blade.
pub const PARAM_BLADE_SERIAL: &str = "bladeSerial";

/// The device a plan acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A standalone server controller.
    Host { host: String },
    /// A chassis controller.
    Chassis { host: String },
    /// A blade addressed by its slot in a chassis.
    BladeByPosition { chassis: String, position: i32 },
    /// A blade addressed by its serial number.
    BladeBySerial { chassis: String, serial: String },
}

impl Target {
    /// Read a server target from `params`.
    pub fn host_from(params: &Params) -> Result<Self> {
        Ok(Self::Host {
            host: string_param(params, PARAM_HOST)?,
        })
    }

    /// Read a chassis target from `params`.
    pub fn chassis_from(params: &Params) -> Result<Self> {
        Ok(Self::Chassis {
            host: string_param(params, PARAM_HOST)?,
        })
    }

    /// Read a blade-by-slot target from `params`.
    pub fn blade_by_position_from(params: &Params) -> Result<Self> {
        let chassis = string_param(params, PARAM_HOST)?;
        let position = position_param(params)?;
        Ok(Self::BladeByPosition { chassis, position })
    }

    /// Read a blade-by-serial target from `params`.
    pub fn blade_by_serial_from(params: &Params) -> Result<Self> {
        let chassis = string_param(params, PARAM_HOST)?;
        let serial = string_param(params, PARAM_BLADE_SERIAL)?;
        Ok(Self::BladeBySerial { chassis, serial })
    }

    /// The controller this target is reached through.
    pub fn controller(&self) -> &str {
        match self {
            Target::Host { host } | Target::Chassis { host } => host,
            Target::BladeByPosition { chassis, .. } | Target::BladeBySerial { chassis, .. } => {
                chassis
            }
        }
    }

    /// Parameters that describe this target.
    pub fn to_params(&self) -> Params {
        let mut params = Params::new();
        params.insert(PARAM_HOST.into(), Value::from(self.controller()));
        match self {
            Target::Host { .. } | Target::Chassis { .. } => {}
            Target::BladeByPosition { position, .. } => {
                params.insert(PARAM_BLADE_POS.into(), Value::from(*position));
            }
            Target::BladeBySerial { serial, .. } => {
                params.insert(PARAM_BLADE_SERIAL.into(), Value::from(serial.as_str()));
            }
        }
        params
    }
}

fn required<'a>(params: &'a Params, name: &str) -> Result<&'a Value> {
    params
        .get(name)
        .ok_or_else(|| Error::MissingParameter(name.to_string()))
}

/// Render a parameter value as text. Strings are used as-is, anything else
/// in its JSON form.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A required, non-empty text parameter.
fn string_param(params: &Params, name: &str) -> Result<String> {
    let text = value_text(required(params, name)?);
    if text.trim().is_empty() {
        return Err(Error::invalid_parameter(name, text, "must not be empty"));
    }
    Ok(text)
}

/// The required blade slot. Slots are plain integers; negative numbers
/// parse and whether the chassis accepts them is up to the driver.
fn position_param(params: &Params) -> Result<i32> {
    let value = required(params, PARAM_BLADE_POS)?;
    if let Some(n) = value.as_i64() {
        return i32::try_from(n)
            .map_err(|e| Error::invalid_parameter(PARAM_BLADE_POS, n.to_string(), e.to_string()));
    }
    let text = value_text(value);
    text.parse::<i32>()
        .map_err(|e| Error::invalid_parameter(PARAM_BLADE_POS, text.clone(), e.to_string()))
}
