use anyhow::{Result, bail};
use ld6002_protocol::{ControlOp, InstallMethod, Sensitivity, TriggerSpeed};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientRequest {
    Shutdown,
    Status,
    Stats,
    Command { cmd: String, value: Option<String> },
    /// Keep the connection open and stream events as JSON lines.
    Subscribe,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientResponse {
    pub ok: bool,
    pub message: Option<String>,
    pub payload: serde_json::Value,
}

impl ClientResponse {
    pub fn ok<T: Serialize>(payload: T) -> Self {
        Self {
            ok: true,
            message: None,
            payload: serde_json::to_value(payload).unwrap_or_default(),
        }
    }
    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: Some(msg.into()),
            payload: serde_json::Value::Null,
        }
    }
}

/// Command names accepted on the control socket and the CLI.
pub const COMMAND_NAMES: &[&str] = &[
    "sensitivity",
    "trigger_speed",
    "install_method",
    "low_power",
    "point_cloud",
    "target_display",
    "clear_interference",
    "reset_detection",
    "auto_interference",
    "get_zones",
    "get_sensitivity",
    "get_trigger_speed",
    "get_install_method",
    "get_hold_delay",
    "get_z_range",
    "get_low_power_mode",
    "get_low_power_time",
    "reset_no_person",
];

/// Map a `{cmd, value}` pair onto a control operation.
pub fn parse_control(cmd: &str, value: Option<&str>) -> Result<ControlOp> {
    let value = value.map(|v| v.trim().to_ascii_lowercase());
    let value = value.as_deref();
    let op = match cmd.trim() {
        "sensitivity" => ControlOp::SetSensitivity(match require(cmd, value)? {
            "low" => Sensitivity::Low,
            "medium" => Sensitivity::Medium,
            "high" => Sensitivity::High,
            other => bail!("invalid sensitivity '{other}' (low|medium|high)"),
        }),
        "trigger_speed" => ControlOp::SetTriggerSpeed(match require(cmd, value)? {
            "slow" => TriggerSpeed::Slow,
            "medium" => TriggerSpeed::Medium,
            "fast" => TriggerSpeed::Fast,
            other => bail!("invalid trigger speed '{other}' (slow|medium|fast)"),
        }),
        "install_method" => ControlOp::SetInstallMethod(match require(cmd, value)? {
            "top" => InstallMethod::Top,
            "side" => InstallMethod::Side,
            other => bail!("invalid install method '{other}' (top|side)"),
        }),
        "low_power" => ControlOp::SetLowPowerMode(switch(cmd, value)?),
        "point_cloud" => ControlOp::SetPointCloud(switch(cmd, value)?),
        "target_display" => ControlOp::SetTargetDisplay(switch(cmd, value)?),
        "clear_interference" => ControlOp::ClearInterferenceZone,
        "reset_detection" => ControlOp::ResetDetectionZone,
        "auto_interference" => ControlOp::AutoGenerateInterferenceZones,
        "get_zones" => ControlOp::GetZones,
        "get_sensitivity" => ControlOp::GetSensitivity,
        "get_trigger_speed" => ControlOp::GetTriggerSpeed,
        "get_install_method" => ControlOp::GetInstallMethod,
        "get_hold_delay" => ControlOp::GetHoldDelay,
        "get_z_range" => ControlOp::GetZRange,
        "get_low_power_mode" => ControlOp::GetLowPowerMode,
        "get_low_power_time" => ControlOp::GetLowPowerTime,
        "reset_no_person" => ControlOp::ResetNoPersonState,
        other => bail!(
            "unknown command '{other}' (expected one of: {})",
            COMMAND_NAMES.join(", ")
        ),
    };
    Ok(op)
}

fn require<'a>(cmd: &str, value: Option<&'a str>) -> Result<&'a str> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => bail!("command '{cmd}' needs a value"),
    }
}

fn switch(cmd: &str, value: Option<&str>) -> Result<bool> {
    match require(cmd, value)? {
        "on" | "true" | "1" | "enable" => Ok(true),
        "off" | "false" | "0" | "disable" => Ok(false),
        other => bail!("invalid value '{other}' for '{cmd}' (on|off)"),
    }
}
