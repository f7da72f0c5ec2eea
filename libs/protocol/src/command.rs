//! Outbound control commands.
//!
//! Every command travels as a `MSG_CFG_CONTROL` frame whose 4-byte payload is
//! the command code as a little-endian `i32`. Replies are not correlated; they
//! come back as ordinary reports.

use crate::{
    Error, HEADER_LEN, InstallMethod, MSG_CFG_CONTROL, PAYLOAD_CKSUM_LEN, SOF, Sensitivity,
    TriggerSpeed, checksum,
};

pub const COMMAND_PAYLOAD_LEN: usize = 4;
pub const COMMAND_FRAME_LEN: usize = HEADER_LEN + COMMAND_PAYLOAD_LEN + PAYLOAD_CKSUM_LEN;

/// Pause between a setter and the get that reads the new value back.
pub const FOLLOW_UP_DELAY_MS: u32 = 200;
/// Wait after opening the link before the first startup command.
pub const STARTUP_SETTLE_MS: u32 = 1_000;
pub const STARTUP_STEP_DELAY_MS: u32 = 100;

/// Sent once when the link opens: turn on target reporting, then read back
/// the settings that are not pushed spontaneously.
pub const STARTUP_SEQUENCE: [Command; 4] = [
    Command::EnableTargetDisplay,
    Command::GetSensitivity,
    Command::GetTriggerSpeed,
    Command::GetInstallMethod,
];

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    AutoGenerateInterferenceZones = 0x01,
    GetZones = 0x02,
    ClearInterferenceZone = 0x03,
    ResetDetectionZone = 0x04,
    GetHoldDelay = 0x05,
    EnablePointCloud = 0x06,
    DisablePointCloud = 0x07,
    EnableTargetDisplay = 0x08,
    DisableTargetDisplay = 0x09,
    SetSensitivityLow = 0x0A,
    SetSensitivityMedium = 0x0B,
    SetSensitivityHigh = 0x0C,
    GetSensitivity = 0x0D,
    SetTriggerSpeedSlow = 0x0E,
    SetTriggerSpeedMedium = 0x0F,
    SetTriggerSpeedFast = 0x10,
    GetTriggerSpeed = 0x11,
    GetZAxisRange = 0x12,
    SetInstallTop = 0x13,
    SetInstallSide = 0x14,
    GetInstallMethod = 0x15,
    EnableLowPower = 0x16,
    DisableLowPower = 0x17,
    GetLowPowerMode = 0x18,
    GetLowPowerSleepTime = 0x19,
    ResetNoPersonState = 0x1A,
}

impl Command {
    pub const ALL: [Command; 26] = [
        Command::AutoGenerateInterferenceZones,
        Command::GetZones,
        Command::ClearInterferenceZone,
        Command::ResetDetectionZone,
        Command::GetHoldDelay,
        Command::EnablePointCloud,
        Command::DisablePointCloud,
        Command::EnableTargetDisplay,
        Command::DisableTargetDisplay,
        Command::SetSensitivityLow,
        Command::SetSensitivityMedium,
        Command::SetSensitivityHigh,
        Command::GetSensitivity,
        Command::SetTriggerSpeedSlow,
        Command::SetTriggerSpeedMedium,
        Command::SetTriggerSpeedFast,
        Command::GetTriggerSpeed,
        Command::GetZAxisRange,
        Command::SetInstallTop,
        Command::SetInstallSide,
        Command::GetInstallMethod,
        Command::EnableLowPower,
        Command::DisableLowPower,
        Command::GetLowPowerMode,
        Command::GetLowPowerSleepTime,
        Command::ResetNoPersonState,
    ];

    pub const fn code(self) -> i32 {
        self as u8 as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.code() == code)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Command::AutoGenerateInterferenceZones => "AUTO_GEN_INTERFERENCE_ZONE",
            Command::GetZones => "GET_ZONES",
            Command::ClearInterferenceZone => "CLEAR_INTERFERENCE_ZONE",
            Command::ResetDetectionZone => "RESET_DETECTION_ZONE",
            Command::GetHoldDelay => "GET_HOLD_DELAY",
            Command::EnablePointCloud => "ENABLE_POINT_CLOUD",
            Command::DisablePointCloud => "DISABLE_POINT_CLOUD",
            Command::EnableTargetDisplay => "ENABLE_TARGET_DISPLAY",
            Command::DisableTargetDisplay => "DISABLE_TARGET_DISPLAY",
            Command::SetSensitivityLow => "SET_SENSITIVITY_LOW",
            Command::SetSensitivityMedium => "SET_SENSITIVITY_MEDIUM",
            Command::SetSensitivityHigh => "SET_SENSITIVITY_HIGH",
            Command::GetSensitivity => "GET_SENSITIVITY",
            Command::SetTriggerSpeedSlow => "SET_TRIGGER_SPEED_SLOW",
            Command::SetTriggerSpeedMedium => "SET_TRIGGER_SPEED_MEDIUM",
            Command::SetTriggerSpeedFast => "SET_TRIGGER_SPEED_FAST",
            Command::GetTriggerSpeed => "GET_TRIGGER_SPEED",
            Command::GetZAxisRange => "GET_Z_AXIS_RANGE",
            Command::SetInstallTop => "SET_INSTALL_TOP",
            Command::SetInstallSide => "SET_INSTALL_SIDE",
            Command::GetInstallMethod => "GET_INSTALL_METHOD",
            Command::EnableLowPower => "ENABLE_LOW_POWER",
            Command::DisableLowPower => "DISABLE_LOW_POWER",
            Command::GetLowPowerMode => "GET_LOW_POWER_MODE",
            Command::GetLowPowerSleepTime => "GET_LOW_POWER_SLEEP_TIME",
            Command::ResetNoPersonState => "RESET_NO_PERSON_STATE",
        }
    }
}

/// Build the complete 13-byte frame for `cmd`.
pub fn command_frame(cmd: Command) -> [u8; COMMAND_FRAME_LEN] {
    let mut frame = [0u8; COMMAND_FRAME_LEN];
    frame[0] = SOF;
    // frame id stays 0
    frame[3..5].copy_from_slice(&(COMMAND_PAYLOAD_LEN as u16).to_be_bytes());
    frame[5..7].copy_from_slice(&MSG_CFG_CONTROL.to_be_bytes());
    frame[HEADER_LEN - 1] = checksum(&frame[..HEADER_LEN - 1]);
    frame[HEADER_LEN..HEADER_LEN + COMMAND_PAYLOAD_LEN].copy_from_slice(&cmd.code().to_le_bytes());
    frame[COMMAND_FRAME_LEN - 1] = checksum(&frame[HEADER_LEN..HEADER_LEN + COMMAND_PAYLOAD_LEN]);
    frame
}

pub fn encode_command_frame(cmd: Command, out: &mut [u8]) -> Result<usize, Error> {
    if out.len() < COMMAND_FRAME_LEN {
        return Err(Error::BufferTooSmall);
    }
    out[..COMMAND_FRAME_LEN].copy_from_slice(&command_frame(cmd));
    Ok(COMMAND_FRAME_LEN)
}

/// High-level control operations accepted from outside the processing loop.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlOp {
    SetSensitivity(Sensitivity),
    SetTriggerSpeed(TriggerSpeed),
    SetInstallMethod(InstallMethod),
    SetLowPowerMode(bool),
    SetPointCloud(bool),
    SetTargetDisplay(bool),
    ClearInterferenceZone,
    ResetDetectionZone,
    AutoGenerateInterferenceZones,
    GetZones,
    GetSensitivity,
    GetTriggerSpeed,
    GetInstallMethod,
    GetHoldDelay,
    GetZRange,
    GetLowPowerMode,
    GetLowPowerTime,
    ResetNoPersonState,
}

/// Commands to send for one control operation. The follow-up, when present,
/// goes out `FOLLOW_UP_DELAY_MS` after the first command.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandPlan {
    pub first: Command,
    pub follow_up: Option<Command>,
}

impl CommandPlan {
    const fn single(first: Command) -> Self {
        Self {
            first,
            follow_up: None,
        }
    }

    const fn then(first: Command, follow_up: Command) -> Self {
        Self {
            first,
            follow_up: Some(follow_up),
        }
    }
}

impl ControlOp {
    pub fn plan(self) -> Result<CommandPlan, Error> {
        use Command as C;
        let plan = match self {
            ControlOp::SetSensitivity(level) => {
                let first = match level {
                    Sensitivity::Low => C::SetSensitivityLow,
                    Sensitivity::Medium => C::SetSensitivityMedium,
                    Sensitivity::High => C::SetSensitivityHigh,
                    Sensitivity::Unknown(_) => return Err(Error::UnsupportedControl),
                };
                CommandPlan::then(first, C::GetSensitivity)
            }
            ControlOp::SetTriggerSpeed(speed) => {
                let first = match speed {
                    TriggerSpeed::Slow => C::SetTriggerSpeedSlow,
                    TriggerSpeed::Medium => C::SetTriggerSpeedMedium,
                    TriggerSpeed::Fast => C::SetTriggerSpeedFast,
                    TriggerSpeed::Unknown(_) => return Err(Error::UnsupportedControl),
                };
                CommandPlan::then(first, C::GetTriggerSpeed)
            }
            ControlOp::SetInstallMethod(method) => {
                let first = match method {
                    InstallMethod::Top => C::SetInstallTop,
                    InstallMethod::Side => C::SetInstallSide,
                    InstallMethod::Unknown(_) => return Err(Error::UnsupportedControl),
                };
                CommandPlan::then(first, C::GetInstallMethod)
            }
            ControlOp::SetLowPowerMode(true) => {
                CommandPlan::then(C::EnableLowPower, C::GetLowPowerMode)
            }
            ControlOp::SetLowPowerMode(false) => {
                CommandPlan::then(C::DisableLowPower, C::GetLowPowerMode)
            }
            ControlOp::SetPointCloud(true) => CommandPlan::single(C::EnablePointCloud),
            ControlOp::SetPointCloud(false) => CommandPlan::single(C::DisablePointCloud),
            ControlOp::SetTargetDisplay(true) => CommandPlan::single(C::EnableTargetDisplay),
            ControlOp::SetTargetDisplay(false) => CommandPlan::single(C::DisableTargetDisplay),
            ControlOp::ClearInterferenceZone => {
                CommandPlan::then(C::ClearInterferenceZone, C::GetZones)
            }
            ControlOp::ResetDetectionZone => CommandPlan::then(C::ResetDetectionZone, C::GetZones),
            // Generation runs for 30-60 s; an immediate read-back sees the old zones.
            ControlOp::AutoGenerateInterferenceZones => {
                CommandPlan::single(C::AutoGenerateInterferenceZones)
            }
            ControlOp::GetZones => CommandPlan::single(C::GetZones),
            ControlOp::GetSensitivity => CommandPlan::single(C::GetSensitivity),
            ControlOp::GetTriggerSpeed => CommandPlan::single(C::GetTriggerSpeed),
            ControlOp::GetInstallMethod => CommandPlan::single(C::GetInstallMethod),
            ControlOp::GetHoldDelay => CommandPlan::single(C::GetHoldDelay),
            ControlOp::GetZRange => CommandPlan::single(C::GetZAxisRange),
            ControlOp::GetLowPowerMode => CommandPlan::single(C::GetLowPowerMode),
            ControlOp::GetLowPowerTime => CommandPlan::single(C::GetLowPowerSleepTime),
            ControlOp::ResetNoPersonState => CommandPlan::single(C::ResetNoPersonState),
        };
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConfigReport, Report, decode_frame, decode_report};

    #[test]
    fn sensitivity_low_frame_matches_wire_bytes() {
        let expected = [
            0x01, 0x00, 0x00, 0x00, 0x04, 0x02, 0x01, 0xF9, 0x0A, 0x00, 0x00, 0x00, 0xF5,
        ];
        assert_eq!(command_frame(Command::SetSensitivityLow), expected);
    }

    #[test]
    fn every_command_frame_validates_and_echoes_its_code() {
        for cmd in Command::ALL {
            let frame = command_frame(cmd);
            let (header, payload) = decode_frame(&frame).unwrap();
            assert_eq!(header.msg_type, MSG_CFG_CONTROL);
            assert_eq!(header.id, 0);
            assert_eq!(
                decode_report(header.msg_type, payload),
                Ok(Report::Config(ConfigReport::Control(cmd.code())))
            );
            assert_eq!(Command::from_code(cmd.code()), Some(cmd));
        }
        assert_eq!(Command::from_code(0), None);
        assert_eq!(Command::from_code(0x1B), None);
    }

    #[test]
    fn encode_into_buffer_checks_size() {
        let mut small = [0u8; COMMAND_FRAME_LEN - 1];
        assert_eq!(
            encode_command_frame(Command::GetZones, &mut small),
            Err(Error::BufferTooSmall)
        );
        let mut out = [0u8; 32];
        assert_eq!(encode_command_frame(Command::GetZones, &mut out), Ok(13));
        assert_eq!(&out[..13], &command_frame(Command::GetZones));
    }

    #[test]
    fn setters_are_followed_by_a_readback() {
        assert_eq!(
            ControlOp::SetSensitivity(Sensitivity::High).plan(),
            Ok(CommandPlan {
                first: Command::SetSensitivityHigh,
                follow_up: Some(Command::GetSensitivity)
            })
        );
        assert_eq!(
            ControlOp::SetTriggerSpeed(TriggerSpeed::Slow).plan().unwrap().follow_up,
            Some(Command::GetTriggerSpeed)
        );
        assert_eq!(
            ControlOp::ClearInterferenceZone.plan().unwrap().follow_up,
            Some(Command::GetZones)
        );
        assert_eq!(
            ControlOp::GetZones.plan(),
            Ok(CommandPlan {
                first: Command::GetZones,
                follow_up: None
            })
        );
    }

    #[test]
    fn auto_generated_zones_are_not_read_back() {
        assert_eq!(
            ControlOp::AutoGenerateInterferenceZones.plan(),
            Ok(CommandPlan {
                first: Command::AutoGenerateInterferenceZones,
                follow_up: None
            })
        );
        assert_eq!(
            ControlOp::ResetDetectionZone.plan().unwrap().follow_up,
            Some(Command::GetZones)
        );
    }

    #[test]
    fn unknown_levels_are_refused() {
        assert_eq!(
            ControlOp::SetSensitivity(Sensitivity::Unknown(9)).plan(),
            Err(Error::UnsupportedControl)
        );
        assert_eq!(
            ControlOp::SetInstallMethod(InstallMethod::Unknown(3)).plan(),
            Err(Error::UnsupportedControl)
        );
    }

    #[test]
    fn startup_sequence_enables_targets_first() {
        assert_eq!(STARTUP_SEQUENCE[0], Command::EnableTargetDisplay);
        assert_eq!(Command::EnableTargetDisplay.name(), "ENABLE_TARGET_DISPLAY");
    }
}
