use ld6002_protocol::{
    ConfigReport, Error, MSG_CFG_CONTROL, MSG_DETECTION_ZONES, MSG_HOLD_DELAY,
    MSG_INTERFERENCE_ZONES, MSG_POINT_CLOUD, MSG_PRESENCE, MSG_TARGETS, MSG_WORKING_MODE, Report,
    ZoneClass, payload::ZONE_COUNT,
};
use serde::Serialize;
use std::sync::{Arc, Mutex};

use crate::event::{ZoneView, config_value};

/// Counters since process start. Frames are counted once they pass
/// validation, by message type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FrameStats {
    pub total: u64,
    pub targets: u64,
    pub presence: u64,
    pub zones: u64,
    pub config: u64,
    pub point_cloud: u64,
    pub opaque: u64,
    pub framing_errors: u64,
    pub integrity_errors: u64,
    pub incomplete_payloads: u64,
    pub transport_errors: u64,
    pub bytes: u64,
    pub commands_sent: u64,
}

impl FrameStats {
    pub fn record_frame(&mut self, msg_type: u16) {
        self.total += 1;
        match msg_type {
            MSG_TARGETS => self.targets += 1,
            MSG_PRESENCE => self.presence += 1,
            MSG_DETECTION_ZONES | MSG_INTERFERENCE_ZONES => self.zones += 1,
            MSG_POINT_CLOUD => self.point_cloud += 1,
            t if is_config_type(t) => self.config += 1,
            _ => self.opaque += 1,
        }
    }

    pub fn record_error(&mut self, err: &Error) {
        if err.is_framing() {
            self.framing_errors += 1;
        } else if err.is_integrity() {
            self.integrity_errors += 1;
        } else if matches!(err, Error::IncompletePayload { .. }) {
            self.incomplete_payloads += 1;
        }
    }

    /// Every rejection of any kind.
    pub fn errors(&self) -> u64 {
        self.framing_errors
            + self.integrity_errors
            + self.incomplete_payloads
            + self.transport_errors
    }
}

fn is_config_type(msg_type: u16) -> bool {
    matches!(msg_type, MSG_HOLD_DELAY..=MSG_WORKING_MODE | MSG_CFG_CONTROL)
}

/// Last value reported for each sensor setting.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SensorSettings {
    pub sensitivity: Option<&'static str>,
    pub trigger_speed: Option<&'static str>,
    pub install_method: Option<&'static str>,
    pub working_mode: Option<&'static str>,
    pub low_power: Option<bool>,
    pub low_power_time_ms: Option<u32>,
    pub hold_delay_s: Option<u32>,
    pub z_range: Option<[f32; 2]>,
    pub last_control: Option<i32>,
    pub detection_zones: Option<Vec<ZoneView>>,
    pub interference_zones: Option<Vec<ZoneView>>,
    pub zone_presence: Option<[bool; ZONE_COUNT]>,
}

impl SensorSettings {
    pub fn apply(&mut self, report: &Report<'_>) {
        match report {
            Report::Config(cfg) => self.apply_config(cfg),
            Report::Zones { class, zones } => {
                let views = Some(zones.iter().map(ZoneView::from).collect());
                match class {
                    ZoneClass::Detection => self.detection_zones = views,
                    ZoneClass::Interference => self.interference_zones = views,
                }
            }
            Report::Presence(p) => self.zone_presence = Some(p.0),
            _ => {}
        }
    }

    fn apply_config(&mut self, cfg: &ConfigReport) {
        match *cfg {
            ConfigReport::HoldDelay(s) => self.hold_delay_s = Some(s),
            ConfigReport::Sensitivity(s) => self.sensitivity = Some(s.as_str()),
            ConfigReport::TriggerSpeed(s) => self.trigger_speed = Some(s.as_str()),
            ConfigReport::ZRange { min, max } => self.z_range = Some([min, max]),
            ConfigReport::InstallMethod(m) => self.install_method = Some(m.as_str()),
            ConfigReport::LowPowerMode(on) => self.low_power = Some(on),
            ConfigReport::LowPowerTime(ms) => self.low_power_time_ms = Some(ms),
            ConfigReport::WorkingMode(m) => self.working_mode = Some(m.as_str()),
            ConfigReport::Control(code) => self.last_control = Some(code),
        }
        tracing::debug!(setting = cfg.name(), value = %config_value(cfg), "sensor setting");
    }
}

/// Point-in-time view handed to readers outside the processing loop.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub uptime_ms: u32,
    pub frames: FrameStats,
    pub person_present: bool,
    pub presence_duration_ms: u32,
    pub target_count: usize,
    pub stationary_count: u32,
    pub settings: SensorSettings,
}

pub type SharedStats = Arc<Mutex<StatsSnapshot>>;

pub fn shared() -> SharedStats {
    Arc::new(Mutex::new(StatsSnapshot::default()))
}

/// Copy out the latest snapshot. A poisoned lock still holds usable data.
pub fn read(shared: &SharedStats) -> StatsSnapshot {
    match shared.lock() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

pub fn store(shared: &SharedStats, snapshot: StatsSnapshot) {
    match shared.lock() {
        Ok(mut guard) => *guard = snapshot,
        Err(poisoned) => *poisoned.into_inner() = snapshot,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ld6002_protocol::{Sensitivity, ZonePresence};

    #[test]
    fn frames_are_counted_by_type() {
        let mut stats = FrameStats::default();
        for t in [MSG_TARGETS, MSG_TARGETS, MSG_PRESENCE, MSG_HOLD_DELAY, 0x0F00] {
            stats.record_frame(t);
        }
        assert_eq!(stats.total, 5);
        assert_eq!(stats.targets, 2);
        assert_eq!(stats.presence, 1);
        assert_eq!(stats.config, 1);
        assert_eq!(stats.opaque, 1);
    }

    #[test]
    fn errors_are_classified() {
        let mut stats = FrameStats::default();
        stats.record_error(&Error::FrameOverflow);
        stats.record_error(&Error::HeaderChecksum { calc: 1, rx: 2 });
        stats.record_error(&Error::IncompletePayload {
            msg_type: MSG_TARGETS,
            expected: 64,
            actual: 44,
        });
        assert_eq!(stats.framing_errors, 1);
        assert_eq!(stats.integrity_errors, 1);
        assert_eq!(stats.incomplete_payloads, 1);
        assert_eq!(stats.errors(), 3);
    }

    #[test]
    fn settings_keep_last_known_values() {
        let mut settings = SensorSettings::default();
        settings.apply(&Report::Config(ConfigReport::Sensitivity(Sensitivity::Low)));
        settings.apply(&Report::Config(ConfigReport::Sensitivity(Sensitivity::High)));
        settings.apply(&Report::Presence(ZonePresence([true, false, false, false])));
        assert_eq!(settings.sensitivity, Some("High"));
        assert_eq!(settings.zone_presence, Some([true, false, false, false]));
        assert!(settings.detection_zones.is_none());
    }

    #[test]
    fn shared_snapshot_round_trips() {
        let shared = shared();
        let mut snap = StatsSnapshot::default();
        snap.frames.total = 3;
        snap.person_present = true;
        store(&shared, snap.clone());
        assert_eq!(read(&shared), snap);
    }
}
