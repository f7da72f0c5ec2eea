//! Typed decoding of validated frame payloads.
//!
//! Header fields are big-endian; every payload scalar is little-endian.

use heapless::Vec;

use crate::{
    Error, MSG_CFG_CONTROL, MSG_DETECTION_ZONES, MSG_HOLD_DELAY, MSG_INSTALL_METHOD,
    MSG_INTERFERENCE_ZONES, MSG_LOW_POWER_MODE, MSG_LOW_POWER_TIME, MSG_POINT_CLOUD,
    MSG_PRESENCE, MSG_SENSITIVITY, MSG_TARGETS, MSG_TRIGGER_SPEED, MSG_WORKING_MODE, MSG_Z_RANGE,
};

/// Targets materialized per report; further records are length-checked only.
pub const MAX_TARGETS: usize = 10;
pub const TARGET_RECORD_LEN: usize = 20;
pub const POINT_RECORD_LEN: usize = 20;
/// Point-cloud records kept for diagnostics.
pub const POINT_SAMPLE_CAP: usize = 4;
pub const ZONE_COUNT: usize = 4;
pub const ZONE_RECORD_LEN: usize = 24;
pub const ZONES_PAYLOAD_LEN: usize = ZONE_COUNT * ZONE_RECORD_LEN;
pub const PRESENCE_PAYLOAD_LEN: usize = ZONE_COUNT * 4;
const COUNT_LEN: usize = 4;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Target {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Doppler index, a signed proxy for radial speed.
    pub velocity: i32,
    /// Advisory grouping id, not a stable track id.
    pub cluster_id: i32,
}

impl Target {
    /// Distance from the sensor in meters.
    pub fn range(&self) -> f32 {
        libm::sqrtf(self.x * self.x + self.y * self.y + self.z * self.z)
    }

    pub fn is_moving(&self) -> bool {
        self.velocity != 0
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TargetList {
    /// Count as sent by the sensor, may exceed the materialized records.
    pub declared: i32,
    pub targets: Vec<Target, MAX_TARGETS>,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CloudPoint {
    pub cluster: i32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub speed: f32,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointCloud {
    pub declared: i32,
    pub samples: Vec<CloudPoint, POINT_SAMPLE_CAP>,
}

/// Per-zone occupancy flags, latest wins.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ZonePresence(pub [bool; ZONE_COUNT]);

impl ZonePresence {
    pub fn occupied_count(&self) -> usize {
        self.0.iter().filter(|&&z| z).count()
    }

    pub fn is_occupied(&self, zone: usize) -> bool {
        self.0.get(zone).copied().unwrap_or(false)
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZoneClass {
    Detection,
    Interference,
}

impl ZoneClass {
    pub const fn as_str(self) -> &'static str {
        match self {
            ZoneClass::Detection => "detection",
            ZoneClass::Interference => "interference",
        }
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ZoneBounds {
    pub x_min: f32,
    pub x_max: f32,
    pub y_min: f32,
    pub y_max: f32,
    pub z_min: f32,
    pub z_max: f32,
}

impl ZoneBounds {
    /// All-zero bounds mean the zone is not configured.
    pub fn is_configured(&self) -> bool {
        *self != ZoneBounds::default()
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sensitivity {
    Low,
    Medium,
    High,
    Unknown(u8),
}

impl From<u8> for Sensitivity {
    fn from(value: u8) -> Self {
        match value {
            0 => Sensitivity::Low,
            1 => Sensitivity::Medium,
            2 => Sensitivity::High,
            other => Sensitivity::Unknown(other),
        }
    }
}

impl From<Sensitivity> for u8 {
    fn from(value: Sensitivity) -> Self {
        match value {
            Sensitivity::Low => 0,
            Sensitivity::Medium => 1,
            Sensitivity::High => 2,
            Sensitivity::Unknown(v) => v,
        }
    }
}

impl Sensitivity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Sensitivity::Low => "Low",
            Sensitivity::Medium => "Medium",
            Sensitivity::High => "High",
            Sensitivity::Unknown(_) => "Unknown",
        }
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerSpeed {
    Slow,
    Medium,
    Fast,
    Unknown(u8),
}

impl From<u8> for TriggerSpeed {
    fn from(value: u8) -> Self {
        match value {
            0 => TriggerSpeed::Slow,
            1 => TriggerSpeed::Medium,
            2 => TriggerSpeed::Fast,
            other => TriggerSpeed::Unknown(other),
        }
    }
}

impl From<TriggerSpeed> for u8 {
    fn from(value: TriggerSpeed) -> Self {
        match value {
            TriggerSpeed::Slow => 0,
            TriggerSpeed::Medium => 1,
            TriggerSpeed::Fast => 2,
            TriggerSpeed::Unknown(v) => v,
        }
    }
}

impl TriggerSpeed {
    pub const fn as_str(self) -> &'static str {
        match self {
            TriggerSpeed::Slow => "Slow",
            TriggerSpeed::Medium => "Medium",
            TriggerSpeed::Fast => "Fast",
            TriggerSpeed::Unknown(_) => "Unknown",
        }
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstallMethod {
    Top,
    Side,
    Unknown(u8),
}

impl From<u8> for InstallMethod {
    fn from(value: u8) -> Self {
        match value {
            0 => InstallMethod::Top,
            1 => InstallMethod::Side,
            other => InstallMethod::Unknown(other),
        }
    }
}

impl From<InstallMethod> for u8 {
    fn from(value: InstallMethod) -> Self {
        match value {
            InstallMethod::Top => 0,
            InstallMethod::Side => 1,
            InstallMethod::Unknown(v) => v,
        }
    }
}

impl InstallMethod {
    pub const fn as_str(self) -> &'static str {
        match self {
            InstallMethod::Top => "Top-mounted",
            InstallMethod::Side => "Side-mounted",
            InstallMethod::Unknown(_) => "Unknown",
        }
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkingMode {
    LowPower,
    Normal,
    Unknown(u8),
}

impl From<u8> for WorkingMode {
    fn from(value: u8) -> Self {
        match value {
            0 => WorkingMode::LowPower,
            1 => WorkingMode::Normal,
            other => WorkingMode::Unknown(other),
        }
    }
}

impl From<WorkingMode> for u8 {
    fn from(value: WorkingMode) -> Self {
        match value {
            WorkingMode::LowPower => 0,
            WorkingMode::Normal => 1,
            WorkingMode::Unknown(v) => v,
        }
    }
}

impl WorkingMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            WorkingMode::LowPower => "Low-power",
            WorkingMode::Normal => "Normal",
            WorkingMode::Unknown(_) => "Unknown",
        }
    }
}

/// Scalar settings reported by the sensor, usually in reply to a get command.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ConfigReport {
    /// Seconds a target is held after it stops being detected.
    HoldDelay(u32),
    Sensitivity(Sensitivity),
    TriggerSpeed(TriggerSpeed),
    ZRange { min: f32, max: f32 },
    InstallMethod(InstallMethod),
    LowPowerMode(bool),
    /// Milliseconds.
    LowPowerTime(u32),
    WorkingMode(WorkingMode),
    /// Echo of a control code.
    Control(i32),
}

impl ConfigReport {
    pub const fn name(&self) -> &'static str {
        match self {
            ConfigReport::HoldDelay(_) => "hold_delay",
            ConfigReport::Sensitivity(_) => "sensitivity",
            ConfigReport::TriggerSpeed(_) => "trigger_speed",
            ConfigReport::ZRange { .. } => "z_range",
            ConfigReport::InstallMethod(_) => "install_method",
            ConfigReport::LowPowerMode(_) => "low_power_mode",
            ConfigReport::LowPowerTime(_) => "low_power_time",
            ConfigReport::WorkingMode(_) => "working_mode",
            ConfigReport::Control(_) => "control",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Report<'a> {
    Targets(TargetList),
    PointCloud(PointCloud),
    Presence(ZonePresence),
    Zones {
        class: ZoneClass,
        zones: [ZoneBounds; ZONE_COUNT],
    },
    Config(ConfigReport),
    /// Unrecognized type, passed through untouched.
    Opaque { msg_type: u16, payload: &'a [u8] },
}

/// Decode the payload of a validated frame according to its message type.
pub fn decode_report(msg_type: u16, payload: &[u8]) -> Result<Report<'_>, Error> {
    let report = match msg_type {
        MSG_TARGETS => Report::Targets(decode_targets(payload)?),
        MSG_POINT_CLOUD => Report::PointCloud(decode_point_cloud(payload)?),
        MSG_PRESENCE => Report::Presence(decode_presence(payload)?),
        MSG_DETECTION_ZONES => Report::Zones {
            class: ZoneClass::Detection,
            zones: decode_zones(msg_type, payload)?,
        },
        MSG_INTERFERENCE_ZONES => Report::Zones {
            class: ZoneClass::Interference,
            zones: decode_zones(msg_type, payload)?,
        },
        MSG_HOLD_DELAY => Report::Config(ConfigReport::HoldDelay(read_u32_le(
            require(msg_type, payload, 4)?,
            0,
        ))),
        MSG_SENSITIVITY => Report::Config(ConfigReport::Sensitivity(
            require(msg_type, payload, 1)?[0].into(),
        )),
        MSG_TRIGGER_SPEED => Report::Config(ConfigReport::TriggerSpeed(
            require(msg_type, payload, 1)?[0].into(),
        )),
        MSG_Z_RANGE => {
            let b = require(msg_type, payload, 8)?;
            Report::Config(ConfigReport::ZRange {
                min: read_f32_le(b, 0),
                max: read_f32_le(b, 4),
            })
        }
        MSG_INSTALL_METHOD => Report::Config(ConfigReport::InstallMethod(
            require(msg_type, payload, 1)?[0].into(),
        )),
        MSG_LOW_POWER_MODE => Report::Config(ConfigReport::LowPowerMode(
            require(msg_type, payload, 1)?[0] != 0,
        )),
        MSG_LOW_POWER_TIME => Report::Config(ConfigReport::LowPowerTime(read_u32_le(
            require(msg_type, payload, 4)?,
            0,
        ))),
        MSG_WORKING_MODE => Report::Config(ConfigReport::WorkingMode(
            require(msg_type, payload, 1)?[0].into(),
        )),
        MSG_CFG_CONTROL => Report::Config(ConfigReport::Control(read_i32_le(
            require(msg_type, payload, 4)?,
            0,
        ))),
        _ => Report::Opaque { msg_type, payload },
    };
    Ok(report)
}

fn require(msg_type: u16, payload: &[u8], expected: usize) -> Result<&[u8], Error> {
    if payload.len() < expected {
        return Err(Error::IncompletePayload {
            msg_type,
            expected,
            actual: payload.len(),
        });
    }
    Ok(payload)
}

/// Payload bytes needed for `count` fixed-size records behind a count prefix,
/// computed without overflowing on hostile counts.
fn records_len(count: i32, record_len: usize) -> usize {
    let records = usize::try_from(count.max(0)).unwrap_or(usize::MAX);
    records
        .checked_mul(record_len)
        .and_then(|n| n.checked_add(COUNT_LEN))
        .unwrap_or(usize::MAX)
}

fn decode_targets(payload: &[u8]) -> Result<TargetList, Error> {
    let declared = read_i32_le(require(MSG_TARGETS, payload, COUNT_LEN)?, 0);
    let mut list = TargetList {
        declared,
        targets: Vec::new(),
    };
    if declared <= 0 {
        return Ok(list);
    }

    require(MSG_TARGETS, payload, records_len(declared, TARGET_RECORD_LEN))?;
    let records = payload[COUNT_LEN..].chunks_exact(TARGET_RECORD_LEN);
    for rec in records.take((declared as usize).min(MAX_TARGETS)) {
        let target = Target {
            x: read_f32_le(rec, 0),
            y: read_f32_le(rec, 4),
            z: read_f32_le(rec, 8),
            velocity: read_i32_le(rec, 12),
            cluster_id: read_i32_le(rec, 16),
        };
        // Capacity is MAX_TARGETS and take() stops there.
        let _ = list.targets.push(target);
    }
    Ok(list)
}

fn decode_point_cloud(payload: &[u8]) -> Result<PointCloud, Error> {
    let declared = read_i32_le(require(MSG_POINT_CLOUD, payload, COUNT_LEN)?, 0);
    let mut cloud = PointCloud {
        declared,
        samples: Vec::new(),
    };
    if declared <= 0 {
        return Ok(cloud);
    }

    // A cloud too short for its sampled prefix still reports its count.
    let sampled = (declared as usize).min(POINT_SAMPLE_CAP);
    if payload.len() < records_len(sampled as i32, POINT_RECORD_LEN) {
        return Ok(cloud);
    }
    for rec in payload[COUNT_LEN..]
        .chunks_exact(POINT_RECORD_LEN)
        .take(sampled)
    {
        let _ = cloud.samples.push(CloudPoint {
            cluster: read_i32_le(rec, 0),
            x: read_f32_le(rec, 4),
            y: read_f32_le(rec, 8),
            z: read_f32_le(rec, 12),
            speed: read_f32_le(rec, 16),
        });
    }
    Ok(cloud)
}

fn decode_presence(payload: &[u8]) -> Result<ZonePresence, Error> {
    let b = require(MSG_PRESENCE, payload, PRESENCE_PAYLOAD_LEN)?;
    let mut zones = [false; ZONE_COUNT];
    for (i, zone) in zones.iter_mut().enumerate() {
        *zone = read_u32_le(b, i * 4) != 0;
    }
    Ok(ZonePresence(zones))
}

fn decode_zones(msg_type: u16, payload: &[u8]) -> Result<[ZoneBounds; ZONE_COUNT], Error> {
    let b = require(msg_type, payload, ZONES_PAYLOAD_LEN)?;
    let mut zones = [ZoneBounds::default(); ZONE_COUNT];
    for (zone, rec) in zones.iter_mut().zip(b.chunks_exact(ZONE_RECORD_LEN)) {
        *zone = ZoneBounds {
            x_min: read_f32_le(rec, 0),
            x_max: read_f32_le(rec, 4),
            y_min: read_f32_le(rec, 8),
            y_max: read_f32_le(rec, 12),
            z_min: read_f32_le(rec, 16),
            z_max: read_f32_le(rec, 20),
        };
    }
    Ok(zones)
}

fn le_word(b: &[u8], at: usize) -> [u8; 4] {
    [b[at], b[at + 1], b[at + 2], b[at + 3]]
}

pub(crate) fn read_i32_le(b: &[u8], at: usize) -> i32 {
    i32::from_le_bytes(le_word(b, at))
}

pub(crate) fn read_u32_le(b: &[u8], at: usize) -> u32 {
    u32::from_le_bytes(le_word(b, at))
}

pub(crate) fn read_f32_le(b: &[u8], at: usize) -> f32 {
    f32::from_le_bytes(le_word(b, at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec as StdVec;

    fn target_payload(declared: i32, records: &[(f32, f32, f32, i32, i32)]) -> StdVec<u8> {
        let mut out = declared.to_le_bytes().to_vec();
        for &(x, y, z, v, c) in records {
            out.extend_from_slice(&x.to_le_bytes());
            out.extend_from_slice(&y.to_le_bytes());
            out.extend_from_slice(&z.to_le_bytes());
            out.extend_from_slice(&v.to_le_bytes());
            out.extend_from_slice(&c.to_le_bytes());
        }
        out
    }

    #[test]
    fn decodes_target_records_in_field_order() {
        let payload = target_payload(2, &[(1.0, -0.5, 1.5, 3, 7), (0.25, 2.0, 0.0, -1, 8)]);
        let Report::Targets(list) = decode_report(MSG_TARGETS, &payload).unwrap() else {
            panic!("expected targets");
        };
        assert_eq!(list.declared, 2);
        assert_eq!(list.targets.len(), 2);
        assert_eq!(
            list.targets[0],
            Target {
                x: 1.0,
                y: -0.5,
                z: 1.5,
                velocity: 3,
                cluster_id: 7
            }
        );
        assert!(list.targets[0].is_moving());
        assert_eq!(list.targets[1].cluster_id, 8);
    }

    #[test]
    fn truncated_target_list_is_rejected() {
        let payload = target_payload(3, &[(0.0, 0.0, 0.0, 0, 0), (0.0, 0.0, 0.0, 0, 0)]);
        assert_eq!(payload.len(), 4 + 2 * 20);
        assert_eq!(
            decode_report(MSG_TARGETS, &payload),
            Err(Error::IncompletePayload {
                msg_type: MSG_TARGETS,
                expected: 64,
                actual: 44
            })
        );
    }

    #[test]
    fn non_positive_count_yields_empty_list() {
        for count in [0, -4] {
            let payload = target_payload(count, &[]);
            let Report::Targets(list) = decode_report(MSG_TARGETS, &payload).unwrap() else {
                panic!("expected targets");
            };
            assert!(list.targets.is_empty());
        }
    }

    #[test]
    fn huge_declared_count_does_not_overflow() {
        let payload = target_payload(i32::MAX, &[(0.0, 0.0, 0.0, 0, 0)]);
        assert!(matches!(
            decode_report(MSG_TARGETS, &payload),
            Err(Error::IncompletePayload { .. })
        ));
    }

    #[test]
    fn targets_beyond_cap_are_checked_but_not_kept() {
        let records = [(1.0, 1.0, 1.0, 0, 1); 12];
        let payload = target_payload(12, &records);
        let Report::Targets(list) = decode_report(MSG_TARGETS, &payload).unwrap() else {
            panic!("expected targets");
        };
        assert_eq!(list.declared, 12);
        assert_eq!(list.targets.len(), MAX_TARGETS);
    }

    #[test]
    fn presence_words_map_to_zone_flags() {
        let mut payload = StdVec::new();
        for v in [0u32, 5, 0, 1] {
            payload.extend_from_slice(&v.to_le_bytes());
        }
        let report = decode_report(MSG_PRESENCE, &payload).unwrap();
        let Report::Presence(p) = report else {
            panic!("expected presence");
        };
        assert_eq!(p, ZonePresence([false, true, false, true]));
        assert_eq!(p.occupied_count(), 2);
        assert!(!p.is_occupied(9));

        assert!(matches!(
            decode_report(MSG_PRESENCE, &payload[..15]),
            Err(Error::IncompletePayload { expected: 16, .. })
        ));
    }

    #[test]
    fn zone_type_selects_class() {
        let mut payload = StdVec::new();
        for i in 0..24 {
            payload.extend_from_slice(&(i as f32).to_le_bytes());
        }
        let Report::Zones { class, zones } =
            decode_report(MSG_INTERFERENCE_ZONES, &payload).unwrap()
        else {
            panic!("expected zones");
        };
        assert_eq!(class, ZoneClass::Interference);
        assert_eq!(zones[0].x_min, 0.0);
        assert_eq!(zones[0].z_max, 5.0);
        assert_eq!(zones[3].x_min, 18.0);
        assert!(!ZoneBounds::default().is_configured());

        let Report::Zones { class, .. } = decode_report(MSG_DETECTION_ZONES, &payload).unwrap()
        else {
            panic!("expected zones");
        };
        assert_eq!(class, ZoneClass::Detection);
        assert!(decode_report(MSG_DETECTION_ZONES, &payload[..95]).is_err());
    }

    #[test]
    fn scalar_reports_decode_per_type() {
        assert_eq!(
            decode_report(MSG_HOLD_DELAY, &30u32.to_le_bytes()),
            Ok(Report::Config(ConfigReport::HoldDelay(30)))
        );
        assert_eq!(
            decode_report(MSG_SENSITIVITY, &[2]),
            Ok(Report::Config(ConfigReport::Sensitivity(Sensitivity::High)))
        );
        assert_eq!(
            decode_report(MSG_TRIGGER_SPEED, &[7]),
            Ok(Report::Config(ConfigReport::TriggerSpeed(
                TriggerSpeed::Unknown(7)
            )))
        );
        assert_eq!(
            decode_report(MSG_INSTALL_METHOD, &[1]),
            Ok(Report::Config(ConfigReport::InstallMethod(
                InstallMethod::Side
            )))
        );
        assert_eq!(
            decode_report(MSG_WORKING_MODE, &[0]),
            Ok(Report::Config(ConfigReport::WorkingMode(
                WorkingMode::LowPower
            )))
        );
        let mut range = (-0.5f32).to_le_bytes().to_vec();
        range.extend_from_slice(&2.5f32.to_le_bytes());
        assert_eq!(
            decode_report(MSG_Z_RANGE, &range),
            Ok(Report::Config(ConfigReport::ZRange {
                min: -0.5,
                max: 2.5
            }))
        );
        assert!(matches!(
            decode_report(MSG_LOW_POWER_TIME, &[1, 2]),
            Err(Error::IncompletePayload { expected: 4, .. })
        ));
        assert!(matches!(
            decode_report(MSG_SENSITIVITY, &[]),
            Err(Error::IncompletePayload { .. })
        ));
    }

    #[test]
    fn point_cloud_keeps_only_a_sample() {
        let mut payload = 6i32.to_le_bytes().to_vec();
        for i in 0..POINT_SAMPLE_CAP as i32 {
            payload.extend_from_slice(&i.to_le_bytes());
            for v in [0.5f32, 1.0, 1.5, 0.1] {
                payload.extend_from_slice(&v.to_le_bytes());
            }
        }
        let Report::PointCloud(cloud) = decode_report(MSG_POINT_CLOUD, &payload).unwrap() else {
            panic!("expected point cloud");
        };
        assert_eq!(cloud.declared, 6);
        assert_eq!(cloud.samples.len(), POINT_SAMPLE_CAP);
        assert_eq!(cloud.samples[3].cluster, 3);
        assert_eq!(cloud.samples[0].speed, 0.1);
    }

    #[test]
    fn short_point_cloud_keeps_count_without_samples() {
        let mut payload = 3i32.to_le_bytes().to_vec();
        payload.extend(std::iter::repeat_n(0u8, POINT_RECORD_LEN + 7));
        assert_eq!(
            decode_report(MSG_POINT_CLOUD, &payload),
            Ok(Report::PointCloud(PointCloud {
                declared: 3,
                samples: Vec::new(),
            }))
        );
        assert!(matches!(
            decode_report(MSG_POINT_CLOUD, &[1, 0]),
            Err(Error::IncompletePayload { .. })
        ));
    }

    #[test]
    fn unknown_type_passes_through() {
        let payload = [9, 8, 7];
        assert_eq!(
            decode_report(0x0F00, &payload),
            Ok(Report::Opaque {
                msg_type: 0x0F00,
                payload: &payload
            })
        );
    }

    #[test]
    fn enum_codes_round_trip_including_unknown() {
        for code in [0u8, 1, 2, 200] {
            assert_eq!(u8::from(Sensitivity::from(code)), code);
            assert_eq!(u8::from(TriggerSpeed::from(code)), code);
            assert_eq!(u8::from(InstallMethod::from(code)), code);
            assert_eq!(u8::from(WorkingMode::from(code)), code);
        }
        assert_eq!(InstallMethod::Top.as_str(), "Top-mounted");
        assert_eq!(Sensitivity::from(1).as_str(), "Medium");
    }
}
