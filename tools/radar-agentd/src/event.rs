use ld6002_protocol::{
    CloudPoint, ConfigReport, Report, Target, ZoneBounds, ZoneClass, ZonePresence,
};
use serde::Serialize;
use serde_json::{Value, json};

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TargetView {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub velocity: i32,
    pub cluster_id: i32,
    pub range: f32,
}

impl From<&Target> for TargetView {
    fn from(t: &Target) -> Self {
        Self {
            x: t.x,
            y: t.y,
            z: t.z,
            velocity: t.velocity,
            cluster_id: t.cluster_id,
            range: t.range(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PointView {
    pub cluster: i32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub speed: f32,
}

impl From<&CloudPoint> for PointView {
    fn from(p: &CloudPoint) -> Self {
        Self {
            cluster: p.cluster,
            x: p.x,
            y: p.y,
            z: p.z,
            speed: p.speed,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ZoneView {
    pub x_min: f32,
    pub x_max: f32,
    pub y_min: f32,
    pub y_max: f32,
    pub z_min: f32,
    pub z_max: f32,
    pub configured: bool,
}

impl From<&ZoneBounds> for ZoneView {
    fn from(z: &ZoneBounds) -> Self {
        Self {
            x_min: z.x_min,
            x_max: z.x_max,
            y_min: z.y_min,
            y_max: z.y_max,
            z_min: z.z_min,
            z_max: z.z_max,
            configured: z.is_configured(),
        }
    }
}

/// Everything the daemon pushes to sinks, one JSON object per event.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RadarEvent {
    Targets {
        count: usize,
        targets: Vec<TargetView>,
    },
    PointCloud {
        declared: i32,
        samples: Vec<PointView>,
    },
    Presence {
        zones: [bool; 4],
        occupied: usize,
    },
    Zones {
        class: &'static str,
        zones: Vec<ZoneView>,
    },
    Config {
        setting: &'static str,
        value: Value,
    },
    Opaque {
        msg_type: u16,
        payload: String,
    },
    PersonArrived,
    PersonLeft {
        duration_ms: u32,
    },
    ZonesChanged {
        zones: [bool; 4],
        occupied: usize,
    },
}

impl RadarEvent {
    pub fn presence(p: ZonePresence) -> Self {
        RadarEvent::Presence {
            zones: p.0,
            occupied: p.occupied_count(),
        }
    }

    pub fn zones_changed(p: ZonePresence) -> Self {
        RadarEvent::ZonesChanged {
            zones: p.0,
            occupied: p.occupied_count(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RadarEvent::Targets { .. } => "targets",
            RadarEvent::PointCloud { .. } => "point_cloud",
            RadarEvent::Presence { .. } => "presence",
            RadarEvent::Zones { .. } => "zones",
            RadarEvent::Config { .. } => "config",
            RadarEvent::Opaque { .. } => "opaque",
            RadarEvent::PersonArrived => "person_arrived",
            RadarEvent::PersonLeft { .. } => "person_left",
            RadarEvent::ZonesChanged { .. } => "zones_changed",
        }
    }
}

pub fn zone_views(class: ZoneClass, zones: &[ZoneBounds]) -> RadarEvent {
    RadarEvent::Zones {
        class: class.as_str(),
        zones: zones.iter().map(ZoneView::from).collect(),
    }
}

pub fn config_value(report: &ConfigReport) -> Value {
    match *report {
        ConfigReport::HoldDelay(secs) => json!(secs),
        ConfigReport::Sensitivity(s) => json!(s.as_str()),
        ConfigReport::TriggerSpeed(s) => json!(s.as_str()),
        ConfigReport::ZRange { min, max } => json!({ "min": min, "max": max }),
        ConfigReport::InstallMethod(m) => json!(m.as_str()),
        ConfigReport::LowPowerMode(on) => json!(on),
        ConfigReport::LowPowerTime(ms) => json!(ms),
        ConfigReport::WorkingMode(m) => json!(m.as_str()),
        ConfigReport::Control(code) => json!(code),
    }
}

pub fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

impl From<&Report<'_>> for RadarEvent {
    fn from(report: &Report<'_>) -> Self {
        match report {
            Report::Targets(list) => RadarEvent::Targets {
                count: list.targets.len(),
                targets: list.targets.iter().map(TargetView::from).collect(),
            },
            Report::PointCloud(cloud) => RadarEvent::PointCloud {
                declared: cloud.declared,
                samples: cloud.samples.iter().map(PointView::from).collect(),
            },
            Report::Presence(p) => RadarEvent::presence(*p),
            Report::Zones { class, zones } => zone_views(*class, zones),
            Report::Config(cfg) => RadarEvent::Config {
                setting: cfg.name(),
                value: config_value(cfg),
            },
            Report::Opaque { msg_type, payload } => RadarEvent::Opaque {
                msg_type: *msg_type,
                payload: hex(payload),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ld6002_protocol::{Sensitivity, TargetList};

    #[test]
    fn events_serialize_with_snake_case_tag() {
        let ev = RadarEvent::PersonLeft { duration_ms: 4200 };
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v, json!({"type": "person_left", "duration_ms": 4200}));
        assert_eq!(
            serde_json::to_value(RadarEvent::PersonArrived).unwrap(),
            json!({"type": "person_arrived"})
        );
    }

    #[test]
    fn config_report_carries_label() {
        let report = Report::Config(ConfigReport::Sensitivity(Sensitivity::High));
        let ev = RadarEvent::from(&report);
        assert_eq!(
            serde_json::to_value(&ev).unwrap(),
            json!({"type": "config", "setting": "sensitivity", "value": "High"})
        );
    }

    #[test]
    fn target_event_includes_range() {
        let mut list = TargetList::default();
        list.declared = 1;
        list.targets
            .push(Target {
                x: 3.0,
                y: 4.0,
                z: 0.0,
                velocity: 0,
                cluster_id: 2,
            })
            .unwrap();
        let RadarEvent::Targets { count, targets } = RadarEvent::from(&Report::Targets(list))
        else {
            panic!("expected targets");
        };
        assert_eq!(count, 1);
        assert_eq!(targets[0].range, 5.0);
    }

    #[test]
    fn opaque_payload_is_hex() {
        let payload = [0xde, 0xad, 0x01];
        let ev = RadarEvent::from(&Report::Opaque {
            msg_type: 0x0F01,
            payload: &payload,
        });
        assert_eq!(
            ev,
            RadarEvent::Opaque {
                msg_type: 0x0F01,
                payload: "dead01".into()
            }
        );
        assert_eq!(ev.kind(), "opaque");
    }
}
