#![no_std]

#[cfg(test)]
extern crate std;

use ld6002_protocol::{Target, ZonePresence};

/// Movement of the lead target, in meters, that counts as significant.
pub const MOVEMENT_THRESHOLD_M: f32 = 0.05;
pub const REPORT_INTERVAL_MS: u32 = 5_000;
pub const ZONE_REPORT_INTERVAL_MS: u32 = 30_000;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackerConfig {
    pub movement_threshold_m: f32,
    /// A stationary person is still reported at least this often.
    pub report_interval_ms: u32,
}

impl TrackerConfig {
    pub const fn new(movement_threshold_m: f32, report_interval_ms: u32) -> Self {
        Self {
            movement_threshold_m,
            report_interval_ms,
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::new(MOVEMENT_THRESHOLD_M, REPORT_INTERVAL_MS)
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub fn distance_to(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        libm::sqrtf(dx * dx + dy * dy + dz * dz)
    }
}

impl From<&Target> for Position {
    fn from(t: &Target) -> Self {
        Self {
            x: t.x,
            y: t.y,
            z: t.z,
        }
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TrackerState {
    pub person_present: bool,
    pub first_detection_ms: u32,
    pub last_update_ms: u32,
    /// Starts at the origin.
    pub last_position: Position,
    pub stationary_count: u32,
    pub last_target_count: usize,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresenceTransition {
    Arrived,
    Departed { duration_ms: u32 },
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PresenceUpdate {
    pub transition: Option<PresenceTransition>,
    /// Lead target moved past the threshold or the target count changed.
    pub significant: bool,
    /// Caller should emit a position report now.
    pub report_due: bool,
    pub movement_m: f32,
    pub stationary_count: u32,
    pub count: usize,
}

/// Person presence derived from successive target lists.
///
/// Presence only flips when the count crosses zero; a count going 2 -> 1
/// is a significant event but never a transition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PresenceTracker {
    cfg: TrackerConfig,
    state: TrackerState,
}

impl PresenceTracker {
    pub fn new(cfg: TrackerConfig) -> Self {
        Self {
            cfg,
            state: TrackerState::default(),
        }
    }

    pub const fn state(&self) -> &TrackerState {
        &self.state
    }

    pub const fn person_present(&self) -> bool {
        self.state.person_present
    }

    /// Time since the current presence began, 0 when nobody is present.
    pub fn duration_ms(&self, now_ms: u32) -> u32 {
        if self.state.person_present {
            now_ms.wrapping_sub(self.state.first_detection_ms)
        } else {
            0
        }
    }

    pub fn update(&mut self, now_ms: u32, targets: &[Target]) -> PresenceUpdate {
        let count = targets.len();
        let count_changed = count != self.state.last_target_count;
        let mut update = PresenceUpdate {
            transition: None,
            significant: false,
            report_due: false,
            movement_m: 0.0,
            stationary_count: self.state.stationary_count,
            count,
        };

        if let Some(lead) = targets.first() {
            let position = Position::from(lead);
            let movement = position.distance_to(&self.state.last_position);

            if !self.state.person_present {
                self.state.person_present = true;
                self.state.first_detection_ms = now_ms;
                update.transition = Some(PresenceTransition::Arrived);
            }

            update.significant = movement > self.cfg.movement_threshold_m || count_changed;
            if update.significant {
                self.state.stationary_count = 0;
            } else {
                self.state.stationary_count = self.state.stationary_count.saturating_add(1);
            }

            let since_report = now_ms.wrapping_sub(self.state.last_update_ms);
            update.report_due = update.significant || since_report > self.cfg.report_interval_ms;
            if update.report_due {
                self.state.last_update_ms = now_ms;
            }

            self.state.last_position = position;
            update.movement_m = movement;
        } else if count_changed && self.state.person_present {
            self.state.person_present = false;
            self.state.stationary_count = 0;
            update.significant = true;
            update.report_due = true;
            update.transition = Some(PresenceTransition::Departed {
                duration_ms: now_ms.wrapping_sub(self.state.first_detection_ms),
            });
        }

        self.state.last_target_count = count;
        update.stationary_count = self.state.stationary_count;
        update
    }
}

impl Default for PresenceTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ZoneConfig {
    pub report_interval_ms: u32,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            report_interval_ms: ZONE_REPORT_INTERVAL_MS,
        }
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ZoneState {
    pub zones: ZonePresence,
    pub last_update_ms: u32,
    pub changed: bool,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ZoneUpdate {
    pub changed: bool,
    pub occupied: usize,
    pub report_due: bool,
}

/// Per-zone occupancy. No debounce beyond comparing with the previous mask.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ZoneTracker {
    cfg: ZoneConfig,
    state: ZoneState,
}

impl ZoneTracker {
    pub fn new(cfg: ZoneConfig) -> Self {
        Self {
            cfg,
            state: ZoneState::default(),
        }
    }

    pub const fn state(&self) -> &ZoneState {
        &self.state
    }

    pub fn update(&mut self, now_ms: u32, presence: ZonePresence) -> ZoneUpdate {
        let changed = presence != self.state.zones;
        let report_due =
            changed || now_ms.wrapping_sub(self.state.last_update_ms) > self.cfg.report_interval_ms;
        if report_due {
            self.state.last_update_ms = now_ms;
        }
        self.state.zones = presence;
        self.state.changed = changed;

        ZoneUpdate {
            changed,
            occupied: presence.occupied_count(),
            report_due,
        }
    }
}
