use chrono::{DateTime, Local};
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug)]
pub struct Clock {
    start: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn now(&self) -> Timestamp {
        Timestamp {
            wall: Local::now(),
            mono: self.start.elapsed(),
        }
    }

    /// Milliseconds since start, truncated to the wrapping `u32` time base the
    /// trackers use.
    pub fn now_ms(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug)]
pub struct Timestamp {
    pub wall: DateTime<Local>,
    pub mono: Duration,
}

impl Timestamp {
    pub fn iso(&self) -> String {
        self.wall
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
    }

    pub fn mono_ms(&self) -> u128 {
        self.mono.as_millis()
    }
}

/// `1h02m03s` style rendering of a presence duration.
pub fn format_duration_ms(ms: u32) -> String {
    let secs = ms / 1000;
    let (h, m, s) = (secs / 3600, (secs / 60) % 60, secs % 60);
    if h > 0 {
        format!("{h}h{m:02}m{s:02}s")
    } else if m > 0 {
        format!("{m}m{s:02}s")
    } else {
        format!("{}.{}s", s, (ms % 1000) / 100)
    }
}
