use anyhow::{Context, Result};
use ld6002_presence::{
    PresenceTracker, PresenceTransition, PresenceUpdate, TrackerConfig, ZoneConfig, ZoneTracker,
};
use ld6002_protocol::{
    Command, ControlOp, Error, FRAME_CAPACITY, FrameAssembler, Report, STARTUP_SEQUENCE,
    TargetList, ZonePresence, command_frame, decode_frame, decode_report,
};
use std::fmt;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::event::{RadarEvent, hex};
use crate::sink::EventSink;
use crate::stats::{self, FrameStats, SensorSettings, SharedStats, StatsSnapshot};
use crate::timefmt::{Clock, format_duration_ms};

const READ_CHUNK: usize = 256;
const WARN_INTERVAL_MS: u32 = 2_000;
const WARN_HEAD_LEN: usize = 8;

/// At most one warning per interval; the rest are only counted.
#[derive(Clone, Copy, Debug)]
pub struct RateLimiter {
    interval_ms: u32,
    last_ms: Option<u32>,
}

impl RateLimiter {
    pub const fn new(interval_ms: u32) -> Self {
        Self {
            interval_ms,
            last_ms: None,
        }
    }

    pub fn allow(&mut self, now_ms: u32) -> bool {
        match self.last_ms {
            Some(last) if now_ms.wrapping_sub(last) < self.interval_ms => false,
            _ => {
                self.last_ms = Some(now_ms);
                true
            }
        }
    }
}

/// Bytes in, events out: reassembly, validation, decoding and tracking.
pub struct Pipeline {
    assembler: FrameAssembler<FRAME_CAPACITY>,
    presence: PresenceTracker,
    zones: ZoneTracker,
    stats: FrameStats,
    settings: SensorSettings,
    warn_limit: RateLimiter,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(TrackerConfig::default(), ZoneConfig::default())
    }
}

impl Pipeline {
    pub fn new(tracker: TrackerConfig, zones: ZoneConfig) -> Self {
        Self {
            assembler: FrameAssembler::new(),
            presence: PresenceTracker::new(tracker),
            zones: ZoneTracker::new(zones),
            stats: FrameStats::default(),
            settings: SensorSettings::default(),
            warn_limit: RateLimiter::new(WARN_INTERVAL_MS),
        }
    }

    pub fn ingest(&mut self, bytes: &[u8], now_ms: u32, sink: &mut dyn EventSink) {
        self.stats.bytes += bytes.len() as u64;
        for &byte in bytes {
            match self.assembler.push(byte) {
                Ok(Some(frame)) => self.dispatch(&frame, now_ms, sink),
                Ok(None) => {}
                Err(err) => self.reject(&err, None, now_ms),
            }
        }
    }

    fn dispatch(&mut self, frame: &[u8], now_ms: u32, sink: &mut dyn EventSink) {
        let (header, payload) = match decode_frame(frame) {
            Ok(parts) => parts,
            Err(err) => return self.reject(&err, Some(frame), now_ms),
        };
        self.stats.record_frame(header.msg_type);
        debug!(
            "rx frame id={} type=0x{:04x} len={}",
            header.id, header.msg_type, header.len
        );

        let report = match decode_report(header.msg_type, payload) {
            Ok(report) => report,
            Err(err) => return self.reject(&err, Some(frame), now_ms),
        };
        self.settings.apply(&report);
        sink.publish(&RadarEvent::from(&report));

        match &report {
            Report::Targets(list) => self.track_targets(now_ms, list, sink),
            Report::Presence(p) => self.track_zones(now_ms, *p, sink),
            Report::Zones { class, zones } => {
                let configured = zones.iter().filter(|z| z.is_configured()).count();
                info!("{} zones updated ({configured} configured)", class.as_str());
            }
            Report::Config(cfg) => {
                info!("sensor {} = {}", cfg.name(), crate::event::config_value(cfg));
            }
            _ => {}
        }
    }

    fn track_targets(&mut self, now_ms: u32, list: &TargetList, sink: &mut dyn EventSink) {
        let update = self.presence.update(now_ms, &list.targets);
        match update.transition {
            Some(PresenceTransition::Arrived) => {
                info!("person detected ({} targets)", update.count);
                sink.publish(&RadarEvent::PersonArrived);
            }
            Some(PresenceTransition::Departed { duration_ms }) => {
                info!("person left after {}", format_duration_ms(duration_ms));
                sink.publish(&RadarEvent::PersonLeft { duration_ms });
            }
            None => {}
        }

        if !update.report_due {
            return;
        }
        if let Some(lead) = list.targets.first() {
            info!(
                "targets={} lead=({:.2}, {:.2}, {:.2}) range={:.2}m {} present_for={}",
                update.count,
                lead.x,
                lead.y,
                lead.z,
                lead.range(),
                motion_label(lead.is_moving(), &update),
                format_duration_ms(self.presence.duration_ms(now_ms)),
            );
        }
    }

    fn track_zones(&mut self, now_ms: u32, presence: ZonePresence, sink: &mut dyn EventSink) {
        let update = self.zones.update(now_ms, presence);
        if update.changed {
            info!("zone occupancy changed: {:?}", presence.0);
            sink.publish(&RadarEvent::zones_changed(presence));
        } else if update.report_due && update.occupied > 0 {
            info!("{} zones occupied: {:?}", update.occupied, presence.0);
        }
    }

    fn reject(&mut self, err: &Error, frame: Option<&[u8]>, now_ms: u32) {
        self.stats.record_error(err);
        if self.warn_limit.allow(now_ms) {
            let len = frame.map_or(0, <[u8]>::len);
            let head = frame.map_or_else(String::new, |f| hex(&f[..len.min(WARN_HEAD_LEN)]));
            warn!(
                "frame rejected ({}): {err}, frame_len={len}, head={head} [errors={}]; resyncing",
                err.kind(),
                self.stats.errors()
            );
        }
    }

    /// Read failure on the transport. Partial frames are dropped.
    pub fn transport_error(&mut self, now_ms: u32, err: &io::Error) {
        self.assembler.reset();
        self.count_transport_error(now_ms, "serial read", err);
    }

    /// Write failure while sending a command; the receive side keeps its partial frame.
    pub fn write_error(&mut self, now_ms: u32, err: &dyn fmt::Display) {
        self.count_transport_error(now_ms, "serial write", err);
    }

    fn count_transport_error(&mut self, now_ms: u32, what: &str, err: &dyn fmt::Display) {
        self.stats.transport_errors += 1;
        if self.warn_limit.allow(now_ms) {
            warn!(
                "{what} error: {err:#} [transport_errors={}]",
                self.stats.transport_errors
            );
        }
    }

    pub fn record_command(&mut self) {
        self.stats.commands_sent += 1;
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn snapshot(&self, now_ms: u32) -> StatsSnapshot {
        let tracker = self.presence.state();
        StatsSnapshot {
            uptime_ms: now_ms,
            frames: self.stats,
            person_present: tracker.person_present,
            presence_duration_ms: self.presence.duration_ms(now_ms),
            target_count: tracker.last_target_count,
            stationary_count: tracker.stationary_count,
            settings: self.settings.clone(),
        }
    }

    pub fn log_stats(&self, now_ms: u32) {
        let s = &self.stats;
        info!(
            "stats: frames={} targets={} presence={} zones={} config={} cloud={} opaque={} framing_errs={} integrity_errs={} incomplete={} transport_errs={} bytes={} cmds={}",
            s.total,
            s.targets,
            s.presence,
            s.zones,
            s.config,
            s.point_cloud,
            s.opaque,
            s.framing_errors,
            s.integrity_errors,
            s.incomplete_payloads,
            s.transport_errors,
            s.bytes,
            s.commands_sent,
        );
        if self.presence.person_present() {
            info!(
                "person present for {}",
                format_duration_ms(self.presence.duration_ms(now_ms))
            );
        }
    }
}

fn motion_label(doppler_moving: bool, update: &PresenceUpdate) -> &'static str {
    if doppler_moving {
        "moving"
    } else if update.significant {
        "shifted"
    } else {
        "still"
    }
}

/// Producer side of the bounded command inbox.
#[derive(Clone, Debug)]
pub struct CommandInbox {
    tx: mpsc::Sender<ControlOp>,
}

impl CommandInbox {
    pub fn submit(&self, op: ControlOp) -> Result<(), &'static str> {
        self.tx.try_send(op).map_err(|e| match e {
            TrySendError::Full(_) => "COMMAND_QUEUE_FULL",
            TrySendError::Closed(_) => "LINK_STOPPED",
        })
    }
}

pub fn command_channel(capacity: usize) -> (CommandInbox, mpsc::Receiver<ControlOp>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (CommandInbox { tx }, rx)
}

#[derive(Clone, Copy, Debug)]
pub struct LinkTiming {
    pub follow_up_delay: Duration,
    pub startup_settle: Duration,
    pub startup_step_delay: Duration,
    pub stats_interval: Duration,
    /// Pause after a transport error so a dead port does not spin the loop.
    pub error_backoff: Duration,
}

impl From<&Config> for LinkTiming {
    fn from(cfg: &Config) -> Self {
        Self {
            follow_up_delay: Duration::from_millis(cfg.follow_up_delay_ms),
            startup_settle: Duration::from_millis(cfg.startup_settle_ms),
            startup_step_delay: Duration::from_millis(cfg.startup_step_delay_ms),
            stats_interval: cfg.stats_interval(),
            error_backoff: cfg.read_timeout(),
        }
    }
}

/// Single-consumer loop over one serial transport. Each pass does one
/// bounded read, dispatches at most one queued command and refreshes the
/// shared snapshot.
pub struct RadarLink<P> {
    port: P,
    pipeline: Pipeline,
    inbox: mpsc::Receiver<ControlOp>,
    shared: SharedStats,
    clock: Clock,
    timing: LinkTiming,
    last_stats_ms: u32,
}

impl<P: Read + Write> RadarLink<P> {
    pub fn new(
        port: P,
        pipeline: Pipeline,
        inbox: mpsc::Receiver<ControlOp>,
        shared: SharedStats,
        clock: Clock,
        timing: LinkTiming,
    ) -> Self {
        Self {
            port,
            pipeline,
            inbox,
            shared,
            clock,
            timing,
            last_stats_ms: clock.now_ms(),
        }
    }

    pub fn startup(&mut self) -> Result<()> {
        thread::sleep(self.timing.startup_settle);
        for cmd in STARTUP_SEQUENCE {
            self.send(cmd)?;
            thread::sleep(self.timing.startup_step_delay);
        }
        Ok(())
    }

    pub fn send(&mut self, cmd: Command) -> Result<()> {
        let frame = command_frame(cmd);
        self.port
            .write_all(&frame)
            .with_context(|| format!("write {}", cmd.name()))?;
        self.port.flush().context("flush serial port")?;
        self.pipeline.record_command();
        info!("sent {} (0x{:02x})", cmd.name(), cmd.code());
        debug!("tx {}", hex(&frame));
        Ok(())
    }

    /// Send the command for `op` and, for setters, the read-back that
    /// follows it.
    pub fn execute(&mut self, op: ControlOp) -> Result<()> {
        let plan = match op.plan() {
            Ok(plan) => plan,
            Err(err) => {
                warn!("control {op:?} refused: {err}");
                return Ok(());
            }
        };
        self.send(plan.first)?;
        if let Some(next) = plan.follow_up {
            thread::sleep(self.timing.follow_up_delay);
            self.send(next)?;
        }
        Ok(())
    }

    pub fn poll(&mut self, sink: &mut dyn EventSink) {
        let mut chunk = [0u8; READ_CHUNK];
        let now = self.clock.now_ms();
        match self.port.read(&mut chunk) {
            Ok(0) => {}
            Ok(n) => self.pipeline.ingest(&chunk[..n], now, sink),
            Err(e) if is_idle(&e) => {}
            Err(e) => {
                self.pipeline.transport_error(now, &e);
                thread::sleep(self.timing.error_backoff);
            }
        }

        if let Ok(op) = self.inbox.try_recv() {
            if let Err(e) = self.execute(op) {
                self.pipeline.write_error(self.clock.now_ms(), &e);
            }
        }

        let now = self.clock.now_ms();
        let interval = u32::try_from(self.timing.stats_interval.as_millis()).unwrap_or(u32::MAX);
        if now.wrapping_sub(self.last_stats_ms) >= interval {
            self.last_stats_ms = now;
            self.pipeline.log_stats(now);
        }
        stats::store(&self.shared, self.pipeline.snapshot(now));
    }

    /// Run the startup sequence, then poll until `running` is cleared.
    pub fn run_until(&mut self, running: &AtomicBool, sink: &mut dyn EventSink) -> Result<()> {
        self.startup()?;
        info!("link up");
        while running.load(Ordering::SeqCst) {
            self.poll(sink);
        }
        self.pipeline.log_stats(self.clock.now_ms());
        info!("link stopped");
        Ok(())
    }
}

fn is_idle(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}
