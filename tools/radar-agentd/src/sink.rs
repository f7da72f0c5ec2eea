use std::io::Write;
use tokio::sync::broadcast;
use tracing::warn;

use crate::event::RadarEvent;

/// Receives every decoded and derived event from the processing loop.
pub trait EventSink {
    fn publish(&mut self, event: &RadarEvent);
}

impl EventSink for Vec<RadarEvent> {
    fn publish(&mut self, event: &RadarEvent) {
        self.push(event.clone());
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn publish(&mut self, event: &RadarEvent) {
        (**self).publish(event);
    }
}

/// One JSON object per line.
pub struct JsonLinesSink<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> EventSink for JsonLinesSink<W> {
    fn publish(&mut self, event: &RadarEvent) {
        let res = serde_json::to_writer(&mut self.out, event)
            .map_err(std::io::Error::from)
            .and_then(|_| self.out.write_all(b"\n"))
            .and_then(|_| self.out.flush());
        if let Err(e) = res {
            warn!("{} event output failed: {e}", event.kind());
        }
    }
}

/// Serialized events for control-socket subscribers. Lagging or absent
/// receivers never hold up the loop.
#[derive(Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<String>,
}

impl BroadcastSink {
    pub fn new(tx: broadcast::Sender<String>) -> Self {
        Self { tx }
    }
}

impl EventSink for BroadcastSink {
    fn publish(&mut self, event: &RadarEvent) {
        if self.tx.receiver_count() == 0 {
            return;
        }
        match serde_json::to_string(event) {
            Ok(line) => {
                let _ = self.tx.send(line);
            }
            Err(e) => warn!("event encode failed: {e}"),
        }
    }
}

#[derive(Default)]
pub struct Fanout {
    sinks: Vec<Box<dyn EventSink + Send>>,
}

impl Fanout {
    pub fn with(mut self, sink: impl EventSink + Send + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl EventSink for Fanout {
    fn publish(&mut self, event: &RadarEvent) {
        for sink in &mut self.sinks {
            sink.publish(event);
        }
    }
}
