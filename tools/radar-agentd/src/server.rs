use anyhow::{Context, Result, bail};
use fs2::FileExt;
use serde_json::json;
use std::fs::OpenOptions;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader as TokioBuf};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::Duration;
use tracing::{debug, info, warn};

use crate::link::CommandInbox;
use crate::model::{ClientRequest, ClientResponse, parse_control};
use crate::paths::Paths;
use crate::stats::{self, SharedStats};
use crate::timefmt::Clock;

const ACCEPT_POLL: Duration = Duration::from_millis(250);

pub struct Server;

/// Everything a connection handler can reach.
#[derive(Clone)]
pub struct DaemonState {
    pub paths: Paths,
    pub port: String,
    pub clock: Clock,
    pub stats: SharedStats,
    pub commands: CommandInbox,
    pub events: broadcast::Sender<String>,
    pub running: Arc<AtomicBool>,
}

impl Server {
    /// Serve the control socket until `running` is cleared.
    pub async fn run(state: DaemonState) -> Result<()> {
        let paths = &state.paths;
        paths.ensure_dirs()?;
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(paths.lock_path())
            .with_context(|| format!("open {}", paths.lock.display()))?;
        lock_file
            .try_lock_exclusive()
            .context("another instance running")?;

        if paths.sock.exists() {
            let _ = std::fs::remove_file(&paths.sock);
        }
        let listener = UnixListener::bind(&paths.sock)
            .with_context(|| format!("bind {}", paths.sock.display()))?;
        info!("control socket at {}", paths.sock.display());

        while state.running.load(Ordering::SeqCst) {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, _) = accepted?;
                    let state_cl = state.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_conn(stream, state_cl).await {
                            debug!("conn error: {e:#}");
                        }
                    });
                }
                _ = tokio::time::sleep(ACCEPT_POLL) => {}
            }
        }

        let _ = std::fs::remove_file(&paths.sock);
        drop(lock_file);
        Ok(())
    }

    pub async fn try_stop(paths: &Paths) -> Result<ClientResponse> {
        if let Ok(resp) = Server::client_send(paths, &ClientRequest::Shutdown).await {
            return Ok(resp);
        }

        if paths.sock.exists() {
            let _ = std::fs::remove_file(&paths.sock);
        }
        // A lock we can take belongs to a dead daemon.
        if let Ok(lock) = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(paths.lock_path())
        {
            if lock.try_lock_exclusive().is_ok() {
                drop(lock);
            }
        }
        Ok(ClientResponse::ok(
            json!({"status": "not running", "cleaned": true}),
        ))
    }

    pub async fn client_send(paths: &Paths, req: &ClientRequest) -> Result<ClientResponse> {
        let mut stream = UnixStream::connect(&paths.sock)
            .await
            .with_context(|| format!("connect {}", paths.sock.display()))?;
        let mut line = serde_json::to_string(req)?;
        line.push('\n');
        stream.write_all(line.as_bytes()).await?;
        let mut reader = TokioBuf::new(stream);
        let mut resp_line = String::new();
        reader.read_line(&mut resp_line).await?;
        let resp: ClientResponse = serde_json::from_str(&resp_line)?;
        Ok(resp)
    }

    /// Stream events until the daemon goes away; `on_line` gets each JSON line.
    pub async fn subscribe(paths: &Paths, mut on_line: impl FnMut(&str)) -> Result<()> {
        let mut stream = UnixStream::connect(&paths.sock)
            .await
            .with_context(|| format!("connect {}", paths.sock.display()))?;
        let mut line = serde_json::to_string(&ClientRequest::Subscribe)?;
        line.push('\n');
        stream.write_all(line.as_bytes()).await?;

        let mut lines = TokioBuf::new(stream).lines();
        let first = lines.next_line().await?.unwrap_or_default();
        let resp: ClientResponse = serde_json::from_str(&first)?;
        if !resp.ok {
            bail!(resp.message.unwrap_or_else(|| "subscribe refused".into()));
        }
        while let Some(l) = lines.next_line().await? {
            on_line(&l);
        }
        Ok(())
    }
}

async fn handle_conn(stream: UnixStream, state: DaemonState) -> Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = TokioBuf::new(read_half);
    let mut buf = String::new();
    reader.read_line(&mut buf).await?;
    let req: ClientRequest = match serde_json::from_str(&buf) {
        Ok(req) => req,
        Err(e) => {
            let line = serde_json::to_string(&ClientResponse::err(format!("bad request: {e}")))?;
            write_half.write_all((line + "\n").as_bytes()).await?;
            return Ok(());
        }
    };

    if req == ClientRequest::Subscribe {
        let mut rx = state.events.subscribe();
        let line = serde_json::to_string(&ClientResponse::ok(json!({"subscribed": true})))?;
        write_half.write_all((line + "\n").as_bytes()).await?;
        loop {
            match rx.recv().await {
                Ok(event) => {
                    write_half.write_all(event.as_bytes()).await?;
                    write_half.write_all(b"\n").await?;
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!("subscriber lagging, {missed} events dropped");
                }
                Err(RecvError::Closed) => return Ok(()),
            }
        }
    }

    let resp = handle_request(req, &state);
    let line = serde_json::to_string(&resp)? + "\n";
    write_half.write_all(line.as_bytes()).await?;
    Ok(())
}

pub fn handle_request(req: ClientRequest, state: &DaemonState) -> ClientResponse {
    match req {
        ClientRequest::Shutdown => {
            info!("shutdown requested");
            state.running.store(false, Ordering::SeqCst);
            std::fs::remove_file(&state.paths.sock).ok();
            ClientResponse::ok(json!({"status": "stopping"}))
        }
        ClientRequest::Status => {
            let ts = state.clock.now();
            let snap = stats::read(&state.stats);
            ClientResponse::ok(json!({
                "ts": ts.iso(),
                "uptime_ms": ts.mono_ms(),
                "pid": std::process::id(),
                "sock": state.paths.sock,
                "port": state.port,
                "person_present": snap.person_present,
                "frames": snap.frames.total,
            }))
        }
        ClientRequest::Stats => ClientResponse::ok(stats::read(&state.stats)),
        ClientRequest::Command { cmd, value } => {
            let op = match parse_control(&cmd, value.as_deref()) {
                Ok(op) => op,
                Err(e) => return ClientResponse::err(format!("{e:#}")),
            };
            match state.commands.submit(op) {
                Ok(()) => {
                    info!("queued {cmd} {}", value.as_deref().unwrap_or(""));
                    ClientResponse::ok(json!({"queued": cmd, "value": value}))
                }
                Err(code) => ClientResponse::err(code),
            }
        }
        ClientRequest::Subscribe => ClientResponse::err("subscribe needs its own connection"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::command_channel;
    use ld6002_protocol::{ControlOp, Sensitivity};
    use tokio::sync::mpsc;

    fn state(dir: &std::path::Path, queue: usize) -> (DaemonState, mpsc::Receiver<ControlOp>) {
        let (commands, rx) = command_channel(queue);
        let (events, _) = broadcast::channel(16);
        let state = DaemonState {
            paths: Paths::for_socket(&dir.join("agentd.sock")),
            port: "/dev/null".into(),
            clock: Clock::new(),
            stats: stats::shared(),
            commands,
            events,
            running: Arc::new(AtomicBool::new(true)),
        };
        (state, rx)
    }

    fn command(cmd: &str, value: Option<&str>) -> ClientRequest {
        ClientRequest::Command {
            cmd: cmd.into(),
            value: value.map(Into::into),
        }
    }

    #[test]
    fn command_requests_reach_the_inbox() {
        let dir = tempfile::tempdir().unwrap();
        let (state, mut rx) = state(dir.path(), 8);
        let resp = handle_request(command("sensitivity", Some("medium")), &state);
        assert!(resp.ok, "{:?}", resp.message);
        assert_eq!(
            rx.try_recv().unwrap(),
            ControlOp::SetSensitivity(Sensitivity::Medium)
        );
    }

    #[test]
    fn full_queue_and_bad_commands_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _rx) = state(dir.path(), 1);
        assert!(handle_request(command("get_zones", None), &state).ok);
        let full = handle_request(command("get_zones", None), &state);
        assert!(!full.ok);
        assert_eq!(full.message.as_deref(), Some("COMMAND_QUEUE_FULL"));

        let bad = handle_request(command("sensitivity", Some("loud")), &state);
        assert!(!bad.ok);
    }

    #[test]
    fn stats_and_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _rx) = state(dir.path(), 8);
        let resp = handle_request(ClientRequest::Stats, &state);
        assert!(resp.ok);
        assert_eq!(resp.payload["frames"]["total"], 0);

        let resp = handle_request(ClientRequest::Shutdown, &state);
        assert!(resp.ok);
        assert!(!state.running.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn socket_round_trip_and_subscription() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _rx) = state(dir.path(), 8);
        let paths = state.paths.clone();
        let events = state.events.clone();
        let server = tokio::spawn(Server::run(state));

        let mut tries = 0;
        while UnixStream::connect(&paths.sock).await.is_err() {
            tries += 1;
            assert!(tries < 100, "server did not come up");
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        let status = Server::client_send(&paths, &ClientRequest::Status)
            .await
            .unwrap();
        assert!(status.ok);
        assert_eq!(status.payload["port"], "/dev/null");

        let mut sub = UnixStream::connect(&paths.sock).await.unwrap();
        sub.write_all(b"{\"type\":\"subscribe\"}\n").await.unwrap();
        let mut lines = TokioBuf::new(sub).lines();
        let ack = lines.next_line().await.unwrap().unwrap();
        assert!(ack.contains("\"subscribed\":true"));
        events.send("{\"type\":\"person_arrived\"}".into()).unwrap();
        assert_eq!(
            lines.next_line().await.unwrap().unwrap(),
            "{\"type\":\"person_arrived\"}"
        );

        let stop = Server::try_stop(&paths).await.unwrap();
        assert!(stop.ok);
        server.await.unwrap().unwrap();
        assert!(!paths.sock.exists());
    }
}
