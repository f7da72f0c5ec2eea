mod config;
mod event;
mod link;
mod model;
mod paths;
mod server;
mod sink;
mod stats;
mod timefmt;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use config::{Config, EventOutput};
use dialoguer::{Select, theme::ColorfulTheme};
use event::hex;
use ld6002_protocol::command_frame;
use link::{LinkTiming, Pipeline, RadarLink, command_channel};
use model::{ClientRequest, ClientResponse, parse_control};
use paths::Paths;
use serialport::{SerialPortInfo, SerialPortType, available_ports};
use server::{DaemonState, Server};
use sink::{BroadcastSink, Fanout, JsonLinesSink};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use timefmt::Clock;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// USB-serial bridges commonly fitted to LD6002 carrier boards (CH340, CP210x).
const PREFERRED_VIDS: [u16; 2] = [0x1A86, 0x10C4];
const EVENT_BACKLOG: usize = 256;

/// radar-agentd – host daemon for the HLK-LD6002 60 GHz presence radar.
#[derive(Parser, Debug)]
#[command(name = "radar-agentd", version)]
struct Cli {
    /// Config file; defaults to configs/radar-agentd.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Open the radar link and serve the control socket (foreground).
    Serve {
        /// Serial device; prompts when neither this nor the config sets one.
        #[arg(long)]
        port: Option<String>,
        #[arg(long)]
        baud: Option<u32>,
        /// Where decoded events are printed.
        #[arg(long, value_enum)]
        events: Option<EventsOpt>,
    },
    /// Decode a captured byte stream ("-" reads stdin) and print events.
    Replay {
        file: PathBuf,
        /// Bytes fed per step, to mimic serial chunking.
        #[arg(long, default_value_t = 64)]
        chunk: usize,
    },
    /// Queue a control command on the running daemon.
    Send { cmd: String, value: Option<String> },
    /// Print the frames a command would put on the wire.
    Encode { cmd: String, value: Option<String> },
    /// Frame counters, tracker state and last known sensor settings.
    Stats,
    /// Query daemon status.
    Status,
    /// Stop the daemon if running.
    Stop,
    /// Stream live events from the running daemon.
    Watch,
    /// List detected serial ports.
    ListPorts,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EventsOpt {
    Stdout,
    None,
}

impl From<EventsOpt> for EventOutput {
    fn from(e: EventsOpt) -> Self {
        match e {
            EventsOpt::Stdout => EventOutput::Stdout,
            EventsOpt::None => EventOutput::None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();
    let cfg = Config::load(cli.config.as_deref())?;
    let paths = Paths::new(&cfg);

    match cli.cmd {
        Cmd::Serve { port, baud, events } => {
            serve(cfg, paths, port, baud, events.map(Into::into)).await?;
        }
        Cmd::Replay { file, chunk } => replay(&file, chunk)?,
        Cmd::Send { cmd, value } => {
            // Reject typos before touching the socket.
            parse_control(&cmd, value.as_deref())?;
            let resp = Server::client_send(&paths, &ClientRequest::Command { cmd, value }).await?;
            print_response(&resp)?;
        }
        Cmd::Encode { cmd, value } => {
            let op = parse_control(&cmd, value.as_deref())?;
            let plan = op.plan().map_err(|e| anyhow::anyhow!("{e}"))?;
            for c in std::iter::once(plan.first).chain(plan.follow_up) {
                println!("{:<26} {}", c.name(), hex(&command_frame(c)));
            }
        }
        Cmd::Stats => {
            let resp = Server::client_send(&paths, &ClientRequest::Stats).await?;
            print_response(&resp)?;
        }
        Cmd::Status => match Server::client_send(&paths, &ClientRequest::Status).await {
            Ok(resp) => print_response(&resp)?,
            Err(e) => eprintln!("status: not running ({e:#})"),
        },
        Cmd::Stop => {
            let resp = Server::try_stop(&paths).await?;
            print_response(&resp)?;
        }
        Cmd::Watch => Server::subscribe(&paths, |line| println!("{line}")).await?,
        Cmd::ListPorts => {
            for p in available_ports()? {
                println!("{}", describe_port(&p));
            }
        }
    }
    Ok(())
}

fn init_tracing() {
    // stdout carries event lines, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn print_response(resp: &ClientResponse) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(resp)?);
    Ok(())
}

async fn serve(
    cfg: Config,
    paths: Paths,
    port: Option<String>,
    baud: Option<u32>,
    events: Option<EventOutput>,
) -> Result<()> {
    let port = match port.or_else(|| cfg.port.clone()) {
        Some(p) => p,
        None => interactive_select_port()?,
    };
    let baud = baud.unwrap_or(cfg.baud);
    let serial = serialport::new(&port, baud)
        .timeout(cfg.read_timeout())
        .open()
        .with_context(|| format!("open {port} at {baud} baud"))?;
    info!("opened {port} at {baud} baud");

    let clock = Clock::new();
    let shared = stats::shared();
    let (commands, inbox) = command_channel(cfg.command_queue);
    let (events_tx, _) = broadcast::channel(EVENT_BACKLOG);
    let running = Arc::new(AtomicBool::new(true));

    let mut sink = Fanout::default().with(BroadcastSink::new(events_tx.clone()));
    if events.unwrap_or(cfg.event_output) == EventOutput::Stdout {
        sink = sink.with(JsonLinesSink::new(std::io::stdout()));
    }

    let mut radar = RadarLink::new(
        serial,
        Pipeline::default(),
        inbox,
        shared.clone(),
        clock,
        LinkTiming::from(&cfg),
    );
    let link_running = running.clone();
    let link_task = tokio::task::spawn_blocking(move || {
        let res = radar.run_until(&link_running, &mut sink);
        link_running.store(false, Ordering::SeqCst);
        res
    });

    let interrupted = running.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted");
            interrupted.store(false, Ordering::SeqCst);
        }
    });

    let state = DaemonState {
        paths,
        port,
        clock,
        stats: shared,
        commands,
        events: events_tx,
        running: running.clone(),
    };
    let served = Server::run(state).await;
    running.store(false, Ordering::SeqCst);
    link_task.await.context("link thread panicked")??;
    served
}

fn replay(file: &Path, chunk: usize) -> Result<()> {
    let mut reader: Box<dyn Read> = if file == Path::new("-") {
        Box::new(std::io::stdin())
    } else {
        Box::new(File::open(file).with_context(|| format!("open {}", file.display()))?)
    };

    let clock = Clock::new();
    let mut pipeline = Pipeline::default();
    let mut sink = JsonLinesSink::new(std::io::stdout().lock());
    let mut buf = vec![0u8; chunk.max(1)];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        pipeline.ingest(&buf[..n], clock.now_ms(), &mut sink);
    }
    let stats = pipeline.stats();
    eprintln!(
        "replayed {} bytes: {} frames, {} rejected",
        stats.bytes,
        stats.total,
        stats.errors()
    );
    eprintln!(
        "{}",
        serde_json::to_string_pretty(&pipeline.snapshot(clock.now_ms()))?
    );
    Ok(())
}

fn describe_port(p: &SerialPortInfo) -> String {
    match &p.port_type {
        SerialPortType::UsbPort(info) => format!(
            "{} (usb vid={:04x} pid={:04x} {})",
            p.port_name,
            info.vid,
            info.pid,
            info.product.as_deref().unwrap_or("")
        ),
        SerialPortType::PciPort => format!("{} (pci)", p.port_name),
        SerialPortType::BluetoothPort => format!("{} (bluetooth)", p.port_name),
        SerialPortType::Unknown => p.port_name.clone(),
    }
}

fn interactive_select_port() -> Result<String> {
    let mut ports = available_ports()?;
    if ports.is_empty() {
        bail!("no serial ports found; connect the radar or pass --port");
    }
    // Known USB bridges first, then other USB ports, then the rest.
    ports.sort_by_key(|p| match &p.port_type {
        SerialPortType::UsbPort(info) if PREFERRED_VIDS.contains(&info.vid) => 0,
        SerialPortType::UsbPort(_) => 1,
        _ => 2,
    });
    let items: Vec<String> = ports.iter().map(describe_port).collect();
    let idx = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select the radar serial port")
        .items(&items)
        .default(0)
        .interact()?;
    Ok(ports[idx].port_name.clone())
}
