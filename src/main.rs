//! TankGuard: host simulator entry point.
//!
//! Runs the control loop against a simulated plant at the configured tick
//! rate.  Requests arrive as one JSON object per line on stdin, replies go
//! to stdout, logs go to stderr.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  SimPlant          LogEventSink   KvConfigStore   SystemClock  │
//! │  (Sensor+Actuator) (EventSink)    (ConfigPort)    (ClockPort)  │
//! │  stdin reader ──▶ COMMAND_CHANNEL    OUTCOME_CHANNEL ──▶ stdout│
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              ControlLoop (pure logic)                  │    │
//! │  │  modes · supervisor · ledger · alerts · safety         │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Environment:
//!
//! - `TANKGUARD_DATA_DIR`: config directory (default `./tankguard-data`)
//! - `RUST_LOG`: log filter (default `info`)
#![deny(unused_must_use)]

use std::io::{BufRead, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use futures_lite::future::block_on;
use log::{debug, info, warn};

use tankguard::adapters::kv_store::{FileStorage, KvConfigStore};
use tankguard::adapters::log_sink::LogEventSink;
use tankguard::adapters::sim::SimPlant;
use tankguard::adapters::time::SystemClock;
use tankguard::app::ports::ClockPort;
use tankguard::app::service::ControlLoop;
use tankguard::config;
use tankguard::rpc::channels::{COMMAND_CHANNEL, Inbound, OUTCOME_CHANNEL, ResponseMsg};
use tankguard::rpc::{dispatch, request};

const DEFAULT_DATA_DIR: &str = "./tankguard-data";

// ── Transport threads ─────────────────────────────────────────

/// Decode stdin lines and hand them to the control loop.
fn spawn_reader() -> std::thread::JoinHandle<()> {
    std::thread::spawn(|| {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    warn!("stdin: read failed: {}", e);
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            let msg = match request::decode(line.as_bytes()) {
                Ok(request::Request::Command(envelope)) => Inbound::Command(envelope),
                Ok(request::Request::Status { id }) => Inbound::Status { id },
                Err(err) => {
                    match request::encode_error(&err) {
                        Ok(data) => block_on(OUTCOME_CHANNEL.send(ResponseMsg { id: err.id, data })),
                        Err(e) => warn!("stdin: error reply encode failed: {}", e),
                    }
                    continue;
                }
            };
            block_on(COMMAND_CHANNEL.send(msg));
        }
        info!("stdin closed, no further requests");
    })
}

/// Print every reply the control loop produces.
fn spawn_writer() -> std::thread::JoinHandle<()> {
    std::thread::spawn(|| {
        let stdout = std::io::stdout();
        loop {
            let msg = block_on(OUTCOME_CHANNEL.receive());
            let mut out = stdout.lock();
            let written = out
                .write_all(&msg.data)
                .and_then(|()| out.write_all(b"\n"))
                .and_then(|()| out.flush());
            if let Err(e) = written {
                warn!("stdout: reply {} lost: {}", msg.id, e);
            }
        }
    })
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("TankGuard v{} (simulated plant)", env!("CARGO_PKG_VERSION"));

    // ── 1. Config (install defaults on first boot) ────────────
    let data_dir =
        std::env::var("TANKGUARD_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string());
    let storage = FileStorage::open(&data_dir)
        .with_context(|| format!("opening data directory {}", data_dir))?;
    let store = KvConfigStore::new(storage);
    let config = config::load_or_install(&store);

    // ── 2. Adapters ───────────────────────────────────────────
    let clock = SystemClock::new();
    let mut plant = SimPlant::default();
    let mut sink = LogEventSink::new();

    // ── 3. Control loop ───────────────────────────────────────
    let mut cl = ControlLoop::new(config);
    cl.start(&mut plant, &mut sink);

    let _reader = spawn_reader();
    let _writer = spawn_writer();

    info!("System ready. Entering control loop.");

    // ── 4. Fixed-tick loop ────────────────────────────────────
    let mut last_ms = clock.now().uptime_ms;
    loop {
        let interval = u64::from(cl.config().control_loop_interval_ms);
        std::thread::sleep(Duration::from_millis(interval));

        let now = clock.now();
        plant.advance(now.uptime_ms.saturating_sub(last_ms));
        last_ms = now.uptime_ms;

        dispatch::drain_inbound(&COMMAND_CHANNEL, &OUTCOME_CHANNEL, &mut cl);
        let report = cl.tick(now, &mut plant, &mut sink);
        dispatch::publish_outcomes(&report, &OUTCOME_CHANNEL);

        // Persistence never runs inside the tick; the dirty flag survives a
        // failed save, so the next pass retries it.
        if let Err(e) = cl.persist_if_dirty(&store) {
            debug!("Config save deferred to next tick: {}", e);
        }
    }
}
