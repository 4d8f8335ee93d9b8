//! tilesync-replay: drive a `ChannelRegistry` from a text script.
//!
//! Replays recorded upstream calls (attach, notify, paint, flush…) and
//! prints every batch a viewer would receive as one JSON line.
//!
//! ```text
//! tilesync-replay [--config registry.json] <script | ->
//! RUST_LOG=tilesync_notify=trace tilesync-replay session.txt
//! ```

mod script;

use log::info;
use serde::Serialize;
use std::collections::HashMap;
use std::io::Read;

use script::{Command, ScriptError};
use tilesync_core::ViewerId;
use tilesync_notify::{ChannelRegistry, CollectingSink, FlushedBatch, RegistryConfig};

/// One printed output line.
#[derive(Serialize)]
struct Delivery<'a> {
    name: &'a str,
    #[serde(flatten)]
    batch: &'a FlushedBatch,
}

struct Replay {
    registry: ChannelRegistry,
    sink: CollectingSink,
    /// Script names → ids, assigned in attach order.
    ids: HashMap<String, ViewerId>,
    names: HashMap<ViewerId, String>,
}

impl Replay {
    fn new(config: RegistryConfig) -> Self {
        Self {
            registry: ChannelRegistry::new(config),
            sink: CollectingSink::new(),
            ids: HashMap::new(),
            names: HashMap::new(),
        }
    }

    /// Id for `name`, allocating the next one on first attach.
    fn assign(&mut self, name: &str) -> ViewerId {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        let id = ViewerId::from_u128(self.ids.len() as u128 + 1);
        self.ids.insert(name.to_string(), id);
        self.names.insert(id, name.to_string());
        id
    }

    fn lookup(&self, name: &str) -> Option<ViewerId> {
        let id = self.ids.get(name).copied();
        if id.is_none() {
            log::warn!("Viewer {name:?} was never attached");
        }
        id
    }

    fn apply(&mut self, command: Command) -> Result<(), serde_json::Error> {
        match command {
            Command::Attach(name) => {
                let id = self.assign(&name);
                self.registry.attach_with_sink(id, Box::new(self.sink.clone()));
            }
            Command::Detach(name) => {
                if let Some(id) = self.lookup(&name) {
                    self.registry.detach(id);
                }
            }
            Command::Notify { viewer, kind, payload } => {
                if let Some(id) = self.lookup(&viewer) {
                    self.registry.notify_one_raw(id, kind, &payload);
                }
            }
            Command::Broadcast { kind, payload } => {
                self.registry.notify_all_raw(kind, &payload);
            }
            Command::Paint { viewer, part, mode, rect } => {
                if let Some(id) = self.lookup(&viewer) {
                    self.registry.record_painted_tile(id, part, mode, rect);
                }
            }
            Command::Invalidate { viewer, part, mode, rect } => {
                if let Some(id) = self.lookup(&viewer) {
                    self.registry.invalidate_tiles(id, rect, part, mode);
                }
            }
            Command::Disable(name) => self.with_channel(&name, |c| c.disable()),
            Command::Enable(name) => self.with_channel(&name, |c| c.enable()),
            Command::Latch(name) => self.with_channel(&name, |c| c.set_latched(true)),
            Command::Unlatch(name) => self.with_channel(&name, |c| c.set_latched(false)),
            Command::Flush => {
                self.registry.flush_all();
                self.print_batches()?;
            }
        }
        Ok(())
    }

    fn with_channel(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut tilesync_notify::NotificationChannel),
    ) {
        let Some(id) = self.lookup(name) else { return };
        match self.registry.channel_mut(id) {
            Some(channel) => f(channel),
            None => log::warn!("Viewer {name:?} is not attached"),
        }
    }

    fn print_batches(&self) -> Result<(), serde_json::Error> {
        for batch in self.sink.take() {
            let name = self.names.get(&batch.viewer).map_or("?", String::as_str);
            println!("{}", serde_json::to_string(&Delivery { name, batch: &batch })?);
        }
        Ok(())
    }
}

fn load_config(path: Option<&str>) -> Result<RegistryConfig, ScriptError> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&text)?)
        }
        None => Ok(RegistryConfig::default()),
    }
}

fn read_script(path: &str) -> Result<String, ScriptError> {
    if path == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        Ok(std::fs::read_to_string(path)?)
    }
}

fn run() -> Result<(), ScriptError> {
    let mut args = std::env::args().skip(1);
    let mut config_path = None;
    let mut script_path = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                config_path = Some(
                    args.next()
                        .ok_or_else(|| ScriptError::Usage("--config needs a path".into()))?,
                );
            }
            _ if script_path.is_none() => script_path = Some(arg),
            _ => return Err(ScriptError::Usage(format!("unexpected argument {arg:?}"))),
        }
    }
    let script_path = script_path.ok_or_else(|| {
        ScriptError::Usage("usage: tilesync-replay [--config PATH] <script | ->".into())
    })?;

    let config = load_config(config_path.as_deref())?;
    let commands = script::parse_script(&read_script(&script_path)?)?;
    info!("Replaying {} commands from {script_path}", commands.len());

    let mut replay = Replay::new(config);
    for (_, command) in commands {
        replay.apply(command)?;
    }
    // Whatever is still pending at the end is delivered like a final idle tick.
    replay.apply(Command::Flush)?;

    let stats = replay.registry.stats();
    info!(
        "Done: {} enqueued, {} coalesced, {} dropped, {} delivered",
        stats.enqueued, stats.coalesced, stats.dropped, stats.flushed
    );
    Ok(())
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        log::error!("{e}");
        eprintln!("tilesync-replay: {e}");
        std::process::exit(1);
    }
}
