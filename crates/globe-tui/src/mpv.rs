/// mpv as the audio backend.
///
/// ```text
///   MpvAudio (AudioBackend, sync)  ── AudioCommand ──▶  driver task
///                                                         │
///                                   MpvDriver::spawn_and_connect()
///                                                         ├── writer_task ← MpvRequest → socket
///                                                         └── reader_task → responses / events
/// ```
///
/// The driver tags mpv's `core-idle` and `end-file` notifications with the
/// attempt that is currently attached and reports them as [`StreamEvent`]s.
/// Nothing is reported for an attempt until mpv announces `start-file` for
/// the playlist entry its `loadfile` created, so notifications still queued
/// from the previous stream never reach the new attempt.
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};

use globe_core::playback::{AttemptId, AudioBackend, StreamEvent};

#[cfg(unix)]
use tokio::net::UnixStream;

#[cfg(windows)]
use tokio::net::windows::named_pipe::ClientOptions;

static NEXT_REQ_ID: AtomicU64 = AtomicU64::new(1);

pub const OBS_CORE_IDLE: u64 = 1;

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<anyhow::Result<Value>>>>>;

struct PendingRequest {
    req_id: u64,
    payload: String,
    reply: oneshot::Sender<anyhow::Result<Value>>,
}

/// Unsolicited mpv event or property change.
#[derive(Debug, Clone)]
pub struct MpvEvent {
    pub raw: Value,
}

impl MpvEvent {
    pub fn as_property_change(&self) -> Option<(u64, &Value)> {
        if self.raw.get("event")?.as_str()? == "property-change" {
            let id = self.raw.get("id")?.as_u64()?;
            let data = self.raw.get("data").unwrap_or(&Value::Null);
            Some((id, data))
        } else {
            None
        }
    }

    pub fn event_name(&self) -> Option<&str> {
        self.raw.get("event")?.as_str()
    }

    pub fn playlist_entry_id(&self) -> Option<u64> {
        self.raw.get("playlist_entry_id")?.as_u64()
    }

    /// `Some(message)` when this is an `end-file` caused by a load error.
    pub fn end_file_error(&self) -> Option<String> {
        if self.event_name()? != "end-file" || self.raw.get("reason")?.as_str()? != "error" {
            return None;
        }
        Some(
            self.raw
                .get("file_error")
                .and_then(Value::as_str)
                .unwrap_or("playback error")
                .to_string(),
        )
    }
}

/// Cloneable handle to the writer task.
#[derive(Clone)]
pub struct MpvHandle {
    tx: mpsc::Sender<PendingRequest>,
}

impl MpvHandle {
    pub async fn send(&self, command: Value) -> anyhow::Result<Value> {
        let req_id = NEXT_REQ_ID.fetch_add(1, Ordering::Relaxed);
        let msg = json!({ "command": command, "request_id": req_id });
        let mut raw = serde_json::to_string(&msg)?;
        raw.push('\n');

        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(PendingRequest {
                req_id,
                payload: raw,
                reply: reply_tx,
            })
            .await
            .map_err(|_| anyhow::anyhow!("mpv writer task gone"))?;

        tokio::time::timeout(tokio::time::Duration::from_secs(5), reply_rx)
            .await
            .map_err(|_| anyhow::anyhow!("mpv IPC timeout for req={}", req_id))?
            .map_err(|_| anyhow::anyhow!("mpv reply channel dropped req={}", req_id))?
    }

    /// Returns the playlist entry id mpv assigned, when it reports one.
    pub async fn load_stream(&self, url: &str, volume: u8) -> anyhow::Result<Option<u64>> {
        debug!("mpv: loadfile {}", url);
        let reply = self.send(json!(["loadfile", url])).await?;
        let entry = reply
            .get("data")
            .and_then(|d| d.get("playlist_entry_id"))
            .and_then(Value::as_u64);
        self.set_volume(volume).await?;
        self.set_pause(false).await?;
        Ok(entry)
    }

    pub async fn stop(&self) -> anyhow::Result<()> {
        self.send(json!(["stop"])).await?;
        Ok(())
    }

    pub async fn set_volume(&self, volume: u8) -> anyhow::Result<()> {
        self.send(json!(["set_property", "volume", volume.min(100)]))
            .await?;
        Ok(())
    }

    pub async fn set_pause(&self, paused: bool) -> anyhow::Result<()> {
        self.send(json!(["set_property", "pause", paused])).await?;
        Ok(())
    }

    pub async fn observe_core_idle(&self) {
        if let Err(e) = self
            .send(json!(["observe_property", OBS_CORE_IDLE, "core-idle"]))
            .await
        {
            warn!("mpv: observe_property core-idle failed: {}", e);
        }
    }
}

/// Owns the mpv child process.
pub struct MpvDriver {
    socket_name: String,
    process: Option<tokio::process::Child>,
    volume: u8,
}

impl MpvDriver {
    pub fn new(volume: u8) -> Self {
        Self {
            socket_name: globe_proto::platform::mpv_socket_name(),
            process: None,
            volume,
        }
    }

    pub fn process_alive(&mut self) -> bool {
        match self.process.as_mut().map(|child| child.try_wait()) {
            Some(Ok(None)) => true,
            Some(Ok(Some(status))) => {
                warn!("mpv process exited: {}", status);
                false
            }
            Some(Err(e)) => {
                warn!("mpv process_alive check failed: {}", e);
                false
            }
            None => false,
        }
    }

    pub async fn kill(&mut self) {
        if let Some(mut p) = self.process.take() {
            let _ = p.kill().await;
        }
    }

    fn spawn_process(&mut self) -> anyhow::Result<()> {
        let mpv_binary = globe_proto::platform::find_mpv_binary()
            .ok_or_else(|| anyhow::anyhow!("mpv binary not found"))?;

        let stderr_path = globe_proto::platform::data_dir().join("mpv-stderr.log");
        let stderr_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&stderr_path)?;

        let child = tokio::process::Command::new(&mpv_binary)
            .arg("--no-video")
            .arg("--idle=yes")
            .arg(globe_proto::platform::mpv_socket_arg())
            .arg("--quiet")
            .arg(format!("--volume={}", self.volume.min(100)))
            .stdout(std::process::Stdio::null())
            .stderr(stderr_file)
            .kill_on_drop(true)
            .spawn()?;
        info!("mpv: spawned pid {:?}, stderr to {:?}", child.id(), stderr_path);
        self.process = Some(child);
        Ok(())
    }

    #[cfg(unix)]
    pub async fn spawn_and_connect(
        &mut self,
        event_tx: mpsc::Sender<MpvEvent>,
    ) -> anyhow::Result<MpvHandle> {
        self.kill().await;
        let socket_path = std::path::PathBuf::from(&self.socket_name);
        let _ = tokio::fs::remove_file(&socket_path).await;
        self.spawn_process()?;

        for _ in 0..50 {
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            if socket_path.exists() {
                break;
            }
        }
        if !socket_path.exists() {
            anyhow::bail!("mpv IPC socket did not appear");
        }
        tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

        let stream = UnixStream::connect(&socket_path).await?;
        info!("mpv: connected to IPC socket");
        let (read_half, write_half) = stream.into_split();
        Ok(start_io_tasks(BufReader::new(read_half), write_half, event_tx))
    }

    #[cfg(windows)]
    pub async fn spawn_and_connect(
        &mut self,
        event_tx: mpsc::Sender<MpvEvent>,
    ) -> anyhow::Result<MpvHandle> {
        self.kill().await;
        self.spawn_process()?;

        let pipe_path = format!(r"\\.\pipe\{}", self.socket_name);
        for _ in 0..50 {
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            if let Ok(client) = ClientOptions::new().open(&pipe_path) {
                info!("mpv: connected to named pipe");
                let (read_half, write_half) = tokio::io::split(client);
                return Ok(start_io_tasks(BufReader::new(read_half), write_half, event_tx));
            }
        }
        anyhow::bail!("mpv named pipe did not appear")
    }
}

fn start_io_tasks<R, W>(
    reader: BufReader<R>,
    writer: W,
    event_tx: mpsc::Sender<MpvEvent>,
) -> MpvHandle
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
    W: tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
    let (cmd_tx, cmd_rx) = mpsc::channel::<PendingRequest>(64);
    tokio::spawn(writer_task(writer, cmd_rx, pending.clone()));
    tokio::spawn(reader_task(reader, pending, event_tx));
    MpvHandle { tx: cmd_tx }
}

async fn fail_all(pending: &PendingMap, reason: &str) {
    let mut map = pending.lock().await;
    for (_, tx) in map.drain() {
        let _ = tx.send(Err(anyhow::anyhow!("{}", reason)));
    }
}

async fn reader_task<R>(mut reader: BufReader<R>, pending: PendingMap, event_tx: mpsc::Sender<MpvEvent>)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("mpv reader: connection closed");
                fail_all(&pending, "mpv IPC connection closed").await;
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let val: Value = match serde_json::from_str(trimmed) {
                    Ok(v) => v,
                    Err(e) => {
                        debug!("mpv reader: invalid json '{}': {}", trimmed, e);
                        continue;
                    }
                };

                if let Some(req_id) = val.get("request_id").and_then(Value::as_u64) {
                    let mut map = pending.lock().await;
                    if let Some(tx) = map.remove(&req_id) {
                        let result = if val["error"].as_str() == Some("success") {
                            Ok(val)
                        } else {
                            let err = val["error"].as_str().unwrap_or("unknown error").to_string();
                            Err(anyhow::anyhow!("mpv error: {}", err))
                        };
                        let _ = tx.send(result);
                    }
                } else {
                    debug!("mpv reader: event {}", trimmed);
                    if event_tx.send(MpvEvent { raw: val }).await.is_err() {
                        break;
                    }
                }
            }
            Err(e) => {
                warn!("mpv reader: read error: {}", e);
                fail_all(&pending, "mpv IPC read error").await;
                break;
            }
        }
    }
}

async fn writer_task<W>(mut writer: W, mut rx: mpsc::Receiver<PendingRequest>, pending: PendingMap)
where
    W: tokio::io::AsyncWrite + Unpin,
{
    while let Some(req) = rx.recv().await {
        // register before writing so the reader can match the reply
        pending.lock().await.insert(req.req_id, req.reply);
        if let Err(e) = writer.write_all(req.payload.as_bytes()).await {
            warn!("mpv writer: write error: {}", e);
            if let Some(tx) = pending.lock().await.remove(&req.req_id) {
                let _ = tx.send(Err(anyhow::anyhow!("mpv write error: {}", e)));
            }
            break;
        }
    }
    debug!("mpv writer: task exiting");
}

// ── AudioBackend ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum AudioCommand {
    Attach { url: String, attempt: AttemptId },
    Detach,
    Pause,
    Resume,
    Volume(u8),
}

/// Sync front of the driver task.  Commands are queued; outcomes come back
/// as [`StreamEvent`]s on the sink passed to [`spawn`].
pub struct MpvAudio {
    tx: mpsc::UnboundedSender<AudioCommand>,
}

impl MpvAudio {
    fn send(&self, command: AudioCommand) {
        if self.tx.send(command).is_err() {
            warn!("mpv driver gone, dropping audio command");
        }
    }
}

impl AudioBackend for MpvAudio {
    fn detach(&mut self) {
        self.send(AudioCommand::Detach);
    }

    fn attach(&mut self, url: &str, attempt: AttemptId) {
        self.send(AudioCommand::Attach {
            url: url.to_string(),
            attempt,
        });
    }

    fn pause(&mut self) {
        self.send(AudioCommand::Pause);
    }

    fn resume(&mut self) {
        self.send(AudioCommand::Resume);
    }

    fn set_volume(&mut self, volume: u8) {
        self.send(AudioCommand::Volume(volume));
    }
}

/// Starts the driver task.  mpv itself is spawned on the first attach.
pub fn spawn(volume: u8, sink: mpsc::Sender<StreamEvent>) -> MpvAudio {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(run_driver(MpvDriver::new(volume), rx, sink));
    MpvAudio { tx }
}

/// Attempt bookkeeping kept apart from the IO so it can be tested.
#[derive(Debug, Default)]
struct AttemptTracker {
    current: Option<AttemptId>,
    /// Playlist entry of the attached load, from the `loadfile` reply or the
    /// first `start-file` seen after attaching.
    entry: Option<u64>,
    /// `start-file` for `entry` has been seen.
    loaded: bool,
    started: bool,
}

impl AttemptTracker {
    fn attach(&mut self, attempt: AttemptId) {
        self.current = Some(attempt);
        self.entry = None;
        self.loaded = false;
        self.started = false;
    }

    fn detach(&mut self) {
        self.current = None;
        self.entry = None;
        self.loaded = false;
        self.started = false;
    }

    /// Records the entry id from the `loadfile` reply.  A `start-file` that
    /// was taken for a different entry no longer counts.
    fn bind_entry(&mut self, entry: u64) {
        if self.current.is_none() {
            return;
        }
        if self.entry.is_some_and(|e| e != entry) {
            self.loaded = false;
            self.started = false;
        }
        self.entry = Some(entry);
    }

    fn owns(&self, event: &MpvEvent) -> bool {
        match (self.entry, event.playlist_entry_id()) {
            (Some(expected), Some(id)) => expected == id,
            _ => true,
        }
    }

    /// Maps an mpv event to a stream event for the attached attempt.
    fn on_event(&mut self, event: &MpvEvent) -> Option<StreamEvent> {
        let attempt = self.current?;
        if event.event_name() == Some("start-file") {
            if self.owns(event) && !self.loaded {
                self.loaded = true;
                self.entry = self.entry.or(event.playlist_entry_id());
            }
            return None;
        }
        if !self.loaded {
            return None;
        }
        if let Some((OBS_CORE_IDLE, data)) = event.as_property_change() {
            if data.as_bool() == Some(false) && !self.started {
                self.started = true;
                return Some(StreamEvent::Started(attempt));
            }
            return None;
        }
        if !self.owns(event) {
            return None;
        }
        let reason = event.end_file_error()?;
        self.detach();
        Some(StreamEvent::Failed(attempt, reason))
    }

    /// The mpv connection dropped under the attempt.
    fn on_disconnect(&mut self) -> Option<StreamEvent> {
        let attempt = self.current?;
        self.detach();
        Some(StreamEvent::Failed(attempt, "mpv exited".to_string()))
    }
}

async fn recv_event(rx: &mut Option<mpsc::Receiver<MpvEvent>>) -> Option<MpvEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn run_driver(
    mut driver: MpvDriver,
    mut commands: mpsc::UnboundedReceiver<AudioCommand>,
    sink: mpsc::Sender<StreamEvent>,
) {
    let mut handle: Option<MpvHandle> = None;
    let mut events: Option<mpsc::Receiver<MpvEvent>> = None;
    let mut tracker = AttemptTracker::default();

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { break };
                match command {
                    AudioCommand::Attach { url, attempt } => {
                        tracker.attach(attempt);
                        if handle.is_none() || !driver.process_alive() {
                            let (event_tx, event_rx) = mpsc::channel(256);
                            match driver.spawn_and_connect(event_tx).await {
                                Ok(h) => {
                                    h.observe_core_idle().await;
                                    handle = Some(h);
                                    events = Some(event_rx);
                                }
                                Err(e) => {
                                    warn!("mpv unavailable: {}", e);
                                    tracker.detach();
                                    let _ = sink.send(StreamEvent::Failed(attempt, e.to_string())).await;
                                    continue;
                                }
                            }
                        }
                        if let Some(h) = &handle {
                            match h.load_stream(&url, driver.volume).await {
                                Ok(Some(entry)) => tracker.bind_entry(entry),
                                Ok(None) => {}
                                Err(e) => {
                                    warn!("mpv: load of {} failed: {}", url, e);
                                    tracker.detach();
                                    let _ = sink.send(StreamEvent::Failed(attempt, e.to_string())).await;
                                }
                            }
                        }
                    }
                    AudioCommand::Detach => {
                        tracker.detach();
                        if let Some(h) = &handle {
                            if let Err(e) = h.stop().await {
                                debug!("mpv: stop failed: {}", e);
                            }
                        }
                    }
                    AudioCommand::Pause | AudioCommand::Resume => {
                        let paused = command == AudioCommand::Pause;
                        if let Some(h) = &handle {
                            if let Err(e) = h.set_pause(paused).await {
                                warn!("mpv: set pause={} failed: {}", paused, e);
                            }
                        }
                    }
                    AudioCommand::Volume(volume) => {
                        driver.volume = volume;
                        if let Some(h) = &handle {
                            if let Err(e) = h.set_volume(volume).await {
                                warn!("mpv: set volume failed: {}", e);
                            }
                        }
                    }
                }
            }
            event = recv_event(&mut events) => {
                let stream_event = match event {
                    Some(event) => tracker.on_event(&event),
                    None => {
                        warn!("mpv: event stream closed");
                        handle = None;
                        events = None;
                        tracker.on_disconnect()
                    }
                };
                if let Some(stream_event) = stream_event {
                    debug!("mpv: {:?}", stream_event);
                    if sink.send(stream_event).await.is_err() {
                        break;
                    }
                }
            }
        }
    }
    driver.kill().await;
    debug!("mpv driver exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(raw: Value) -> MpvEvent {
        MpvEvent { raw }
    }

    fn idle(value: bool) -> MpvEvent {
        event(json!({"event": "property-change", "id": OBS_CORE_IDLE, "name": "core-idle", "data": value}))
    }

    fn start_file(entry: u64) -> MpvEvent {
        event(json!({"event": "start-file", "playlist_entry_id": entry}))
    }

    fn end_file_error(entry: u64, message: &str) -> MpvEvent {
        event(json!({
            "event": "end-file",
            "reason": "error",
            "playlist_entry_id": entry,
            "file_error": message
        }))
    }

    #[test]
    fn test_first_unidle_reports_started_once() {
        let mut tracker = AttemptTracker::default();
        tracker.attach(AttemptId(3));
        assert_eq!(tracker.on_event(&start_file(1)), None);
        assert_eq!(tracker.on_event(&idle(true)), None);
        assert_eq!(tracker.on_event(&idle(false)), Some(StreamEvent::Started(AttemptId(3))));
        assert_eq!(tracker.on_event(&idle(false)), None);
    }

    #[test]
    fn test_end_file_error_reports_failed() {
        let mut tracker = AttemptTracker::default();
        tracker.attach(AttemptId(4));
        tracker.on_event(&start_file(2));
        let stop = event(json!({"event": "end-file", "reason": "stop"}));
        assert_eq!(tracker.on_event(&stop), None);
        let err = event(json!({"event": "end-file", "reason": "error", "file_error": "loading failed"}));
        assert_eq!(
            tracker.on_event(&err),
            Some(StreamEvent::Failed(AttemptId(4), "loading failed".into()))
        );
        assert_eq!(tracker.on_event(&idle(false)), None);
    }

    #[test]
    fn test_events_without_attempt_are_ignored() {
        let mut tracker = AttemptTracker::default();
        assert_eq!(tracker.on_event(&idle(false)), None);
        assert_eq!(tracker.on_disconnect(), None);
        tracker.attach(AttemptId(1));
        tracker.detach();
        assert_eq!(tracker.on_event(&idle(false)), None);
    }

    #[test]
    fn test_previous_stream_events_do_not_reach_new_attempt() {
        let mut tracker = AttemptTracker::default();
        tracker.attach(AttemptId(1));
        tracker.bind_entry(5);
        tracker.detach();
        tracker.attach(AttemptId(2));
        tracker.bind_entry(6);

        // still queued from entry 5
        assert_eq!(tracker.on_event(&idle(false)), None);
        assert_eq!(tracker.on_event(&end_file_error(5, "A failed")), None);
        assert_eq!(tracker.on_event(&start_file(5)), None);
        assert_eq!(tracker.on_event(&idle(false)), None);

        assert_eq!(tracker.on_event(&start_file(6)), None);
        assert_eq!(tracker.on_event(&idle(false)), Some(StreamEvent::Started(AttemptId(2))));
    }

    #[test]
    fn test_stale_failure_ignored_after_new_start() {
        let mut tracker = AttemptTracker::default();
        tracker.attach(AttemptId(3));
        tracker.bind_entry(8);
        tracker.on_event(&start_file(8));
        assert_eq!(tracker.on_event(&end_file_error(7, "A failed")), None);
        assert_eq!(
            tracker.on_event(&end_file_error(8, "B failed")),
            Some(StreamEvent::Failed(AttemptId(3), "B failed".into()))
        );
    }

    #[test]
    fn test_start_file_before_reply_is_rebound() {
        let mut tracker = AttemptTracker::default();
        tracker.attach(AttemptId(4));
        // an older entry's start-file arrives before the loadfile reply
        tracker.on_event(&start_file(10));
        tracker.bind_entry(11);
        assert_eq!(tracker.on_event(&idle(false)), None);
        tracker.on_event(&start_file(11));
        assert_eq!(tracker.on_event(&idle(false)), Some(StreamEvent::Started(AttemptId(4))));
    }

    #[test]
    fn test_disconnect_fails_attached_attempt() {
        let mut tracker = AttemptTracker::default();
        tracker.attach(AttemptId(9));
        assert!(matches!(
            tracker.on_disconnect(),
            Some(StreamEvent::Failed(AttemptId(9), _))
        ));
    }

    #[tokio::test]
    async fn test_audio_commands_are_queued() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut audio = MpvAudio { tx };
        audio.attach("http://a", AttemptId(1));
        audio.set_volume(30);
        audio.detach();
        assert_eq!(
            rx.recv().await,
            Some(AudioCommand::Attach {
                url: "http://a".into(),
                attempt: AttemptId(1)
            })
        );
        assert_eq!(rx.recv().await, Some(AudioCommand::Volume(30)));
        assert_eq!(rx.recv().await, Some(AudioCommand::Detach));
    }
}
