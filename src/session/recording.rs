use super::*;
use std::time::{SystemTime, UNIX_EPOCH};

/// Session recording granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub enum SessionRecordLevel {
    /// Disable recording.
    Off,
    /// Record key events only; filters, payloads and replies are dropped.
    KeyEventsOnly,
    /// Record everything needed for offline replay.
    #[default]
    Full,
}

/// A single recorded session event.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SessionRecordEntry {
    pub ts_ms: u128,
    pub event: SessionEvent,
}

/// Supported recorded event types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionEvent {
    ConnectionEstablished {
        device_addr: String,
        capabilities: Vec<String>,
    },
    ConnectionClosed {
        device_addr: String,
    },
    GetConfig {
        source: Datastore,
        #[serde(default)]
        filter: Option<String>,
        success: bool,
        #[serde(default)]
        content: Option<String>,
        #[serde(default)]
        error: Option<String>,
    },
    EditConfig {
        target: Datastore,
        #[serde(default)]
        config: Option<String>,
        success: bool,
        #[serde(default)]
        error: Option<String>,
    },
    Commit {
        success: bool,
        #[serde(default)]
        error: Option<String>,
    },
}

impl SessionEvent {
    fn kind(&self) -> &'static str {
        match self {
            SessionEvent::ConnectionEstablished { .. } => "connection_established",
            SessionEvent::ConnectionClosed { .. } => "connection_closed",
            SessionEvent::GetConfig { .. } => "get_config",
            SessionEvent::EditConfig { .. } => "edit_config",
            SessionEvent::Commit { .. } => "commit",
        }
    }

    /// Strips filters, payloads and replies.
    fn without_payloads(self) -> Self {
        match self {
            SessionEvent::GetConfig {
                source,
                success,
                error,
                ..
            } => SessionEvent::GetConfig {
                source,
                filter: None,
                success,
                content: None,
                error,
            },
            SessionEvent::EditConfig {
                target,
                success,
                error,
                ..
            } => SessionEvent::EditConfig {
                target,
                config: None,
                success,
                error,
            },
            other => other,
        }
    }
}

/// In-memory session recorder. Clones share the same entries.
#[derive(Debug, Clone)]
pub struct SessionRecorder {
    level: SessionRecordLevel,
    entries: Arc<Mutex<Vec<SessionRecordEntry>>>,
}

fn lock_error(e: impl std::fmt::Display) -> NetconfError {
    NetconfError::InternalServerError(format!("record lock error: {e}"))
}

impl SessionRecorder {
    /// Create a recorder with the given level.
    pub fn new(level: SessionRecordLevel) -> Self {
        Self {
            level,
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Current recording level.
    pub fn level(&self) -> SessionRecordLevel {
        self.level
    }

    /// Record an event, trimmed according to the recording level.
    pub fn record_event(&self, event: SessionEvent) -> Result<(), NetconfError> {
        let event = match self.level {
            SessionRecordLevel::Off => return Ok(()),
            SessionRecordLevel::KeyEventsOnly => event.without_payloads(),
            SessionRecordLevel::Full => event,
        };
        let mut guard = self.entries.lock().map_err(lock_error)?;
        guard.push(SessionRecordEntry {
            ts_ms: now_ms(),
            event,
        });
        Ok(())
    }

    /// Snapshot all records.
    pub fn entries(&self) -> Result<Vec<SessionRecordEntry>, NetconfError> {
        let guard = self.entries.lock().map_err(lock_error)?;
        Ok(guard.clone())
    }

    /// Clears all recorded events.
    pub fn clear(&self) -> Result<(), NetconfError> {
        let mut guard = self.entries.lock().map_err(lock_error)?;
        guard.clear();
        Ok(())
    }

    /// Export records as JSONL.
    pub fn to_jsonl(&self) -> Result<String, NetconfError> {
        let entries = self.entries()?;
        let mut lines = Vec::with_capacity(entries.len());
        for entry in entries {
            let line = serde_json::to_string(&entry).map_err(|e| {
                NetconfError::InternalServerError(format!("record encode error: {e}"))
            })?;
            lines.push(line);
        }
        Ok(lines.join("\n"))
    }

    /// Restore recorder from JSONL lines.
    pub fn from_jsonl(jsonl: &str) -> Result<Self, NetconfError> {
        let recorder = Self::new(SessionRecordLevel::Full);
        let parsed = parse_jsonl(jsonl)?;
        let mut guard = recorder.entries.lock().map_err(lock_error)?;
        *guard = parsed;
        drop(guard);
        Ok(recorder)
    }
}

impl Default for SessionRecorder {
    fn default() -> Self {
        Self::new(SessionRecordLevel::Full)
    }
}

fn parse_jsonl(jsonl: &str) -> Result<Vec<SessionRecordEntry>, NetconfError> {
    let mut parsed = Vec::new();
    for line in jsonl.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let entry: SessionRecordEntry = serde_json::from_str(line)
            .map_err(|e| NetconfError::InternalServerError(format!("record decode error: {e}")))?;
        parsed.push(entry);
    }
    Ok(parsed)
}

fn error_text<T>(result: &Result<T, NetconfError>) -> Option<String> {
    result.as_ref().err().map(|e| e.to_string())
}

/// Wraps another connector and records every session it opens.
pub struct RecordingConnector {
    inner: Arc<dyn Connector>,
    recorder: SessionRecorder,
}

impl RecordingConnector {
    pub fn new(inner: Arc<dyn Connector>, recorder: SessionRecorder) -> Self {
        Self { inner, recorder }
    }

    pub fn recorder(&self) -> &SessionRecorder {
        &self.recorder
    }
}

#[async_trait]
impl Connector for RecordingConnector {
    async fn connect(&self, params: &ConnectionParams) -> Result<Box<dyn Transport>, NetconfError> {
        let inner = self.inner.connect(params).await?;
        let device_addr = params.device_addr();
        let _ = self.recorder.record_event(SessionEvent::ConnectionEstablished {
            device_addr: device_addr.clone(),
            capabilities: inner.capabilities().to_vec(),
        });
        Ok(Box::new(RecordingTransport {
            inner,
            recorder: self.recorder.clone(),
            device_addr,
        }))
    }
}

struct RecordingTransport {
    inner: Box<dyn Transport>,
    recorder: SessionRecorder,
    device_addr: String,
}

#[async_trait]
impl Transport for RecordingTransport {
    fn capabilities(&self) -> &[String] {
        self.inner.capabilities()
    }

    async fn get_config(
        &mut self,
        source: Datastore,
        filter: &str,
    ) -> Result<String, NetconfError> {
        let result = self.inner.get_config(source, filter).await;
        let _ = self.recorder.record_event(SessionEvent::GetConfig {
            source,
            filter: Some(filter.to_string()),
            success: result.is_ok(),
            content: result.as_ref().ok().cloned(),
            error: error_text(&result),
        });
        result
    }

    async fn edit_config(&mut self, target: Datastore, config: &str) -> Result<(), NetconfError> {
        let result = self.inner.edit_config(target, config).await;
        let _ = self.recorder.record_event(SessionEvent::EditConfig {
            target,
            config: Some(config.to_string()),
            success: result.is_ok(),
            error: error_text(&result),
        });
        result
    }

    async fn commit(&mut self) -> Result<(), NetconfError> {
        let result = self.inner.commit().await;
        let _ = self.recorder.record_event(SessionEvent::Commit {
            success: result.is_ok(),
            error: error_text(&result),
        });
        result
    }

    async fn close(&mut self) -> Result<(), NetconfError> {
        let result = self.inner.close().await;
        let _ = self.recorder.record_event(SessionEvent::ConnectionClosed {
            device_addr: self.device_addr.clone(),
        });
        result
    }
}

#[derive(Debug)]
struct ReplayState {
    entries: Vec<SessionRecordEntry>,
    cursor: usize,
}

impl ReplayState {
    /// Consumes the next event, which must be of kind `expected`.
    fn next(&mut self, expected: &str) -> Result<SessionEvent, NetconfError> {
        let Some(entry) = self.entries.get(self.cursor) else {
            return Err(NetconfError::ReplayMismatch(format!(
                "recording exhausted, expected {expected}"
            )));
        };
        if entry.event.kind() != expected {
            return Err(NetconfError::ReplayMismatch(format!(
                "expected {expected} at event {}, recording has {}",
                self.cursor,
                entry.event.kind()
            )));
        }
        self.cursor += 1;
        Ok(entry.event.clone())
    }
}

fn replayed_error(error: Option<String>) -> NetconfError {
    NetconfError::Protocol(error.unwrap_or_else(|| "recorded failure".to_string()))
}

/// Serves sessions from a recording instead of a device.
///
/// Every request must match the next recorded event in order; anything else
/// fails with [`NetconfError::ReplayMismatch`]. Clones share one cursor.
#[derive(Debug, Clone)]
pub struct ReplayConnector {
    state: Arc<Mutex<ReplayState>>,
}

impl ReplayConnector {
    pub fn from_recorder(recorder: &SessionRecorder) -> Result<Self, NetconfError> {
        Ok(Self::from_entries(recorder.entries()?))
    }

    pub fn from_jsonl(jsonl: &str) -> Result<Self, NetconfError> {
        Ok(Self::from_entries(parse_jsonl(jsonl)?))
    }

    fn from_entries(entries: Vec<SessionRecordEntry>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ReplayState { entries, cursor: 0 })),
        }
    }

    /// True once every recorded event has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.state
            .lock()
            .map(|state| state.cursor >= state.entries.len())
            .unwrap_or(false)
    }

    fn next(&self, expected: &str) -> Result<SessionEvent, NetconfError> {
        let mut state = self.state.lock().map_err(lock_error)?;
        state.next(expected)
    }
}

#[async_trait]
impl Connector for ReplayConnector {
    async fn connect(&self, params: &ConnectionParams) -> Result<Box<dyn Transport>, NetconfError> {
        let SessionEvent::ConnectionEstablished {
            device_addr,
            capabilities,
        } = self.next("connection_established")?
        else {
            return Err(NetconfError::ReplayMismatch(
                "expected connection_established".to_string(),
            ));
        };
        if device_addr != params.device_addr() {
            debug!(
                "replaying session recorded for {} as {}",
                device_addr,
                params.device_addr()
            );
        }
        Ok(Box::new(ReplayTransport {
            connector: self.clone(),
            capabilities,
        }))
    }
}

struct ReplayTransport {
    connector: ReplayConnector,
    capabilities: Vec<String>,
}

#[async_trait]
impl Transport for ReplayTransport {
    fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    async fn get_config(
        &mut self,
        source: Datastore,
        filter: &str,
    ) -> Result<String, NetconfError> {
        let SessionEvent::GetConfig {
            source: recorded_source,
            filter: recorded_filter,
            success,
            content,
            error,
        } = self.connector.next("get_config")?
        else {
            return Err(NetconfError::ReplayMismatch("expected get_config".to_string()));
        };
        if recorded_source != source || recorded_filter.as_deref() != Some(filter) {
            return Err(NetconfError::ReplayMismatch(format!(
                "get-config on {} with a different filter than recorded",
                source.as_str()
            )));
        }
        if !success {
            return Err(replayed_error(error));
        }
        content.ok_or_else(|| {
            NetconfError::ReplayMismatch("recorded get-config has no content".to_string())
        })
    }

    async fn edit_config(&mut self, target: Datastore, config: &str) -> Result<(), NetconfError> {
        let SessionEvent::EditConfig {
            target: recorded_target,
            config: recorded_config,
            success,
            error,
        } = self.connector.next("edit_config")?
        else {
            return Err(NetconfError::ReplayMismatch("expected edit_config".to_string()));
        };
        if recorded_target != target || recorded_config.as_deref() != Some(config) {
            return Err(NetconfError::ReplayMismatch(format!(
                "edit-config on {} with a different payload than recorded",
                target.as_str()
            )));
        }
        if success { Ok(()) } else { Err(replayed_error(error)) }
    }

    async fn commit(&mut self) -> Result<(), NetconfError> {
        let SessionEvent::Commit { success, error } = self.connector.next("commit")? else {
            return Err(NetconfError::ReplayMismatch("expected commit".to_string()));
        };
        if success { Ok(()) } else { Err(replayed_error(error)) }
    }

    async fn close(&mut self) -> Result<(), NetconfError> {
        self.connector.next("connection_closed").map(|_| ())
    }
}

fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}
