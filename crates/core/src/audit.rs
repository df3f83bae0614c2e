//! Activity log: fire-and-forget audit entries.
//!
//! Appending is best-effort by contract: an implementation must never let a
//! logging failure reach the caller's success path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub action: String,
    pub detail: String,
}

/// Append-only audit sink.
pub trait ActivityLog: Send + Sync {
    /// Records that `actor` performed `action`. Never fails.
    fn append(&self, actor: &str, action: &str, detail: &str);

    /// Recent entries, newest first. Sinks without retention return empty.
    fn recent(&self) -> Vec<ActivityEntry> {
        Vec::new()
    }
}

/// Audit sink that emits structured tracing events.
#[derive(Debug, Clone, Default)]
pub struct TracingLog;

impl TracingLog {
    pub fn new() -> Self {
        Self
    }
}

impl ActivityLog for TracingLog {
    fn append(&self, actor: &str, action: &str, detail: &str) {
        tracing::info!(actor, action, detail, "activity");
    }
}

/// In-process audit sink with retention, used by the REST view and tests.
#[derive(Default)]
pub struct MemoryLog {
    entries: std::sync::Mutex<Vec<ActivityEntry>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ActivityLog for MemoryLog {
    fn append(&self, actor: &str, action: &str, detail: &str) {
        let entry = ActivityEntry {
            timestamp: Utc::now(),
            actor: actor.to_owned(),
            action: action.to_owned(),
            detail: detail.to_owned(),
        };
        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry),
            // A poisoned lock only loses audit entries, never the operation.
            Err(poisoned) => tracing::warn!("activity log unavailable: {poisoned}"),
        }
    }

    fn recent(&self) -> Vec<ActivityEntry> {
        let mut entries = self
            .entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default();
        entries.reverse();
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_log_returns_newest_first() {
        let log = MemoryLog::new();
        log.append("admin", "Creó Certificado", "Código: 0001-2025");
        log.append("admin", "Generó PDF", "Código: 0001-2025");

        let entries = log.recent();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, "Generó PDF");
        assert_eq!(entries[1].action, "Creó Certificado");
    }

    #[test]
    fn test_tracing_log_has_no_retention() {
        let log = TracingLog::new();
        log.append("admin", "Inicio de Sesión", "");
        assert!(log.recent().is_empty());
    }
}
