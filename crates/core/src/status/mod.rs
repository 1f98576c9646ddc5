use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use crate::media::MediaKind;

/// One-way status updates for whatever surface presents them. The core emits
/// these; it never owns layout or button state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StatusUpdate {
    Loading { name: String },
    Loaded { name: String, kind: MediaKind },
    LargeFile { name: String, size_mb: f64 },
    Listening,
    MicrophoneStopped,
    SwitchedToFile,
    Error { message: String },
}

pub trait StatusSink {
    fn publish(&mut self, update: StatusUpdate);
}

/// Sink that drops every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl StatusSink for NullSink {
    fn publish(&mut self, _update: StatusUpdate) {}
}

/// Shared in-memory sink. Clones observe the same buffer, so a test can hand
/// one clone to the controller and inspect the other.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    updates: Arc<Mutex<Vec<StatusUpdate>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<StatusUpdate> {
        self.updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn errors(&self) -> Vec<StatusUpdate> {
        self.updates()
            .into_iter()
            .filter(|update| matches!(update, StatusUpdate::Error { .. }))
            .collect()
    }
}

impl StatusSink for MemorySink {
    fn publish(&mut self, update: StatusUpdate) {
        self.updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_clones_share_a_buffer() {
        let sink = MemorySink::new();
        let mut writer = sink.clone();
        writer.publish(StatusUpdate::Listening);
        writer.publish(StatusUpdate::Error {
            message: "nope".into(),
        });

        assert_eq!(sink.updates().len(), 2);
        assert_eq!(sink.errors().len(), 1);
    }
}
