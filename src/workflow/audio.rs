//! Narration audio handles.
//!
//! Generated narration arrives as raw bytes. The bytes are parked in an
//! `AudioStore` under an opaque `blob:` URL and the UI only ever sees that
//! URL. Each URL must be revoked once it is no longer shown, otherwise the
//! buffer stays alive for the rest of the process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use uuid::Uuid;

/// URL prefix for buffers held in an `AudioStore`.
pub const BLOB_URL_PREFIX: &str = "blob:scheme-assist/";

/// In-process registry of audio buffers, keyed by their `blob:` URL.
#[derive(Debug, Default)]
pub struct AudioStore {
    buffers: Mutex<HashMap<String, StoredAudio>>,
}

#[derive(Debug, Clone)]
struct StoredAudio {
    content_type: String,
    bytes: Arc<Vec<u8>>,
}

impl AudioStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, StoredAudio>> {
        // A poisoned map is still a valid map.
        self.buffers.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a buffer and return a handle pointing at it.
    pub fn create(&self, bytes: Vec<u8>, content_type: impl Into<String>) -> AudioResource {
        let url = format!("{BLOB_URL_PREFIX}{}", Uuid::new_v4());
        let content_type = content_type.into();
        let len = bytes.len();
        self.lock().insert(
            url.clone(),
            StoredAudio {
                content_type: content_type.clone(),
                bytes: Arc::new(bytes),
            },
        );
        tracing::debug!(url = %url, bytes = len, "Audio buffer created");
        AudioResource::Local {
            url,
            content_type,
            len,
        }
    }

    /// Free the buffer behind `url`. Returns false if it was already gone.
    pub fn revoke(&self, url: &str) -> bool {
        let removed = self.lock().remove(url).is_some();
        if removed {
            tracing::debug!(url = %url, "Audio buffer revoked");
        }
        removed
    }

    /// Bytes behind a live URL.
    pub fn bytes(&self, url: &str) -> Option<Arc<Vec<u8>>> {
        self.lock().get(url).map(|a| Arc::clone(&a.bytes))
    }

    /// Content type of a live URL.
    pub fn content_type(&self, url: &str) -> Option<String> {
        self.lock().get(url).map(|a| a.content_type.clone())
    }

    /// Number of live buffers.
    pub fn live(&self) -> usize {
        self.lock().len()
    }
}

/// A playable narration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AudioResource {
    /// Held in an `AudioStore`; must be revoked when superseded.
    Local {
        url: String,
        content_type: String,
        len: usize,
    },
    /// Hosted by the backend.
    Remote { url: String },
}

impl AudioResource {
    pub fn url(&self) -> &str {
        match self {
            Self::Local { url, .. } | Self::Remote { url } => url,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local { .. })
    }
}

/// The single audio slot of a workflow.
///
/// Whatever occupies the slot is released before it is overwritten, cleared,
/// or dropped.
#[derive(Debug)]
pub struct AudioSlot {
    store: Arc<AudioStore>,
    current: Option<AudioResource>,
}

impl AudioSlot {
    pub fn new(store: Arc<AudioStore>) -> Self {
        Self {
            store,
            current: None,
        }
    }

    pub fn current(&self) -> Option<&AudioResource> {
        self.current.as_ref()
    }

    pub fn store(&self) -> &Arc<AudioStore> {
        &self.store
    }

    /// Release the previous occupant, then install `resource`.
    pub fn replace(&mut self, resource: AudioResource) {
        self.release();
        self.current = Some(resource);
    }

    /// Store `bytes` and install the resulting handle.
    pub fn install_bytes(&mut self, bytes: Vec<u8>, content_type: &str) -> &AudioResource {
        self.release();
        self.current.insert(self.store.create(bytes, content_type))
    }

    /// Release the current occupant, leaving the slot empty.
    pub fn clear(&mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(AudioResource::Local { url, .. }) = self.current.take() {
            self.store.revoke(&url);
        }
    }
}

impl Drop for AudioSlot {
    fn drop(&mut self) {
        self.release();
    }
}
