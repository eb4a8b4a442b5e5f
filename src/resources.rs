//! Local resource handles for previews and results
//!
//! A [`LocalRef`] is an opaque handle to an in-memory [`Blob`], valid only inside
//! the running session. UI adapters resolve it through the [`ResourceStore`] to
//! display or download the bytes. Handles must be revoked once superseded.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

const LOCAL_REF_PREFIX: &str = "blob:bgremove/";

/// Immutable byte buffer tagged with a MIME type
#[derive(Clone, PartialEq, Eq)]
pub struct Blob {
    data: Arc<[u8]>,
    mime: String,
}

impl Blob {
    /// Wrap bytes without copying or inspecting them
    pub fn new<S: Into<String>>(data: Vec<u8>, mime: S) -> Self {
        Self {
            data: Arc::from(data),
            mime: mime.into(),
        }
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn mime(&self) -> &str {
        &self.mime
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blob")
            .field("mime", &self.mime)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Opaque handle to a blob registered in a [`ResourceStore`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocalRef(String);

impl LocalRef {
    fn generate() -> Self {
        Self(format!("{}{}", LOCAL_REF_PREFIX, uuid::Uuid::new_v4()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registry of live local references
#[derive(Debug, Default)]
pub struct ResourceStore {
    entries: HashMap<LocalRef, Blob>,
}

impl ResourceStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a blob and hand out a fresh reference to it
    pub fn create_ref(&mut self, blob: &Blob) -> LocalRef {
        let local_ref = LocalRef::generate();
        tracing::trace!(local_ref = %local_ref, bytes = blob.len(), "Local reference created");
        self.entries.insert(local_ref.clone(), blob.clone());
        local_ref
    }

    /// Release a reference. Returns `false` if it was not live.
    pub fn revoke(&mut self, local_ref: &LocalRef) -> bool {
        let removed = self.entries.remove(local_ref).is_some();
        if removed {
            tracing::trace!(local_ref = %local_ref, "Local reference revoked");
        }
        removed
    }

    /// Look up the blob behind a live reference
    #[must_use]
    pub fn resolve(&self, local_ref: &LocalRef) -> Option<&Blob> {
        self.entries.get(local_ref)
    }

    /// Number of live references
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
