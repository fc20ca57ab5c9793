use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Extension used when a MIME type has no subtype.
const FALLBACK_EXTENSION: &str = "webm";

/// One finished recording. Immutable once created.
#[derive(Debug, Clone)]
pub struct Clip {
    id: Uuid,
    created_at: DateTime<Utc>,
    mime_type: String,
    payload: Arc<[u8]>,
}

impl Clip {
    /// Concatenate `fragments` in order into a new clip.
    pub fn from_fragments(fragments: &[Vec<u8>], mime_type: impl Into<String>) -> Self {
        let payload: Vec<u8> = fragments.concat();
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            mime_type: mime_type.into(),
            payload: payload.into(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn byte_size(&self) -> usize {
        self.payload.len()
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Shared handle to the payload bytes.
    pub fn payload_handle(&self) -> Arc<[u8]> {
        self.payload.clone()
    }

    /// File extension from the MIME subtype, parameters stripped.
    ///
    /// `audio/webm;codecs=opus` → `webm`
    pub fn extension(&self) -> &str {
        extension_for(&self.mime_type)
    }

    /// `"<session>-take-<n>.<ext>"`, `take` counting from 1.
    pub fn suggested_filename(&self, session: &str, take: usize) -> String {
        format!("{session}-take-{take}.{}", self.extension())
    }

    /// Write the payload into `dir` under its suggested filename.
    pub fn write_to(&self, dir: &Path, session: &str, take: usize) -> io::Result<PathBuf> {
        let path = dir.join(self.suggested_filename(session, take));
        fs::write(&path, &self.payload)?;
        Ok(path)
    }
}

pub(crate) fn extension_for(mime_type: &str) -> &str {
    mime_type
        .split_once('/')
        .map(|(_, subtype)| subtype.split(';').next().unwrap_or(subtype).trim())
        .filter(|ext| !ext.is_empty())
        .unwrap_or(FALLBACK_EXTENSION)
}
