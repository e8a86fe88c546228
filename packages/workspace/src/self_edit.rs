//! Suppression of file system notifications caused by our own writes.
//!
//! Every write registers a [`WriteToken`] carrying a fingerprint of the text
//! about to land on disk. When the watcher later examines that path, a token
//! whose fingerprint matches the current contents is consumed and the change
//! is not reported. A second cache remembers the last contents seen for each
//! path so that touches which leave the text unchanged are dropped as well.
//!
//! Tokens expire after a time to live. A write whose event never arrives,
//! because no watcher was running or the event was coalesced away, must not
//! hide a later external change that happens to restore the same text.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::locks::normalize_path;

pub fn fingerprint(content: &str) -> u32 {
    crc32fast::hash(content.as_bytes())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteToken {
    pub id: Uuid,
    pub path: PathBuf,
    fingerprint: u32,
    registered_at: Instant,
}

impl WriteToken {
    fn is_live(&self, ttl: Duration) -> bool {
        self.registered_at.elapsed() < ttl
    }
}

/// How long an unconsumed token suppresses matching changes
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(5);

pub struct SelfEditFilter {
    pending: Mutex<HashMap<PathBuf, Vec<WriteToken>>>,
    known: Mutex<HashMap<PathBuf, u32>>,
    ttl: Duration,
}

impl Default for SelfEditFilter {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_TOKEN_TTL)
    }
}

fn expire(pending: &mut HashMap<PathBuf, Vec<WriteToken>>, ttl: Duration) {
    pending.retain(|path, tokens| {
        let before = tokens.len();
        tokens.retain(|t| t.is_live(ttl));
        if tokens.len() < before {
            tracing::debug!(path = %path.display(), expired = before - tokens.len(), "expired self edits");
        }
        !tokens.is_empty()
    });
}

impl SelfEditFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            pending: Mutex::default(),
            known: Mutex::default(),
            ttl,
        }
    }

    /// Announce a write of `content` to `path`; call before writing
    pub fn register(&self, path: &Path, content: &str) -> WriteToken {
        let key = normalize_path(path);
        let token = WriteToken {
            id: Uuid::new_v4(),
            path: key.clone(),
            fingerprint: fingerprint(content),
            registered_at: Instant::now(),
        };
        tracing::debug!(path = %key.display(), token = %token.id, "registered self edit");
        let mut pending = self.pending.lock();
        expire(&mut pending, self.ttl);
        pending.entry(key).or_default().push(token.clone());
        token
    }

    /// Withdraw a token whose write failed
    pub fn cancel(&self, token: &WriteToken) {
        let mut pending = self.pending.lock();
        if let Some(tokens) = pending.get_mut(&token.path) {
            tokens.retain(|t| t.id != token.id);
            if tokens.is_empty() {
                pending.remove(&token.path);
            }
        }
    }

    /// Record the contents last read or written for `path`
    pub fn remember(&self, path: &Path, content: &str) {
        self.known.lock().insert(normalize_path(path), fingerprint(content));
    }

    /// Drop every outstanding token. Writes made before a watcher starts
    /// produce no events for it to consume.
    pub fn clear_pending(&self) {
        let mut pending = self.pending.lock();
        if !pending.is_empty() {
            tracing::debug!(paths = pending.len(), "cleared self edits");
        }
        pending.clear();
    }

    pub fn forget(&self, path: &Path) {
        let key = normalize_path(path);
        self.known.lock().remove(&key);
        self.pending.lock().remove(&key);
    }

    /// Decide whether a change to `path` should be reported. `content` is
    /// the current text, or `None` when the file is gone.
    pub fn should_notify(&self, path: &Path, content: Option<&str>) -> bool {
        let key = normalize_path(path);
        let Some(content) = content else {
            self.forget(&key);
            return true;
        };
        let current = fingerprint(content);

        {
            let mut pending = self.pending.lock();
            expire(&mut pending, self.ttl);
            if let Some(tokens) = pending.get_mut(&key) {
                if let Some(i) = tokens.iter().position(|t| t.fingerprint == current) {
                    let token = tokens.remove(i);
                    if tokens.is_empty() {
                        pending.remove(&key);
                    }
                    tracing::debug!(path = %key.display(), token = %token.id, "consumed self edit");
                    self.known.lock().insert(key, current);
                    return false;
                }
            }
        }

        let mut known = self.known.lock();
        if known.get(&key) == Some(&current) {
            return false;
        }
        known.insert(key, current);
        true
    }

    /// Tokens still waiting for their change event
    pub fn pending_count(&self) -> usize {
        let mut pending = self.pending.lock();
        expire(&mut pending, self.ttl);
        pending.values().map(Vec::len).sum()
    }
}
