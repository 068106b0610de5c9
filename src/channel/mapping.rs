//! Default channel names per message type.

use crate::core::Message;
use crate::error::DispatchError;
use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Maps a driver or message type to the channel used when a message names
/// no channel.
///
/// Writes are serialized and publish a fresh copy of the table; reads load
/// the published copy without locking.
#[derive(Debug, Default)]
pub struct Mapping {
    table: Mutex<HashMap<String, String>>,
    published: ArcSwap<HashMap<String, String>>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, kind: &str, channel: &str) {
        self.set_many([(kind, channel)]);
    }

    /// Sets several entries, publishing once if anything changed.
    pub fn set_many<'a, I>(&self, entries: I)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        let mut changed = false;
        for (kind, channel) in entries {
            if table.get(kind).map(String::as_str) != Some(channel) {
                table.insert(kind.to_string(), channel.to_string());
                changed = true;
            }
        }
        if changed {
            self.published.store(Arc::new(table.clone()));
        }
    }

    pub fn unset(&self, kind: &str) {
        self.unset_many([kind]);
    }

    /// Removes several entries, publishing once if anything changed.
    pub fn unset_many<'a, I>(&self, kinds: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        let mut changed = false;
        for kind in kinds {
            changed |= table.remove(kind).is_some();
        }
        if changed {
            self.published.store(Arc::new(table.clone()));
        }
    }

    /// Returns the channel mapped to `kind`.
    pub fn get(&self, kind: &str) -> Option<String> {
        self.published.load().get(kind).cloned()
    }

    /// Returns a copy of the whole table.
    pub fn get_all(&self) -> HashMap<String, String> {
        self.published.load().as_ref().clone()
    }

    /// Resolves the default channel name for a message without one.
    ///
    /// # Returns
    /// * `Err(DispatchError::MissingChannelName)` if the message has no type
    /// * `Ok("")` if the type is not mapped; the caller fails at lookup
    pub fn default_channel_name(&self, msg: &Message) -> Result<String, DispatchError> {
        if msg.kind().is_empty() {
            return Err(DispatchError::MissingChannelName);
        }
        Ok(self.get(msg.kind()).unwrap_or_default())
    }
}
