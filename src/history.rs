//! Rolling conversation history
//!
//! Holds the newest `cap` (query, response) turns, oldest first. On disk the
//! history is a JSON array of two-element string arrays.

use crate::{Error, Result};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

pub const DEFAULT_HISTORY_CAP: usize = 10;

/// One completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub query: String,
    pub response: String,
}

impl ConversationTurn {
    pub fn new(query: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            response: response.into(),
        }
    }

    /// A turn is usable as model context only when both sides carry text.
    pub fn is_well_formed(&self) -> bool {
        !self.query.trim().is_empty() && !self.response.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationHistory {
    turns: VecDeque<ConversationTurn>,
    cap: usize,
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAP)
    }
}

impl ConversationHistory {
    /// Create an empty history. A cap of zero is clamped to one.
    pub fn new(cap: usize) -> Self {
        Self {
            turns: VecDeque::new(),
            cap: cap.max(1),
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    pub fn turns(&self) -> Vec<ConversationTurn> {
        self.turns.iter().cloned().collect()
    }

    /// Append a turn, evicting the oldest ones once the cap is exceeded.
    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push_back(turn);
        while self.turns.len() > self.cap {
            self.turns.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn to_json(&self) -> Result<String> {
        let pairs: Vec<[&str; 2]> = self
            .turns
            .iter()
            .map(|t| [t.query.as_str(), t.response.as_str()])
            .collect();
        Ok(serde_json::to_string_pretty(&pairs)?)
    }

    /// Parse a saved history, keeping only the newest `cap` turns.
    ///
    /// Every entry must be a two-element array of strings; anything else
    /// rejects the whole document.
    pub fn from_json(json: &str, cap: usize) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let entries = value
            .as_array()
            .ok_or_else(|| Error::History("expected a list of [query, response] pairs".into()))?;

        let mut history = Self::new(cap);
        for (index, entry) in entries.iter().enumerate() {
            let pair = match entry.as_array().map(Vec::as_slice) {
                Some([query, response]) => query.as_str().zip(response.as_str()),
                _ => None,
            };
            let (query, response) = pair.ok_or_else(|| {
                Error::History(format!(
                    "entry {} is not a [string, string] pair: {}",
                    index, entry
                ))
            })?;
            history.push(ConversationTurn::new(query, response));
        }
        Ok(history)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        tracing::info!("Saved {} turns to {}", self.len(), path.display());
        Ok(())
    }

    pub fn load(path: &Path, cap: usize) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json, cap)
    }

    /// Replace the current turns with the ones stored at `path`.
    ///
    /// On any error the current history is left untouched.
    pub fn replace_from_file(&mut self, path: &Path) -> Result<usize> {
        let loaded = Self::load(path, self.cap)?;
        self.turns = loaded.turns;
        tracing::info!("Loaded {} turns from {}", self.len(), path.display());
        Ok(self.len())
    }
}
