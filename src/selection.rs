//! Persisted provider/model selection per config type.
//!
//! One JSON document, `{ "llm": {...}, "embedding": {...} }`. Every write
//! reads the whole document, changes one key and rewrites the whole file, so
//! keys this module does not know about survive. Concurrent writers from
//! other processes are not coordinated; the last writer wins.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::AppConfig;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConfigType {
    Llm,
    Embedding,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub provider: String,
    pub model: String,
}

#[derive(Error, Debug)]
enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("document is not a JSON object")]
    NotAnObject,
}

#[derive(Debug, Clone)]
pub struct SelectionStore {
    path: PathBuf,
}

impl SelectionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.selection_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Active selection for `config_type`. A missing file, a missing key and
    /// an unreadable document all yield `None`.
    pub fn get(&self, config_type: ConfigType) -> Option<Selection> {
        let document = match self.load() {
            Ok(document) => document,
            Err(e) => {
                error!("Failed to read selection from {:?}: {}", self.path, e);
                return None;
            }
        };
        let entry = document.get(config_type.to_string().as_str())?;
        match serde_json::from_value(entry.clone()) {
            Ok(selection) => Some(selection),
            Err(e) => {
                debug!("Ignoring malformed {} selection: {}", config_type, e);
                None
            }
        }
    }

    pub fn set(&self, config_type: ConfigType, provider: &str, model: &str) -> bool {
        let selection = Selection {
            provider: provider.to_string(),
            model: model.to_string(),
        };
        let result = self.update(|document| {
            document.insert(config_type.to_string(), serde_json::to_value(&selection)?);
            Ok(())
        });
        match result {
            Ok(()) => {
                info!("Set active {} selection: {}/{}", config_type, provider, model);
                true
            }
            Err(e) => {
                error!("Failed to save {} selection: {}", config_type, e);
                false
            }
        }
    }

    pub fn clear(&self, config_type: ConfigType) -> bool {
        let result = self.update(|document| {
            document.remove(config_type.to_string().as_str());
            Ok(())
        });
        match result {
            Ok(()) => {
                info!("Cleared active {} selection", config_type);
                true
            }
            Err(e) => {
                error!("Failed to clear {} selection: {}", config_type, e);
                false
            }
        }
    }

    fn load(&self) -> Result<Map<String, Value>, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&text)? {
            Value::Object(map) => Ok(map),
            _ => Err(StoreError::NotAnObject),
        }
    }

    fn update<F>(&self, mutate: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Map<String, Value>) -> Result<(), StoreError>,
    {
        let mut document = self.load()?;
        mutate(&mut document)?;
        self.write(&document)
    }

    /// Whole-document write through a sibling temp file, so readers never
    /// observe a half-written document.
    fn write(&self, document: &Map<String, Value>) -> Result<(), StoreError> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;
        let mut file = tempfile::NamedTempFile::new_in(&parent)?;
        serde_json::to_writer_pretty(&mut file, document)?;
        file.write_all(b"\n")?;
        file.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}
