// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Where the campaign universe comes from

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::{IngestionError, IngestionResult};

/// Produces the raw dataset rows of the whole universe
#[async_trait]
pub trait UniverseSource: Send + Sync {
    async fn load(&self) -> IngestionResult<Vec<Value>>;

    /// Human-readable origin for logs
    fn describe(&self) -> String;
}

fn into_rows(value: Value) -> IngestionResult<Vec<Value>> {
    match value {
        Value::Array(rows) => Ok(rows),
        Value::Object(_) => Err(IngestionError::NotAnArray("an object")),
        Value::String(_) => Err(IngestionError::NotAnArray("a string")),
        Value::Number(_) => Err(IngestionError::NotAnArray("a number")),
        Value::Bool(_) => Err(IngestionError::NotAnArray("a boolean")),
        Value::Null => Err(IngestionError::NotAnArray("null")),
    }
}

/// A JSON array of rows on disk, re-read on every load
#[derive(Debug, Clone)]
pub struct JsonFileUniverseSource {
    path: PathBuf,
}

impl JsonFileUniverseSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl UniverseSource for JsonFileUniverseSource {
    async fn load(&self) -> IngestionResult<Vec<Value>> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| IngestionError::Io {
                path: self.path.clone(),
                source,
            })?;
        let rows = into_rows(serde_json::from_str(&text)?)?;
        debug!(target: "reveal-ingestion", "Loaded {} row(s) from {}", rows.len(), self.path.display());
        Ok(rows)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Rows held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticUniverseSource {
    rows: Vec<Value>,
}

impl StaticUniverseSource {
    pub fn new(rows: Vec<Value>) -> Self {
        Self { rows }
    }

    pub fn from_json(text: &str) -> IngestionResult<Self> {
        Ok(Self::new(into_rows(serde_json::from_str(text)?)?))
    }
}

#[async_trait]
impl UniverseSource for StaticUniverseSource {
    async fn load(&self) -> IngestionResult<Vec<Value>> {
        Ok(self.rows.clone())
    }

    fn describe(&self) -> String {
        format!("{} in-memory row(s)", self.rows.len())
    }
}
