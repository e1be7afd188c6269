// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use thiserror::Error;

/// Ingestion-side failures. None of these stop an orchestrator that is already running.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Failed to read universe file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Universe data is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Universe data must be a JSON array of records, got {0}")]
    NotAnArray(&'static str),

    #[error("No tokio runtime available to spawn {0}")]
    NoRuntime(&'static str),
}

pub type IngestionResult<T> = Result<T, IngestionError>;
