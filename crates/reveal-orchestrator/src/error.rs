// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Orchestrator error types.

Renderer and path failures never escape a pipeline run; they are logged and the
queue advances. Only caller mistakes (invalid records) and snapshot I/O reach the
public API as errors.
*/

use std::time::Duration;

use reveal_structures::RecordError;
use thiserror::Error;

/// A single renderer call failed or never completed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("Renderer rejected {operation}: {reason}")]
    Rejected {
        operation: &'static str,
        reason: String,
    },

    #[error("Renderer did not finish {operation} within {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },
}

impl RenderError {
    pub fn rejected(operation: &'static str, reason: impl Into<String>) -> Self {
        RenderError::Rejected {
            operation,
            reason: reason.into(),
        }
    }
}

/// Result type for renderer calls
pub type RenderResult<T> = Result<T, RenderError>;

/// Path acquisition failures for the route stage
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PathError {
    #[error("Path service unavailable: {0}")]
    Unavailable(String),

    #[error("Path has fewer than two points")]
    Degenerate,

    #[error("Path of {0:.2} km is too short")]
    TooShort(f64),
}

/// Errors surfaced by the orchestrator API
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Invalid record: {0}")]
    InvalidRecord(#[from] RecordError),

    #[error("View snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("View snapshot is malformed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for orchestrator operations
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
