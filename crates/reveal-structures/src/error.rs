// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Record validation errors

use thiserror::Error;

/// Reasons a record is refused before it can reach the queue
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("Record identifier is empty")]
    EmptyId,

    #[error("Non-finite coordinate: lat={lat}, lng={lng}")]
    NonFiniteCoordinate { lat: f64, lng: f64 },

    #[error("Latitude {0} outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("Longitude {0} outside [-180, 180]")]
    LongitudeOutOfRange(f64),
}

/// Result type for record validation
pub type RecordResult<T> = Result<T, RecordError>;
