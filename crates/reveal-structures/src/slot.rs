// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Visual slots: parallel placement channels that only spread visual load

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Number of placement channels per viewport
pub const SLOT_COUNT: usize = 4;

/// Pulse treatment drawn for every record in a slot
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SlotVariant {
    pub name: &'static str,
    pub period_ms: u32,
    pub phase_ms: u32,
    pub line_width: f32,
}

pub const SLOT_VARIANTS: [SlotVariant; SLOT_COUNT] = [
    SlotVariant {
        name: "pulse-1700",
        period_ms: 1700,
        phase_ms: 0,
        line_width: 4.0,
    },
    SlotVariant {
        name: "pulse-2000",
        period_ms: 2000,
        phase_ms: 160,
        line_width: 4.0,
    },
    SlotVariant {
        name: "pulse-2300",
        period_ms: 2300,
        phase_ms: 320,
        line_width: 3.8,
    },
    SlotVariant {
        name: "pulse-2600",
        period_ms: 2600,
        phase_ms: 480,
        line_width: 3.8,
    },
];

/// Index of a placement channel, always `< SLOT_COUNT`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct VisualSlot(u8);

impl VisualSlot {
    pub fn new(index: usize) -> Option<Self> {
        (index < SLOT_COUNT).then_some(Self(index as u8))
    }

    /// Uniform draw over all slots
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(rng.gen_range(0..SLOT_COUNT) as u8)
    }

    pub fn all() -> impl Iterator<Item = VisualSlot> {
        (0..SLOT_COUNT as u8).map(VisualSlot)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub fn variant(self) -> &'static SlotVariant {
        &SLOT_VARIANTS[self.index()]
    }
}

impl TryFrom<u8> for VisualSlot {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value as usize).ok_or_else(|| format!("slot {value} out of range 0..{SLOT_COUNT}"))
    }
}

impl From<VisualSlot> for u8 {
    fn from(slot: VisualSlot) -> Self {
        slot.0
    }
}

impl fmt::Display for VisualSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot-{}", self.0)
    }
}
