//! Plant checkpoints and per-cycle checkpoint state.

use crate::domain::errors::TrackingError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A physical QR checkpoint inside the plant.
///
/// Checkpoints are visited in declaration order during one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Checkpoint {
    #[serde(rename = "punto1")]
    Entry,
    #[serde(rename = "punto2")]
    Waiting,
    #[serde(rename = "punto3")]
    Loading,
    #[serde(rename = "punto4")]
    Exit,
}

impl Checkpoint {
    /// All checkpoints in visiting order.
    pub const ALL: [Checkpoint; 4] = [
        Checkpoint::Entry,
        Checkpoint::Waiting,
        Checkpoint::Loading,
        Checkpoint::Exit,
    ];

    /// Checkpoint that closes a cycle.
    pub const FINAL: Checkpoint = Checkpoint::Exit;

    /// Checkpoint a cycle must pass before it can be closed at exit.
    pub const LOAD: Checkpoint = Checkpoint::Loading;

    /// Code printed in the QR URL (`/scan/{code}`).
    pub fn code(&self) -> &'static str {
        match self {
            Checkpoint::Entry => "punto1",
            Checkpoint::Waiting => "punto2",
            Checkpoint::Loading => "punto3",
            Checkpoint::Exit => "punto4",
        }
    }

    /// Name shown to drivers.
    pub fn display_name(&self) -> &'static str {
        match self {
            Checkpoint::Entry => "Ingreso",
            Checkpoint::Waiting => "Espera",
            Checkpoint::Loading => "Carga",
            Checkpoint::Exit => "Salida",
        }
    }

    /// Parse a checkpoint code.
    pub fn parse(code: &str) -> Result<Self, TrackingError> {
        Self::ALL
            .into_iter()
            .find(|c| c.code() == code.trim())
            .ok_or_else(|| TrackingError::UnknownCheckpoint(code.to_string()))
    }

    pub fn is_final(&self) -> bool {
        *self == Self::FINAL
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Checkpoint {
    type Err = TrackingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// State of a checkpoint within one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointState {
    Completed,
    Skipped,
    Pending,
}

/// Checkpoint states for a cycle given the checkpoints scanned in it.
///
/// A checkpoint is skipped when it was not scanned but a later one was.
pub fn checkpoint_states(scanned: &[Checkpoint]) -> Vec<(Checkpoint, CheckpointState)> {
    let furthest = scanned.iter().max().copied();

    Checkpoint::ALL
        .into_iter()
        .map(|checkpoint| {
            let state = if scanned.contains(&checkpoint) {
                CheckpointState::Completed
            } else if furthest.is_some_and(|f| f > checkpoint) {
                CheckpointState::Skipped
            } else {
                CheckpointState::Pending
            };
            (checkpoint, state)
        })
        .collect()
}

/// True when any checkpoint of the cycle was skipped.
pub fn has_skips(scanned: &[Checkpoint]) -> bool {
    checkpoint_states(scanned)
        .iter()
        .any(|(_, state)| *state == CheckpointState::Skipped)
}
