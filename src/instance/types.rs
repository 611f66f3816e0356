//! Instance-related type definitions.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{FleetError, Result};

/// Lifecycle operations a controller accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Start,
    Stop,
    Restart,
    Reload,
    Promote,
    Status,
}

impl Operation {
    pub const ALL: [Self; 6] = [
        Self::Start,
        Self::Stop,
        Self::Restart,
        Self::Reload,
        Self::Promote,
        Self::Status,
    ];

    /// Verb as understood by the control program.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
            Self::Reload => "reload",
            Self::Promote => "promote",
            Self::Status => "status",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| FleetError::unknown_operation(s))
    }
}

/// Status information for an instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceStatus {
    pub name: String,
    pub running: bool,
    pub pid: Option<u32>,
    pub children: Option<usize>,
    pub port: Option<u16>,
}

impl InstanceStatus {
    /// Server process plus its children, as shown in the status table.
    pub fn threads(&self) -> Option<usize> {
        self.children.map(|children| children + 1)
    }
}

/// What a successfully dispatched operation produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OperationOutcome {
    /// Verdict after start or restart; `false` means the server did not come up.
    Running { running: bool },
    Stopped,
    /// Forwarded to the control program (reload, promote).
    Issued,
    Status(InstanceStatus),
}

impl OperationOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Running { running: false })
    }
}

/// Result of one operation on one instance within a batch.
#[derive(Debug)]
pub struct OperationReport {
    pub instance: String,
    pub operation: Operation,
    pub result: Result<OperationOutcome>,
}

impl OperationReport {
    pub fn succeeded(&self) -> bool {
        self.result.as_ref().is_ok_and(OperationOutcome::is_success)
    }
}
