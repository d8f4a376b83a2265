//! Infrastructure records and the directory lookup seam.
//!
//! The driver only ever reads infrastructure state; provisioning and
//! state transitions belong to the orchestrator that owns the
//! directory.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::DriverResult;

/// Lifecycle state of a provisioned infrastructure target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InfraState {
    Pending,
    Provisioning,
    Ready,
    Failed,
    Destroyed,
}

impl InfraState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Provisioning => "provisioning",
            Self::Ready => "ready",
            Self::Failed => "failed",
            Self::Destroyed => "destroyed",
        }
    }
}

impl Display for InfraState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identifier of an infrastructure target in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InfraId(pub String);

impl InfraId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for InfraId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Externally owned state describing an infrastructure target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfrastructureRecord {
    pub id: InfraId,
    #[serde(rename = "type")]
    pub kind: String,
    pub flavor: String,
    pub state: InfraState,
}

/// Lookup seam into the infrastructure directory.
///
/// `Ok(None)` means the target has never been registered; callers
/// treat that the same as a non-ready state.
pub trait Directory: std::fmt::Debug + Send + Sync {
    fn get_infra(&self, id: &InfraId) -> DriverResult<Option<InfrastructureRecord>>;
}
