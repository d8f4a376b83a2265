//! File-backed infrastructure directory and the readiness gate.
//!
//! The directory is the registry of provisioned infrastructure
//! targets. Appflow only reads it; the provisioning workflow that
//! writes it lives outside this system.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use appflow_core::{
    Directory, DriverError, DriverResult, InfraId, InfraState, InfrastructureRecord,
};

/// Directory backed by a single JSON registry file mapping
/// infrastructure ids to records.
///
/// A missing registry file means nothing has been provisioned yet, so
/// every lookup resolves to `None` rather than an error.
#[derive(Debug)]
pub struct JsonDirectory {
    path: PathBuf,
}

impl JsonDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> DriverResult<HashMap<String, InfrastructureRecord>> {
        if !self.path.is_file() {
            debug!("directory registry {:?} absent, treating as empty", self.path);
            return Ok(HashMap::new());
        }

        let text = std::fs::read_to_string(&self.path).map_err(|e| {
            DriverError::LookupFailure(format!("failed to read {}: {e}", self.path.display()))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            DriverError::LookupFailure(format!("failed to parse {}: {e}", self.path.display()))
        })
    }
}

impl Directory for JsonDirectory {
    fn get_infra(&self, id: &InfraId) -> DriverResult<Option<InfrastructureRecord>> {
        Ok(self.load()?.remove(id.as_str()))
    }
}

/// Readiness gate policy for the Build phase.
pub mod gate {
    use super::*;

    /// Looks up the infrastructure target and admits forward progress
    /// only when its state is `ready`.
    ///
    /// An absent record or any other state is a hard stop: the caller
    /// must not invoke the provisioning tool, and the error tells the
    /// user which step to run first.
    pub fn check_ready(
        directory: &dyn Directory,
        id: &InfraId,
    ) -> DriverResult<InfrastructureRecord> {
        let record = directory.get_infra(id)?;

        match record {
            Some(record) if record.state == InfraState::Ready => {
                debug!("infrastructure '{}' is ready", id);
                Ok(record)
            }
            other => {
                let state = other
                    .map(|r| r.state.to_string())
                    .unwrap_or_else(|| "not created".to_string());
                Err(DriverError::PreconditionNotMet {
                    message: format!(
                        "Infrastructure '{id}' for this application hasn't been built yet \
                         (current state: {state}).\n\
                         The build step requires this because the target infrastructure\n\
                         as well as its final properties can affect the build process.\n\
                         Please run `appflow infra` to build the underlying infrastructure,\n\
                         then run `appflow build` again."
                    ),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_registry(dir: &Path, entries: &[(&str, InfraState)]) -> PathBuf {
        let records: HashMap<String, InfrastructureRecord> = entries
            .iter()
            .map(|(name, state)| {
                (
                    name.to_string(),
                    InfrastructureRecord {
                        id: InfraId::new(*name),
                        kind: "aws".to_string(),
                        flavor: "vpc".to_string(),
                        state: *state,
                    },
                )
            })
            .collect();

        let path = dir.join("directory.json");
        std::fs::write(&path, serde_json::to_string_pretty(&records).unwrap()).unwrap();
        path
    }

    #[test]
    fn missing_registry_file_resolves_to_none() {
        let dir = tempfile::tempdir().unwrap();
        let directory = JsonDirectory::new(dir.path().join("directory.json"));

        let record = directory.get_infra(&InfraId::new("aws-main")).unwrap();
        assert!(record.is_none());
    }

    #[test]
    fn lookup_returns_registered_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_registry(dir.path(), &[("aws-main", InfraState::Ready)]);
        let directory = JsonDirectory::new(path);

        let record = directory
            .get_infra(&InfraId::new("aws-main"))
            .unwrap()
            .expect("record must exist");
        assert_eq!(record.state, InfraState::Ready);
    }

    #[test]
    fn malformed_registry_is_a_lookup_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("directory.json");
        std::fs::write(&path, "not json").unwrap();
        let directory = JsonDirectory::new(path);

        let err = directory
            .get_infra(&InfraId::new("aws-main"))
            .expect_err("must fail");
        assert!(matches!(err, DriverError::LookupFailure(_)));
    }

    #[test]
    fn gate_admits_only_ready_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_registry(
            dir.path(),
            &[
                ("ready-infra", InfraState::Ready),
                ("pending-infra", InfraState::Provisioning),
            ],
        );
        let directory = JsonDirectory::new(path);

        let record = gate::check_ready(&directory, &InfraId::new("ready-infra"))
            .expect("ready infra must pass the gate");
        assert_eq!(record.state, InfraState::Ready);

        let err = gate::check_ready(&directory, &InfraId::new("pending-infra"))
            .expect_err("non-ready infra must fail the gate");
        assert!(matches!(err, DriverError::PreconditionNotMet { ref message }
            if message.contains("appflow infra") && message.contains("provisioning")));
    }

    #[test]
    fn gate_rejects_unregistered_infrastructure() {
        let dir = tempfile::tempdir().unwrap();
        let directory = JsonDirectory::new(dir.path().join("directory.json"));

        let err = gate::check_ready(&directory, &InfraId::new("aws-main"))
            .expect_err("absent infra must fail the gate");
        assert!(matches!(err, DriverError::PreconditionNotMet { ref message }
            if message.contains("not created")));
    }
}
