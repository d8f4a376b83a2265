use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// The parsed application descriptor.
///
/// Appfile parsing itself is plain TOML; this type only models the
/// fields the driver lifecycle consumes. `path` is set by the loader
/// and points at the descriptor file on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct Appfile {
    pub application: ApplicationConfig,
    #[serde(default)]
    pub infrastructure: Vec<InfrastructureConfig>,
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(skip)]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationConfig {
    pub name: String,
    /// Application kind, used to select the driver (e.g. "script").
    #[serde(rename = "type")]
    pub kind: String,
    /// Paths to applications this one depends on for its dev environment.
    #[serde(default)]
    pub dependencies: Vec<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InfrastructureConfig {
    pub name: String,
    /// Provisioning backend (e.g. "aws").
    #[serde(rename = "type")]
    pub kind: String,
    /// Topology variant (e.g. "vpc").
    pub flavor: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProjectConfig {
    /// Name of the active infrastructure target. Defaults to the first
    /// declared infrastructure when unset.
    pub infrastructure: Option<String>,
}

impl Appfile {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read Appfile: {}", path.display()))?;
        let mut appfile = toml::from_str::<Self>(&text)
            .with_context(|| format!("failed to parse TOML Appfile: {}", path.display()))?;
        appfile.path = path.to_path_buf();
        Ok(appfile)
    }

    /// Resolves the infrastructure target builds run against.
    pub fn active_infrastructure(&self) -> Option<&InfrastructureConfig> {
        match &self.project.infrastructure {
            Some(name) => self.infrastructure.iter().find(|i| &i.name == name),
            None => self.infrastructure.first(),
        }
    }

    /// The directory the Appfile lives in.
    pub fn working_dir(&self) -> PathBuf {
        self.path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// The descriptor file name, used as a fingerprint input.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| crate::constants::DEFAULT_APPFILE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Appfile {
        toml::from_str(
            r#"
            [application]
            name = "svc"
            type = "script"
            dependencies = ["../api"]

            [[infrastructure]]
            name = "aws-main"
            type = "aws"
            flavor = "vpc"

            [[infrastructure]]
            name = "aws-staging"
            type = "aws"
            flavor = "simple"

            [project]
            infrastructure = "aws-main"
            "#,
        )
        .expect("fixture appfile should parse")
    }

    #[test]
    fn parses_application_section() {
        let appfile = fixture();
        assert_eq!(appfile.application.name, "svc");
        assert_eq!(appfile.application.kind, "script");
        assert_eq!(appfile.application.dependencies, vec![PathBuf::from("../api")]);
    }

    #[test]
    fn resolves_active_infrastructure_by_name() {
        let appfile = fixture();
        let infra = appfile.active_infrastructure().expect("must resolve");
        assert_eq!(infra.name, "aws-main");
        assert_eq!(infra.kind, "aws");
        assert_eq!(infra.flavor, "vpc");
    }

    #[test]
    fn defaults_to_first_infrastructure() {
        let mut appfile = fixture();
        appfile.project.infrastructure = None;
        let infra = appfile.active_infrastructure().expect("must resolve");
        assert_eq!(infra.name, "aws-main");
    }

    #[test]
    fn load_from_file_records_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Appfile.toml");
        std::fs::write(
            &path,
            "[application]\nname = \"web\"\ntype = \"script\"\n",
        )
        .unwrap();

        let appfile = Appfile::load_from_file(&path).expect("load should pass");
        assert_eq!(appfile.path, path);
        assert_eq!(appfile.working_dir(), dir.path());
        assert_eq!(appfile.file_name(), "Appfile.toml");
    }
}
