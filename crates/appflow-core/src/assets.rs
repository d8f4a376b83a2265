//! Template materializer.
//!
//! Copies named logical asset trees (e.g. `common`, `aws-vpc`) into a
//! target build directory, substituting a supplied key/value context
//! into templated file content and relative paths. Copies are not
//! transactional: a failed copy leaves partial output behind, and
//! re-running with the same context is the supported recovery path.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, info, instrument};
use walkdir::WalkDir;

use crate::error::{DriverError, DriverResult};

/// A substitution value; nested maps and lists are permitted.
#[derive(Debug, Clone)]
pub enum TemplateValue {
    Text(String),
    /// Rendered newline-joined.
    List(Vec<String>),
    Map(BTreeMap<String, TemplateValue>),
}

/// Key/value substitution context for a materialization run.
///
/// Keys are referenced from templates as `{{key}}` or, for nested
/// maps, `{{key.subkey}}`.
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    values: BTreeMap<String, TemplateValue>,
}

impl TemplateContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), TemplateValue::Text(value.into()));
        self
    }

    pub fn with_list(mut self, key: impl Into<String>, values: Vec<String>) -> Self {
        self.values.insert(key.into(), TemplateValue::List(values));
        self
    }

    pub fn with_map(
        mut self,
        key: impl Into<String>,
        map: BTreeMap<String, TemplateValue>,
    ) -> Self {
        self.values.insert(key.into(), TemplateValue::Map(map));
        self
    }

    /// Resolves a dotted reference to its rendered text, or `None`
    /// when the path is unknown or lands on a map.
    fn lookup(&self, dotted: &str) -> Option<String> {
        let mut parts = dotted.split('.');
        let mut current = self.values.get(parts.next()?)?;
        for part in parts {
            match current {
                TemplateValue::Map(map) => current = map.get(part)?,
                _ => return None,
            }
        }
        match current {
            TemplateValue::Text(text) => Some(text.clone()),
            TemplateValue::List(items) => Some(items.join("\n")),
            TemplateValue::Map(_) => None,
        }
    }
}

/// Source of logical asset trees rooted at a directory on disk.
pub struct AssetSource {
    root: PathBuf,
    variable_pattern: Regex,
}

impl AssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            // Matches {{variable}} and {{nested.variable}} references.
            variable_pattern: Regex::new(r"\{\{([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)*)\}\}")
                .expect("variable pattern must compile"),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether a logical tree exists under this source.
    pub fn tree_exists(&self, prefix: &str) -> bool {
        self.root.join(prefix).is_dir()
    }

    /// Copies every file under the logical tree `prefix` into
    /// `target_dir`, substituting `ctx` into file contents and
    /// relative paths. A missing tree is `AssetNotFound`; any i/o
    /// failure is surfaced with the offending path.
    #[instrument(skip(self, ctx))]
    pub fn copy_tree(
        &self,
        target_dir: &Path,
        prefix: &str,
        ctx: &TemplateContext,
    ) -> DriverResult<()> {
        let source_root = self.root.join(prefix);
        if !source_root.is_dir() {
            return Err(DriverError::AssetNotFound {
                prefix: prefix.to_string(),
                root: self.root.clone(),
            });
        }

        fs::create_dir_all(target_dir).map_err(|e| DriverError::io(target_dir, e))?;
        info!("materializing asset tree '{}' into {:?}", prefix, target_dir);

        for entry in WalkDir::new(&source_root).min_depth(1) {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| source_root.clone());
                match e.into_io_error() {
                    Some(io) => DriverError::io(path, io),
                    None => DriverError::AssetNotFound {
                        prefix: prefix.to_string(),
                        root: self.root.clone(),
                    },
                }
            })?;

            let source = entry.path();
            let relative = source
                .strip_prefix(&source_root)
                .expect("walked entries live under the source root");
            let target = target_dir.join(self.render_path(relative, ctx));

            if entry.file_type().is_dir() {
                fs::create_dir_all(&target).map_err(|e| DriverError::io(&target, e))?;
                continue;
            }

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| DriverError::io(parent, e))?;
            }

            let raw = fs::read(source).map_err(|e| DriverError::io(source, e))?;
            match String::from_utf8(raw) {
                Ok(text) => {
                    let rendered = self.render_content(&text, ctx);
                    fs::write(&target, rendered).map_err(|e| DriverError::io(&target, e))?;
                    debug!("rendered {:?}", relative);
                }
                Err(raw) => {
                    // Binary asset, copied verbatim.
                    fs::write(&target, raw.into_bytes())
                        .map_err(|e| DriverError::io(&target, e))?;
                    debug!("copied {:?}", relative);
                }
            }
        }

        Ok(())
    }

    /// Substitutes context values into text. Unknown references are
    /// left in place so a partially templated file is visible rather
    /// than silently emptied.
    pub fn render_content(&self, content: &str, ctx: &TemplateContext) -> String {
        self.variable_pattern
            .replace_all(content, |caps: &regex::Captures| {
                let reference = &caps[1];
                ctx.lookup(reference)
                    .unwrap_or_else(|| format!("{{{{{reference}}}}}"))
            })
            .into_owned()
    }

    fn render_path(&self, path: &Path, ctx: &TemplateContext) -> PathBuf {
        PathBuf::from(self.render_content(&path.to_string_lossy(), ctx))
    }
}

impl std::fmt::Debug for AssetSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetSource").field("root", &self.root).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_context() -> TemplateContext {
        let paths = BTreeMap::from([
            ("cache".to_string(), TemplateValue::Text("/c".to_string())),
            ("compiled".to_string(), TemplateValue::Text("/out".to_string())),
        ]);
        TemplateContext::new()
            .with_text("name", "svc")
            .with_list(
                "dev_fragments",
                vec!["/a/frag".to_string(), "/b/frag".to_string()],
            )
            .with_map("path", paths)
    }

    fn seed_tree(root: &Path, prefix: &str, files: &[(&str, &str)]) {
        for (rel, content) in files {
            let path = root.join(prefix).join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
    }

    #[test]
    fn substitutes_nested_and_list_values() {
        let source = AssetSource::new("/unused");
        let rendered = source.render_content(
            "app={{name}} cache={{path.cache}}\n{{dev_fragments}}",
            &fixture_context(),
        );
        assert_eq!(rendered, "app=svc cache=/c\n/a/frag\n/b/frag");
    }

    #[test]
    fn unknown_references_are_preserved() {
        let source = AssetSource::new("/unused");
        let rendered = source.render_content("{{nope}} and {{path.missing}}", &fixture_context());
        assert_eq!(rendered, "{{nope}} and {{path.missing}}");
    }

    #[test]
    fn copy_tree_renders_contents_and_paths() {
        let assets = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        seed_tree(
            assets.path(),
            "common",
            &[
                ("Vagrantfile", "name = \"{{name}}\"\n"),
                ("dev-dep/build/{{name}}.conf", "cache={{path.cache}}\n"),
            ],
        );

        let source = AssetSource::new(assets.path());
        source
            .copy_tree(target.path(), "common", &fixture_context())
            .expect("copy should pass");

        let vagrantfile = fs::read_to_string(target.path().join("Vagrantfile")).unwrap();
        assert_eq!(vagrantfile, "name = \"svc\"\n");

        let conf = fs::read_to_string(target.path().join("dev-dep/build/svc.conf")).unwrap();
        assert_eq!(conf, "cache=/c\n");
    }

    #[test]
    fn copy_tree_is_idempotent() {
        let assets = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        seed_tree(assets.path(), "common", &[("a.txt", "{{name}}")]);

        let source = AssetSource::new(assets.path());
        let ctx = fixture_context();
        source.copy_tree(target.path(), "common", &ctx).unwrap();
        let first = fs::read_to_string(target.path().join("a.txt")).unwrap();

        source.copy_tree(target.path(), "common", &ctx).unwrap();
        let second = fs::read_to_string(target.path().join("a.txt")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn missing_tree_is_asset_not_found() {
        let assets = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();

        let source = AssetSource::new(assets.path());
        let err = source
            .copy_tree(target.path(), "aws-vpc", &fixture_context())
            .expect_err("must fail");
        assert!(matches!(err, DriverError::AssetNotFound { prefix, .. } if prefix == "aws-vpc"));
    }

    #[test]
    fn binary_assets_are_copied_verbatim() {
        let assets = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        let payload: &[u8] = &[0u8, 159, 146, 150];
        let bin = assets.path().join("common/blob.bin");
        fs::create_dir_all(bin.parent().unwrap()).unwrap();
        fs::write(&bin, payload).unwrap();

        let source = AssetSource::new(assets.path());
        source
            .copy_tree(target.path(), "common", &fixture_context())
            .unwrap();

        assert_eq!(fs::read(target.path().join("blob.bin")).unwrap(), payload);
    }
}
