//! The `.quarry` root dotfile — quarry's analogue of GN's `.gn`, renamed
//! one-for-one. Evaluated with the same `Scope`/`Evaluator` machinery as any
//! build file, under a throwaway bootstrap `Settings` (no toolchain is known
//! yet; the dotfile itself never declares targets). Its evaluation is
//! expected to bind three names at top level:
//!
//!   - `default_toolchain`: the label used for any target that doesn't name
//!     one explicitly.
//!   - `default_args`: a scope of build-arg defaults, the lowest-priority
//!     source `declare_args()` consults — overridden by `--args` on the
//!     command line.
//!   - `check_dependent_configs`: whether `quarry check` (and config
//!     propagation generally) should also validate configs pulled in only
//!     through `all_dependent_configs`.
//!
//! `original_source` routes the default toolchain through a second
//! indirection (`buildconfig = "//build/config/BUILDCONFIG.gn"`, itself
//! calling `set_default_toolchain(...)`); quarry's dotfile names the
//! toolchain directly instead of bouncing through a second file. That
//! simplification is recorded in DESIGN.md.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use quarry_platform::{Label, SourceDir};

use crate::core::registry::Registry;
use crate::core::resolver::Resolver;
use crate::core::scope::Scope;
use crate::core::settings::{BuildSettings, Settings};
use crate::evaluator::Evaluator;
use crate::util::errors::{Location, QuarryResult};

pub const DOTFILE_NAME: &str = ".quarry";
pub const BUILD_FILE_NAME: &str = "BUILD.quarry";

/// Parses a `key=value,key=value` CLI `--args` string into raw overrides,
/// left uncoerced until `Evaluator::exec_declare_args` can compare each one
/// against its `declare_args()` default's type.
pub fn parse_cli_args(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .filter_map(|chunk| {
            chunk
                .split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        })
        .collect()
}

/// Everything a generation needs to construct its own `Evaluator`/`Loader`:
/// the merged build-wide settings and the default toolchain label.
pub struct ProjectConfig {
    pub source_root: PathBuf,
    pub build_settings: Arc<BuildSettings>,
    pub default_toolchain: Arc<Label>,
}

impl ProjectConfig {
    /// Reads and evaluates `source_root/.quarry`, merging `cli_args` over
    /// its `default_args` (CLI wins on a shared key).
    pub fn load(source_root: &Path, build_dir: SourceDir, cli_args: &[(String, String)]) -> QuarryResult<ProjectConfig> {
        let dotfile_path = source_root.join(DOTFILE_NAME);
        let source = std::fs::read_to_string(&dotfile_path)
            .map_err(|e| anyhow::anyhow!("couldn't read {}: {}", dotfile_path.display(), e))?;

        let registry = Arc::new(Registry::new());
        let resolver = Arc::new(Resolver::new(Arc::clone(&registry)));
        let evaluator = Evaluator::new(registry, resolver, source_root.to_path_buf());

        // The dotfile has no real toolchain yet; this placeholder is
        // discarded once `load` returns.
        let placeholder_toolchain = Arc::new(Label::new(SourceDir::root(), "__dotfile__", None));
        let placeholder_build_settings = Arc::new(BuildSettings::new(SourceDir::root(), build_dir));
        let placeholder_settings = Rc::new(Settings::new(
            Arc::clone(&placeholder_build_settings),
            Arc::clone(&placeholder_toolchain),
            Arc::clone(&placeholder_toolchain),
        ));
        let scope = Rc::new(RefCell::new(Scope::root(SourceDir::root(), placeholder_settings)));
        let dotfile = SourceDir::root().join_file(DOTFILE_NAME);
        evaluator.eval_file(dotfile, &source, &scope)?;

        let scope = scope.borrow();

        let default_toolchain_value = scope
            .peek_value("default_toolchain")
            .ok_or_else(|| anyhow::anyhow!("{}: must set default_toolchain", dotfile_path.display()))?;
        let default_toolchain_str = default_toolchain_value.as_str(Location::new(1, 1))?;
        let default_toolchain = Label::parse(&SourceDir::root(), None, default_toolchain_str)
            .map_err(|e| anyhow::anyhow!("{}: invalid default_toolchain: {}", dotfile_path.display(), e))?;

        let mut args: BTreeMap<String, String> = BTreeMap::new();
        if let Some(default_args) = scope.peek_value("default_args") {
            let default_args = default_args.as_scope(Location::new(1, 1))?;
            let default_args = default_args.borrow();
            for name in default_args.local_names() {
                if let Some(value) = default_args.peek_value(name) {
                    args.insert(name.to_string(), value.display_unquoted());
                }
            }
        }
        for (key, value) in cli_args {
            args.insert(key.clone(), value.clone());
        }

        let check_dependent_configs = match scope.peek_value("check_dependent_configs") {
            Some(value) => value.as_bool(Location::new(1, 1))?,
            None => false,
        };

        let build_settings = Arc::new(BuildSettings {
            source_root: SourceDir::root(),
            build_dir,
            args: args.into_iter().collect(),
            check_dependent_configs,
        });

        Ok(ProjectConfig {
            source_root: source_root.to_path_buf(),
            build_settings,
            default_toolchain: Arc::new(default_toolchain),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, rel: &str, contents: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn reads_default_toolchain_and_merges_cli_args_over_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            ".quarry",
            concat!(
                "default_toolchain = \"//toolchain:clang\"\n",
                "default_args = {\n",
                "  is_debug = true\n",
                "  target = \"x64\"\n",
                "}\n",
                "check_dependent_configs = true\n",
            ),
        );

        let config = ProjectConfig::load(
            tmp.path(),
            SourceDir::new("//out/Debug/"),
            &[("target".to_string(), "arm64".to_string())],
        )
        .expect("dotfile should evaluate");

        assert_eq!(config.default_toolchain.display_name(true), "//toolchain:clang");
        assert!(config.build_settings.check_dependent_configs);

        let args: BTreeMap<_, _> = config.build_settings.args.iter().cloned().collect();
        assert_eq!(args.get("is_debug").map(String::as_str), Some("true"));
        assert_eq!(args.get("target").map(String::as_str), Some("arm64"));
    }

    #[test]
    fn parses_cli_args_string() {
        let parsed = parse_cli_args("is_debug=false, target = arm64");
        assert_eq!(
            parsed,
            vec![
                ("is_debug".to_string(), "false".to_string()),
                ("target".to_string(), "arm64".to_string()),
            ]
        );
    }
}
