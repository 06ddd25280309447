//! `quarry gen <out_dir>` — the primary verb. Reads the `.quarry` dotfile,
//! builds a fresh registry/resolver/evaluator, and runs the loader to
//! completion: "a full load + resolve pass" per spec.md's description of
//! this entry point. Every other verb (`desc`, `check`, `refs`) operates on
//! the [`GenResult`] this produces rather than re-running the loader itself.

use std::path::Path;
use std::sync::Arc;

use quarry_platform::{Label, SourceDir};

use crate::config::{ProjectConfig, BUILD_FILE_NAME};
use crate::core::registry::Registry;
use crate::core::resolver::Resolver;
use crate::evaluator::Evaluator;
use crate::loader::Loader;
use crate::util::errors::QuarryResult;
use crate::util::shell::Shell;

/// The fully resolved outcome of one generation — the registry every
/// downstream verb walks.
pub struct GenResult {
    pub registry: Arc<Registry>,
    pub resolver: Arc<Resolver>,
    pub evaluator: Arc<Evaluator>,
    /// Needed to resolve a bare (no `(toolchain)` suffix) label typed on the
    /// command line against the same default every target in the registry
    /// was declared under.
    pub default_toolchain: Arc<Label>,
}

/// Runs one generation rooted at `source_root`, with build output destined
/// for `build_dir`. `jobs` sizes the loader's worker pool; `cli_args` are
/// `--args` overrides merged over the dotfile's `default_args`.
pub fn gen(
    source_root: &Path,
    build_dir: SourceDir,
    cli_args: &[(String, String)],
    jobs: usize,
    shell: &mut Shell,
) -> QuarryResult<GenResult> {
    let config = ProjectConfig::load(source_root, build_dir, cli_args)?;

    shell.status("Loading", source_root.display())?;

    let registry = Arc::new(Registry::new());
    let resolver = Arc::new(Resolver::new(Arc::clone(&registry)));
    let evaluator = Arc::new(Evaluator::new(
        Arc::clone(&registry),
        Arc::clone(&resolver),
        config.source_root.clone(),
    ));

    let loader = Loader::new(
        Arc::clone(&evaluator),
        Arc::clone(&config.build_settings),
        Arc::clone(&config.default_toolchain),
        jobs,
        BUILD_FILE_NAME,
        None,
    );
    loader.run(SourceDir::root())?;

    shell.status(
        "Generated",
        format!("{} declarations resolved into {}", registry.len(), build_dir),
    )?;

    Ok(GenResult {
        registry,
        resolver,
        evaluator,
        default_toolchain: config.default_toolchain,
    })
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
    fn generates_a_small_tree() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            ".quarry",
            "default_toolchain = \"//build/toolchain:host\"\n",
        );
        write(
            tmp.path(),
            "build/toolchain/BUILD.quarry",
            "toolchain(\"host\") {\n  tool(\"stamp\") {\n    command = \"touch {{output}}\"\n  }\n}\n",
        );
        write(
            tmp.path(),
            "BUILD.quarry",
            "group(\"all\") {\n  deps = [ \":lib\" ]\n}\n\ngroup(\"lib\") {\n}\n",
        );

        let mut shell = Shell::new(crate::util::shell::ColorConfig::Never, crate::util::shell::Verbosity::Quiet);
        let result = gen(tmp.path(), SourceDir::new("//out/Debug/"), &[], 2, &mut shell).expect("gen should succeed");
        assert!(result.registry.len() >= 3);
    }
}
