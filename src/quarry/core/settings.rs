//! Build-wide and per-toolchain configuration threaded through every scope
//! and item.

use std::sync::Arc;

use quarry_platform::{Label, SourceDir};

/// Global, toolchain-independent configuration: read once from the `.gn`
/// dotfile and shared by every `Settings` instance in the run.
#[derive(Debug)]
pub struct BuildSettings {
    pub source_root: SourceDir,
    pub build_dir: SourceDir,
    pub args: Vec<(String, String)>,
    pub check_dependent_configs: bool,
}

impl BuildSettings {
    pub fn new(source_root: SourceDir, build_dir: SourceDir) -> BuildSettings {
        BuildSettings {
            source_root,
            build_dir,
            args: Vec::new(),
            check_dependent_configs: false,
        }
    }
}

/// The context every `Item` and `Scope` carries: which toolchain it was
/// declared in, plus the build-wide settings. Every field is an `Arc`, so
/// cloning is cheap — the evaluator keeps one `Arc<Settings>` per toolchain
/// and hands each file's `Scope` its own `Rc<Settings>` clone (scopes are
/// single-threaded per file; items crossing into the registry keep the
/// `Arc` form).
#[derive(Debug, Clone)]
pub struct Settings {
    pub build_settings: Arc<BuildSettings>,
    pub toolchain_label: Arc<Label>,
    pub default_toolchain_label: Arc<Label>,
}

impl Settings {
    pub fn new(
        build_settings: Arc<BuildSettings>,
        toolchain_label: Arc<Label>,
        default_toolchain_label: Arc<Label>,
    ) -> Settings {
        Settings {
            build_settings,
            toolchain_label,
            default_toolchain_label,
        }
    }

    pub fn is_default_toolchain(&self) -> bool {
        self.toolchain_label == self.default_toolchain_label
    }

    /// `target_out_dir`/`target_gen_dir` live under a toolchain-qualified
    /// subdirectory of the build dir for every toolchain but the default one,
    /// matching scenario 6's `get_label_info` behavior.
    pub fn toolchain_out_dir(&self) -> SourceDir {
        if self.is_default_toolchain() {
            self.build_settings.build_dir
        } else {
            self.build_settings
                .build_dir
                .join_dir(self.toolchain_label.name())
        }
    }
}

#[cfg(test)]
pub(crate) fn test_settings() -> std::rc::Rc<Settings> {
    std::rc::Rc::new(test_settings_arc().as_ref().clone())
}

#[cfg(test)]
pub(crate) fn test_settings_arc() -> Arc<Settings> {
    let build_settings = Arc::new(BuildSettings::new(
        SourceDir::root(),
        SourceDir::new("//out/Debug/"),
    ));
    let default_toolchain = Arc::new(Label::new(
        SourceDir::new("//toolchain/"),
        "default",
        None,
    ));
    Arc::new(Settings::new(
        build_settings,
        Arc::clone(&default_toolchain),
        default_toolchain,
    ))
}
