//! Component I — the resolved view. Each `Target` computes its flattened,
//! propagation-derived data (library lists, hard deps, ...) at most once,
//! lazily, the first time any writer asks for it; every later caller gets
//! the same cached `Arc` without recomputing or re-locking the propagation
//! walk.

use std::sync::{Arc, Mutex};

use quarry_platform::Label;

use crate::core::item::Item;
use crate::core::ordered_set::UpgradeMap;
use crate::core::propagation::{self, InheritedLib};
use crate::core::target::OutputType;

/// Everything component H's propagation walk produces for one target,
/// computed once and shared behind an `Arc` from then on.
#[derive(Debug)]
pub struct ResolvedTargetData {
    pub inherited_libraries: UpgradeMap<Label, InheritedLib>,
    pub all_libs: Vec<String>,
    pub all_lib_dirs: Vec<String>,
    pub all_frameworks: Vec<String>,
    pub all_framework_dirs: Vec<String>,
    pub all_weak_frameworks: Vec<String>,
    pub recursive_hard_deps: Vec<Arc<Item>>,
    /// The subset of `inherited_libraries` that are themselves Rust
    /// crates — the set `rustc --extern` needs, since Rust (unlike C/C++)
    /// requires every transitively-linked `rlib` to be named explicitly
    /// rather than discovered through the linker.
    pub rust_transitive_inherited_libs: Vec<Arc<Item>>,
}

impl ResolvedTargetData {
    fn compute(root: &Arc<Item>) -> ResolvedTargetData {
        let inherited = propagation::inherited_libraries(root);

        let rust_transitive_inherited_libs = inherited
            .iter()
            .filter_map(|(_, entry)| {
                let t = entry.target.as_target()?;
                matches!(t.output_type, OutputType::RustLibrary | OutputType::RustProcMacro)
                    .then(|| Arc::clone(&entry.target))
            })
            .collect();

        ResolvedTargetData {
            all_libs: propagation::flattened_field(root, |t| &t.config_values().libs),
            all_lib_dirs: propagation::flattened_field(root, |t| &t.config_values().lib_dirs),
            all_frameworks: propagation::flattened_field(root, |t| &t.config_values().frameworks),
            all_framework_dirs: propagation::flattened_field(root, |t| &t.config_values().framework_dirs),
            all_weak_frameworks: propagation::flattened_field(root, |t| &t.config_values().weak_frameworks),
            recursive_hard_deps: propagation::recursive_hard_deps(root),
            rust_transitive_inherited_libs,
            inherited_libraries: inherited,
        }
    }

    /// Returns the cached resolved view for `root`, computing it on first
    /// use. `None` if `root` isn't a target (configs/toolchains/pools have
    /// no resolved view).
    pub fn for_item(root: &Arc<Item>) -> Option<Arc<ResolvedTargetData>> {
        let target = root.as_target()?;
        let cell = target
            .resolved_data
            .get_or_init(|| Arc::new(Mutex::new(None)));
        let mut guard = cell.lock().unwrap();
        if let Some(existing) = guard.as_ref() {
            return Some(Arc::clone(existing));
        }
        let computed = Arc::new(ResolvedTargetData::compute(root));
        *guard = Some(Arc::clone(&computed));
        Some(computed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::item::ItemCommon;
    use crate::core::settings::test_settings_arc;
    use crate::core::target::Target;
    use crate::util::errors::Location;
    use quarry_platform::SourceDir;

    fn label(name: &str) -> Label {
        Label::new(SourceDir::root(), name, None)
    }

    fn new_target(name: &str, output_type: OutputType) -> Target {
        let settings = test_settings_arc();
        let toolchain_label = settings.toolchain_label.as_ref().clone();
        let common = ItemCommon {
            label: label(name),
            settings,
            defined_from: Location::new(1, 1),
            defined_in: Default::default(),
            build_dependency_files: Vec::new(),
        };
        Target::new(common, output_type, toolchain_label)
    }

    #[test]
    fn caches_across_repeated_calls() {
        let mut lib = new_target("lib", OutputType::SourceSet);
        lib.own_config_values.libs.push("m".to_string());
        let mut exe = new_target("exe", OutputType::Executable);
        let lib_label = lib.label().clone();
        exe.add_private_dep(lib_label);

        let lib_item = Arc::new(Item::Target(lib));
        let exe_item = Arc::new(Item::Target(exe));
        if let Item::Target(t) = exe_item.as_ref() {
            for (_, edge) in t.private_deps.iter() {
                edge.ref_.resolve(Arc::clone(&lib_item));
            }
            t.on_resolved();
        }
        if let Item::Target(t) = lib_item.as_ref() {
            t.on_resolved();
        }

        let first = ResolvedTargetData::for_item(&exe_item).unwrap();
        assert_eq!(first.all_libs, vec!["m".to_string()]);
        let second = ResolvedTargetData::for_item(&exe_item).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
