//! The `Target` item — the workhorse of the data model. Holds sources,
//! dependency/config edges and the merged `config_values` flag bag that
//! drives propagation (component H) and the resolved view (component I).

use std::sync::{Arc, Mutex, OnceLock};

use quarry_platform::{Label, SourceFile};

use crate::core::config_values::ConfigValues;
use crate::core::item::{push_dep, push_ref, DepEdge, EdgeList, Item, ItemCommon, ItemRef};
use crate::core::label_pattern::LabelPattern;
use crate::core::ordered_set::OrderedSet;
use crate::core::resolved_view::ResolvedTargetData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputType {
    Group,
    Executable,
    SharedLib,
    LoadableModule,
    StaticLib,
    SourceSet,
    Action,
    ActionForeach,
    Copy,
    BundleData,
    CreateBundle,
    GeneratedFile,
    RustLibrary,
    RustProcMacro,
}

impl OutputType {
    pub fn from_builtin_name(name: &str) -> Option<OutputType> {
        use OutputType::*;
        Some(match name {
            "group" => Group,
            "executable" => Executable,
            "shared_library" => SharedLib,
            "loadable_module" => LoadableModule,
            "static_library" => StaticLib,
            "source_set" => SourceSet,
            "action" => Action,
            "action_foreach" => ActionForeach,
            "copy" => Copy,
            "bundle_data" => BundleData,
            "create_bundle" => CreateBundle,
            "generated_file" => GeneratedFile,
            "rust_library" => RustLibrary,
            "rust_proc_macro" => RustProcMacro,
            _ => return None,
        })
    }

    /// The inverse of [`OutputType::from_builtin_name`] — the build-file
    /// function name that declares this output type, used to key
    /// `set_defaults("name") { ... }` defaults against a target type.
    pub fn builtin_name(self) -> &'static str {
        use OutputType::*;
        match self {
            Group => "group",
            Executable => "executable",
            SharedLib => "shared_library",
            LoadableModule => "loadable_module",
            StaticLib => "static_library",
            SourceSet => "source_set",
            Action => "action",
            ActionForeach => "action_foreach",
            Copy => "copy",
            BundleData => "bundle_data",
            CreateBundle => "create_bundle",
            GeneratedFile => "generated_file",
            RustLibrary => "rust_library",
            RustProcMacro => "rust_proc_macro",
        }
    }

    /// Executable, shared lib, loadable module, or a complete static lib —
    /// terminates library propagation per the glossary's "final target".
    /// Whether a `StaticLib` counts depends on its `complete_static_lib`
    /// flag, which callers check separately (see [`Target::is_final`]).
    pub fn is_always_final(self) -> bool {
        matches!(
            self,
            OutputType::Executable | OutputType::SharedLib | OutputType::LoadableModule
        )
    }

    /// Source sets and (non-complete) static libs don't themselves link;
    /// their object files are absorbed by the nearest enclosing final
    /// target (invariant 6).
    pub fn is_linkable_intermediate(self) -> bool {
        matches!(self, OutputType::StaticLib | OutputType::SourceSet)
    }

    /// Targets whose completion is a prerequisite for *compiling* (not just
    /// linking) a dependent — actions and generated files, per the
    /// glossary's "hard dependency".
    pub fn is_hard_dep_producer(self) -> bool {
        matches!(
            self,
            OutputType::Action
                | OutputType::ActionForeach
                | OutputType::Copy
                | OutputType::GeneratedFile
                | OutputType::BundleData
        )
    }
}

/// The `(name, source)` pairs `rust_library`/`rust_proc_macro` targets use
/// to expose a dependency under a different crate name than its own.
#[derive(Debug, Clone)]
pub struct AliasedDep {
    pub crate_name: String,
    pub label: Label,
}

#[derive(Debug)]
pub struct Target {
    pub common: ItemCommon,
    pub output_type: OutputType,
    pub complete_static_lib: bool,

    pub sources: OrderedSet<SourceFile>,
    pub public_headers: OrderedSet<SourceFile>,
    pub inputs: OrderedSet<SourceFile>,
    pub data: OrderedSet<SourceFile>,

    pub public_deps: EdgeList<DepEdge>,
    pub private_deps: EdgeList<DepEdge>,
    pub data_deps: EdgeList<DepEdge>,
    pub gen_deps: EdgeList<DepEdge>,

    pub configs: EdgeList<ItemRef>,
    pub public_configs: EdgeList<ItemRef>,
    pub all_dependent_configs: EdgeList<ItemRef>,

    /// The target's own flags, before any config is merged in.
    pub own_config_values: ConfigValues,
    /// Populated once, by [`Target::on_resolved`]: `own_config_values`
    /// followed by every applied config's values in order.
    pub config_values: OnceLock<ConfigValues>,

    pub all_headers_public: bool,
    pub visibility: Vec<LabelPattern>,
    pub testonly: bool,

    pub toolchain: ItemRef,

    pub crate_name: Option<String>,
    pub crate_root: Option<SourceFile>,
    pub crate_type: Option<String>,
    pub aliased_deps: Vec<AliasedDep>,

    resolved: OnceLock<()>,
    pub resolved_data: OnceLock<Arc<Mutex<Option<Arc<ResolvedTargetData>>>>>,
}

impl Target {
    pub fn new(common: ItemCommon, output_type: OutputType, toolchain_label: Label) -> Target {
        Target {
            common,
            output_type,
            complete_static_lib: false,
            sources: OrderedSet::new(),
            public_headers: OrderedSet::new(),
            inputs: OrderedSet::new(),
            data: OrderedSet::new(),
            public_deps: EdgeList::new(),
            private_deps: EdgeList::new(),
            data_deps: EdgeList::new(),
            gen_deps: EdgeList::new(),
            configs: EdgeList::new(),
            public_configs: EdgeList::new(),
            all_dependent_configs: EdgeList::new(),
            own_config_values: ConfigValues::new(),
            config_values: OnceLock::new(),
            all_headers_public: true,
            visibility: Vec::new(),
            testonly: false,
            toolchain: ItemRef::new(toolchain_label),
            crate_name: None,
            crate_root: None,
            crate_type: None,
            aliased_deps: Vec::new(),
            resolved: OnceLock::new(),
            resolved_data: OnceLock::new(),
        }
    }

    pub fn label(&self) -> &Label {
        &self.common.label
    }

    pub fn add_public_dep(&mut self, label: Label) {
        push_dep(&mut self.public_deps, label, true);
    }

    pub fn add_private_dep(&mut self, label: Label) {
        push_dep(&mut self.private_deps, label, false);
    }

    pub fn add_data_dep(&mut self, label: Label) {
        push_dep(&mut self.data_deps, label, false);
    }

    pub fn add_gen_dep(&mut self, label: Label) {
        push_dep(&mut self.gen_deps, label, false);
    }

    pub fn add_config(&mut self, label: Label) {
        push_ref(&mut self.configs, label);
    }

    pub fn add_public_config(&mut self, label: Label) {
        push_ref(&mut self.public_configs, label);
    }

    pub fn add_all_dependent_config(&mut self, label: Label) {
        push_ref(&mut self.all_dependent_configs, label);
    }

    /// Every dependency edge this target declares, across all four lists —
    /// the set the resolver walks to find-or-create records for (§4.G.1).
    pub fn all_dep_edges(&self) -> impl Iterator<Item = &DepEdge> {
        self.public_deps
            .iter()
            .chain(self.private_deps.iter())
            .chain(self.data_deps.iter())
            .chain(self.gen_deps.iter())
            .map(|(_, edge)| edge)
    }

    pub fn all_config_refs(&self) -> impl Iterator<Item = &ItemRef> {
        self.configs
            .iter()
            .chain(self.public_configs.iter())
            .chain(self.all_dependent_configs.iter())
            .map(|(_, r)| r)
    }

    /// Is this target a "final target" per the glossary — does library
    /// propagation terminate here?
    pub fn is_final(&self) -> bool {
        self.output_type.is_always_final()
            || (self.output_type == OutputType::StaticLib && self.complete_static_lib)
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }

    /// Runs once, after every dependency/config/toolchain reference on this
    /// target has resolved (§4.G step 5): merges `configs`' values onto the
    /// target's own, in application order.
    pub fn on_resolved(&self) {
        if self.resolved.get().is_some() {
            return;
        }
        let mut merged = self.own_config_values.clone();
        for (_, config_ref) in self.configs.iter() {
            if let Some(config) = config_ref.item().and_then(|i| i.as_config()) {
                merged.append(&config.config_values);
            }
        }
        for (_, config_ref) in self.public_configs.iter() {
            if let Some(config) = config_ref.item().and_then(|i| i.as_config()) {
                merged.append(&config.config_values);
            }
        }
        let _ = self.config_values.set(merged);
        let _ = self.resolved.set(());
    }

    /// The merged flag bag computed by `on_resolved`. Panics if called
    /// before resolution — a programming error in the caller, since the
    /// resolver guarantees `on_resolved` runs before anything reads this.
    pub fn config_values(&self) -> &ConfigValues {
        self.config_values
            .get()
            .expect("config_values read before Target::on_resolved ran")
    }
}
