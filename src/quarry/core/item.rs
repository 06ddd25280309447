//! The four concrete kinds of declaration a build file can produce.

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use quarry_platform::{Label, SourceFile};

use crate::core::config_item::Config;
use crate::core::settings::Settings;
use crate::core::target::Target;
use crate::core::toolchain::{Pool, Toolchain};
use crate::util::errors::Location;

/// Fields common to every declared item, regardless of kind.
#[derive(Debug)]
pub struct ItemCommon {
    pub label: Label,
    pub settings: Arc<Settings>,
    pub defined_from: Location,
    pub defined_in: PathBuf,
    /// Build files read while evaluating this declaration (the file itself
    /// plus any `read_file`/`exec_script` inputs) — used by `desc --deps`
    /// style introspection and would seed a future dependency-file-based
    /// rebuild check.
    pub build_dependency_files: Vec<SourceFile>,
}

/// The four things a build file can declare at toplevel.
#[derive(Debug)]
pub enum Item {
    Target(Target),
    Config(Config),
    Toolchain(Toolchain),
    Pool(Pool),
}

impl Item {
    pub fn common(&self) -> &ItemCommon {
        match self {
            Item::Target(t) => &t.common,
            Item::Config(c) => &c.common,
            Item::Toolchain(t) => &t.common,
            Item::Pool(p) => &p.common,
        }
    }

    pub fn label(&self) -> &Label {
        &self.common().label
    }

    pub fn as_target(&self) -> Option<&Target> {
        match self {
            Item::Target(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_target_mut(&mut self) -> Option<&mut Target> {
        match self {
            Item::Target(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_config(&self) -> Option<&Config> {
        match self {
            Item::Config(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_toolchain(&self) -> Option<&Toolchain> {
        match self {
            Item::Toolchain(t) => Some(t),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Item::Target(_) => "target",
            Item::Config(_) => "config",
            Item::Toolchain(_) => "toolchain",
            Item::Pool(_) => "pool",
        }
    }
}

/// A reference to another item by label, resolved at most once. Shared by
/// every edge kind (`deps`, `configs`, `toolchain`) in component G — the
/// `OnceLock` gives the "written at most once, lock-free reads after" cache
/// discipline §3 "Lifecycles" asks for, without needing `&mut` access once
/// the record is shared behind an `Arc`.
#[derive(Debug)]
pub struct ItemRef {
    pub label: Label,
    resolved: OnceLock<Arc<Item>>,
}

impl ItemRef {
    pub fn new(label: Label) -> ItemRef {
        ItemRef {
            label,
            resolved: OnceLock::new(),
        }
    }

    /// Links this reference to its target item. Called at most once, by the
    /// resolver; a second call would indicate a registry bug, not a build
    /// file error, so it panics rather than threading a `Result` through.
    pub fn resolve(&self, item: Arc<Item>) {
        self.resolved
            .set(item)
            .unwrap_or_else(|_| panic!("{} resolved twice", self.label));
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }

    pub fn item(&self) -> Option<&Arc<Item>> {
        self.resolved.get()
    }

    pub fn target(&self) -> Option<&Target> {
        self.item().and_then(|i| i.as_target())
    }
}

/// A dependency edge: a label plus the public/private visibility bit
/// invariant 4 propagates transitively.
#[derive(Debug)]
pub struct DepEdge {
    pub ref_: ItemRef,
    pub is_public: bool,
}

impl DepEdge {
    pub fn new(label: Label, is_public: bool) -> DepEdge {
        DepEdge {
            ref_: ItemRef::new(label),
            is_public,
        }
    }

    pub fn label(&self) -> &Label {
        &self.ref_.label
    }
}

/// An ordered, uniqued list of label references of one relationship kind
/// (`deps`, `configs`, ...). Re-declaring an already-present label is a
/// no-op per invariant 3; built directly on [`UpgradeMap`] since that's
/// exactly the "insert, or leave the existing entry untouched" contract
/// (the "upgrade" merge function is trivial here — declaration-time edges
/// don't gain a stronger flag the way `inherited_libraries` entries do).
pub type EdgeList<E> = crate::core::ordered_set::UpgradeMap<Label, E>;

pub fn push_dep(list: &mut EdgeList<DepEdge>, label: Label, is_public: bool) {
    let key = label.clone();
    list.upsert(key, DepEdge::new(label, is_public), |_, _| {});
}

pub fn push_ref(list: &mut EdgeList<ItemRef>, label: Label) {
    let key = label.clone();
    list.upsert(key, ItemRef::new(label), |_, _| {});
}
