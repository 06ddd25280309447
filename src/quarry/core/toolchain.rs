//! `Toolchain` and `Pool` items, and the `Tool` definitions a toolchain owns.

use std::collections::HashMap;

use quarry_platform::{Atom, Label};

use crate::core::item::{EdgeList, ItemCommon, ItemRef};

/// One `tool("name") { ... }` block inside a `toolchain`. Fields beyond
/// `command`/`description` are optional substitution knobs writers consult;
/// the core only validates that a target's `output_type` has a matching
/// tool name in its toolchain (§7 "Toolchain errors").
#[derive(Debug, Clone, Default)]
pub struct Tool {
    pub name: String,
    pub command: String,
    pub description: Option<String>,
    pub depfile: Option<String>,
    pub outputs: Vec<String>,
    pub rspfile: Option<String>,
    pub rspfile_content: Option<String>,
    pub pool: Option<Label>,
    pub restat: bool,
}

impl Tool {
    pub fn new(name: impl Into<String>) -> Tool {
        Tool {
            name: name.into(),
            ..Tool::default()
        }
    }
}

/// A declared `toolchain("name") { ... }`: a named collection of tools plus
/// dependencies that must build before anything using this toolchain.
#[derive(Debug)]
pub struct Toolchain {
    pub common: ItemCommon,
    pub tools: HashMap<Atom, Tool>,
    pub deps: EdgeList<ItemRef>,
    pub concurrent_links: Option<u32>,
}

impl Toolchain {
    pub fn new(common: ItemCommon) -> Toolchain {
        Toolchain {
            common,
            tools: HashMap::new(),
            deps: EdgeList::new(),
            concurrent_links: None,
        }
    }

    pub fn label(&self) -> &Label {
        &self.common.label
    }

    pub fn tool(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    /// The tool name an `output_type` lowers to, matching the naming
    /// convention of the real tool (`cc`, `cxx`, `alink`, `solink`, ...);
    /// used to report a "toolchain has no tool for this source/output type"
    /// error (§7.5) before a writer ever sees the target.
    pub fn required_tool_name(output_type: super::target::OutputType) -> Option<&'static str> {
        use super::target::OutputType::*;
        match output_type {
            Executable => Some("link"),
            SharedLib => Some("solink"),
            LoadableModule => Some("solink_module"),
            StaticLib => Some("alink"),
            RustLibrary | RustProcMacro => Some("rust_rlib"),
            Copy => Some("copy"),
            Action | ActionForeach => None, // actions carry their own command, no toolchain tool needed
            Group | SourceSet | BundleData | CreateBundle | GeneratedFile => None,
        }
    }
}

/// A declared `pool("name") { depth = N }`, bounding concurrency for the
/// actions/links assigned to it by a writer.
#[derive(Debug)]
pub struct Pool {
    pub common: ItemCommon,
    pub depth: u32,
}

impl Pool {
    pub fn new(common: ItemCommon, depth: u32) -> Pool {
        Pool { common, depth }
    }

    pub fn label(&self) -> &Label {
        &self.common.label
    }
}
