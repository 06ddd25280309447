//! `Config` items — named, reusable bundles of compiler/linker flags that
//! targets pull in via `configs`/`public_configs`/`all_dependent_configs`.

use quarry_platform::Label;

use crate::core::config_values::ConfigValues;
use crate::core::item::{EdgeList, ItemCommon, ItemRef};

/// A declared `config("name") { ... }`. Owns its own flag bag plus an
/// ordered list of sub-configs applied recursively (a config can pull in
/// other configs the same way a target pulls in configs).
#[derive(Debug)]
pub struct Config {
    pub common: ItemCommon,
    pub config_values: ConfigValues,
    pub configs: EdgeList<ItemRef>,
}

impl Config {
    pub fn new(common: ItemCommon) -> Config {
        Config {
            common,
            config_values: ConfigValues::new(),
            configs: EdgeList::new(),
        }
    }

    pub fn label(&self) -> &Label {
        &self.common.label
    }
}
