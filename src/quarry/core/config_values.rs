//! The flag bag every `Config` owns and every `Target` accumulates by
//! merging in its configs' values (component of the data model's
//! `config_values`).

/// Compiler/linker flags. Every field is append-only during merge: a
/// target's own values come first, then each applied config's values in
/// application order (`configs` before `all_dependent_configs`, see
/// [`crate::propagation`]).
#[derive(Debug, Clone, Default)]
pub struct ConfigValues {
    pub defines: Vec<String>,
    pub include_dirs: Vec<String>,
    pub cflags: Vec<String>,
    pub cflags_c: Vec<String>,
    pub cflags_cc: Vec<String>,
    pub cflags_objc: Vec<String>,
    pub cflags_objcc: Vec<String>,
    pub ldflags: Vec<String>,
    pub framework_dirs: Vec<String>,
    pub frameworks: Vec<String>,
    pub weak_frameworks: Vec<String>,
    pub libs: Vec<String>,
    pub lib_dirs: Vec<String>,
    pub swiftflags: Vec<String>,
    pub rustflags: Vec<String>,
    pub rustenv: Vec<String>,
    pub externs: Vec<String>,
}

impl ConfigValues {
    pub fn new() -> ConfigValues {
        ConfigValues::default()
    }

    /// Appends every field of `other` onto `self`, in field declaration
    /// order, matching the order writers expect flags to appear on a
    /// command line.
    pub fn append(&mut self, other: &ConfigValues) {
        self.defines.extend(other.defines.iter().cloned());
        self.include_dirs.extend(other.include_dirs.iter().cloned());
        self.cflags.extend(other.cflags.iter().cloned());
        self.cflags_c.extend(other.cflags_c.iter().cloned());
        self.cflags_cc.extend(other.cflags_cc.iter().cloned());
        self.cflags_objc.extend(other.cflags_objc.iter().cloned());
        self.cflags_objcc.extend(other.cflags_objcc.iter().cloned());
        self.ldflags.extend(other.ldflags.iter().cloned());
        self.framework_dirs.extend(other.framework_dirs.iter().cloned());
        self.frameworks.extend(other.frameworks.iter().cloned());
        self.weak_frameworks.extend(other.weak_frameworks.iter().cloned());
        self.libs.extend(other.libs.iter().cloned());
        self.lib_dirs.extend(other.lib_dirs.iter().cloned());
        self.swiftflags.extend(other.swiftflags.iter().cloned());
        self.rustflags.extend(other.rustflags.iter().cloned());
        self.rustenv.extend(other.rustenv.iter().cloned());
        self.externs.extend(other.externs.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_preserves_order_target_then_config() {
        let mut target_values = ConfigValues {
            defines: vec!["OWN".into()],
            ..ConfigValues::new()
        };
        let config_values = ConfigValues {
            defines: vec!["FROM_CONFIG".into()],
            ..ConfigValues::new()
        };
        target_values.append(&config_values);
        assert_eq!(target_values.defines, vec!["OWN", "FROM_CONFIG"]);
    }
}
