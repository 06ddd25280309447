//! `quarry desc <label>` — the one writer kept in-tree, serializing a single
//! target's declared fields plus its component I resolved view to JSON via
//! `serde`/`serde_json`. Concrete Ninja/Xcode/Bazel writers stay out of
//! scope; this exists only to exercise the resolved view end-to-end and to
//! give humans/scripts a way to inspect one target without a real writer.

use serde::Serialize;

use quarry_platform::Label;

use crate::core::item::Item;
use crate::core::registry::Registry;
use crate::core::resolved_view::ResolvedTargetData;
use crate::util::errors::QuarryResult;

#[derive(Debug, Serialize)]
pub struct DescOutput {
    pub label: String,
    pub output_type: &'static str,
    pub sources: Vec<String>,
    pub public_headers: Vec<String>,
    pub inputs: Vec<String>,
    pub data: Vec<String>,
    pub deps: Vec<String>,
    pub public_deps: Vec<String>,
    pub data_deps: Vec<String>,
    pub configs: Vec<String>,
    pub all_libs: Vec<String>,
    pub all_lib_dirs: Vec<String>,
    pub all_frameworks: Vec<String>,
    pub recursive_hard_deps: Vec<String>,
}

/// Looks up `label` and builds its `DescOutput`. Errors if the label was
/// never declared, hasn't resolved, or doesn't name a target (configs,
/// toolchains and pools have nothing for `desc` to show).
pub fn describe(registry: &Registry, label: &Label) -> QuarryResult<DescOutput> {
    let record = registry
        .get(label)
        .ok_or_else(|| anyhow::anyhow!("{} was not declared by any build file", label.display_name(true)))?;
    let item = record
        .item()
        .ok_or_else(|| anyhow::anyhow!("{} was referenced but never declared", label.display_name(true)))?;
    let target = item
        .as_target()
        .ok_or_else(|| anyhow::anyhow!("{} is a {}, not a target", label.display_name(true), item.kind_name()))?;

    let resolved = ResolvedTargetData::for_item(item)
        .expect("as_target() just succeeded, so for_item must too");

    Ok(DescOutput {
        label: label.display_name(true),
        output_type: target.output_type.builtin_name(),
        sources: target.sources.iter().map(|f| f.to_string()).collect(),
        public_headers: target.public_headers.iter().map(|f| f.to_string()).collect(),
        inputs: target.inputs.iter().map(|f| f.to_string()).collect(),
        data: target.data.iter().map(|f| f.to_string()).collect(),
        deps: target.private_deps.iter().map(|(l, _)| l.display_name(true)).collect(),
        public_deps: target.public_deps.iter().map(|(l, _)| l.display_name(true)).collect(),
        data_deps: target.data_deps.iter().map(|(l, _)| l.display_name(true)).collect(),
        configs: target.configs.iter().map(|(l, _)| l.display_name(true)).collect(),
        all_libs: resolved.all_libs.clone(),
        all_lib_dirs: resolved.all_lib_dirs.clone(),
        all_frameworks: resolved.all_frameworks.clone(),
        recursive_hard_deps: resolved
            .recursive_hard_deps
            .iter()
            .map(|i| i.label().display_name(true))
            .collect(),
    })
}

/// `describe`, rendered as pretty-printed JSON — the string the CLI prints.
pub fn run(registry: &Registry, label: &Label) -> QuarryResult<String> {
    let output = describe(registry, label)?;
    Ok(serde_json::to_string_pretty(&output)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::Registry;
    use crate::core::resolver::Resolver;
    use crate::evaluator::Evaluator;
    use quarry_platform::SourceDir;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    fn eval(source: &str) -> (Arc<Registry>, Label) {
        let registry = Arc::new(Registry::new());
        let resolver = Arc::new(Resolver::new(Arc::clone(&registry)));
        let evaluator = Evaluator::new(Arc::clone(&registry), Arc::clone(&resolver), "/src".into());
        let settings = crate::core::settings::test_settings();
        let scope = Rc::new(RefCell::new(crate::core::scope::Scope::root(SourceDir::root(), settings)));
        evaluator
            .eval_file(SourceDir::root().join_file("BUILD.quarry"), source, &scope)
            .unwrap();
        let label = Label::parse(&SourceDir::root(), None, "//:foo").unwrap();
        (registry, label)
    }

    #[test]
    fn describes_a_group_with_deps_and_libs() {
        let (registry, label) = eval(
            "group(\"bar\") {\n  libs = [ \"m\" ]\n}\n\ngroup(\"foo\") {\n  deps = [ \":bar\" ]\n}\n",
        );

        let output = describe(&registry, &label).expect("foo should describe cleanly");
        assert_eq!(output.output_type, "group");
        assert_eq!(output.deps, vec!["//:bar".to_string()]);
        assert_eq!(output.all_libs, vec!["m".to_string()]);
    }

    #[test]
    fn errors_on_an_undeclared_label() {
        let (registry, _) = eval("group(\"foo\") {}\n");
        let missing = Label::parse(&SourceDir::root(), None, "//:missing").unwrap();
        assert!(describe(&registry, &missing).is_err());
    }
}
