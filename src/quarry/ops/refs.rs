//! `quarry refs <label-or-pattern>` — reverse dependency lookup: every
//! target in the registry with at least one dependency edge matching the
//! given pattern(s). Built directly on [`crate::core::label_pattern`], the
//! same matcher `visibility` lists and the `label_matches`/`filter_labels`
//! built-ins use, so `refs //foo:*` and a build file's own `visibility =
//! [ "//foo:*" ]` mean exactly the same thing.

use quarry_platform::Label;

use crate::core::item::Item;
use crate::core::label_pattern::LabelPattern;
use crate::core::registry::Registry;

/// Labels of every resolved target that depends (directly, through any of
/// `deps`/`public_deps`/`data_deps`/`gen_deps`) on something `patterns`
/// admits, sorted for stable output.
pub fn refs(registry: &Registry, patterns: &[LabelPattern]) -> Vec<Label> {
    let mut out: Vec<Label> = registry
        .all_records()
        .into_iter()
        .filter_map(|record| {
            let item = record.item()?;
            let target = item.as_target()?;
            let depends_on_match = target
                .all_dep_edges()
                .any(|edge| patterns.iter().any(|pattern| pattern.matches(edge.label())));
            depends_on_match.then(|| target.label().clone())
        })
        .collect();
    out.sort();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::Registry;
    use crate::core::resolver::Resolver;
    use crate::core::scope::Scope;
    use crate::core::settings::test_settings;
    use crate::evaluator::Evaluator;
    use quarry_platform::SourceDir;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    #[test]
    fn finds_every_direct_dependent_of_a_pattern() {
        let registry = Arc::new(Registry::new());
        let resolver = Arc::new(Resolver::new(Arc::clone(&registry)));
        let evaluator = Evaluator::new(Arc::clone(&registry), resolver, "/src".into());
        let scope = Rc::new(RefCell::new(Scope::root(SourceDir::root(), test_settings())));
        evaluator
            .eval_file(
                SourceDir::root().join_file("BUILD.quarry"),
                concat!(
                    "group(\"base\") {\n}\n",
                    "group(\"a\") {\n  deps = [ \":base\" ]\n}\n",
                    "group(\"b\") {\n  deps = [ \":base\" ]\n}\n",
                    "group(\"c\") {\n}\n",
                ),
                &scope,
            )
            .unwrap();

        let pattern = LabelPattern::parse(&SourceDir::root(), None, "//:base").unwrap();
        let found = refs(&registry, &[pattern]);
        let names: Vec<_> = found.iter().map(|l| l.display_name(true)).collect();
        assert_eq!(names, vec!["//:a".to_string(), "//:b".to_string()]);
    }
}
