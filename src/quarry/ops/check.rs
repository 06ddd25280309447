//! `quarry check` — walks every resolved target's dependency edges and
//! verifies that each dependency's `visibility` list admits the dependent,
//! and that no non-test target depends on a `testonly` one. `original_source`
//! runs this as a second pass over an already-built dependency graph rather
//! than enforcing it at declare time (visibility can name labels that don't
//! exist yet when the dependent target is declared); quarry follows the same
//! shape, as a verb over the registry `gen` already resolved.

use crate::core::item::Item;
use crate::core::registry::Registry;
use crate::util::errors::{QuarryResult, ResolutionError};

/// Returns `Ok(())` if every dependency edge in the registry is admitted by
/// its target's `visibility` list and respects `testonly`; otherwise the
/// first violation found, as a [`ResolutionError::VisibilityViolation`].
pub fn check(registry: &Registry) -> QuarryResult<()> {
    for record in registry.all_records() {
        let Some(item) = record.item() else { continue };
        let Item::Target(dependent) = item.as_ref() else { continue };

        for edge in dependent.all_dep_edges() {
            let Some(dependency_item) = edge.ref_.item() else { continue };
            let Item::Target(dependency) = dependency_item.as_ref() else { continue };

            let visible = dependency.visibility.is_empty()
                || dependency.visibility.iter().any(|pattern| pattern.matches(dependent.label()));
            if !visible {
                return Err(ResolutionError::VisibilityViolation {
                    dependent: dependent.label().display_name(true),
                    dependency: dependency.label().display_name(true),
                }
                .into());
            }

            if dependency.testonly && !dependent.testonly {
                return Err(ResolutionError::VisibilityViolation {
                    dependent: dependent.label().display_name(true),
                    dependency: dependency.label().display_name(true),
                }
                .into());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::Registry;
    use crate::core::resolver::Resolver;
    use crate::evaluator::Evaluator;
    use crate::core::scope::Scope;
    use crate::core::settings::test_settings;
    use quarry_platform::SourceDir;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    fn eval(source: &str) -> Arc<Registry> {
        let registry = Arc::new(Registry::new());
        let resolver = Arc::new(Resolver::new(Arc::clone(&registry)));
        let evaluator = Evaluator::new(Arc::clone(&registry), resolver, "/src".into());
        let scope = Rc::new(RefCell::new(Scope::root(SourceDir::root(), test_settings())));
        evaluator
            .eval_file(SourceDir::root().join_file("BUILD.quarry"), source, &scope)
            .unwrap();
        registry
    }

    #[test]
    fn a_private_visibility_list_blocks_an_outside_dependent() {
        let registry = eval(concat!(
            "group(\"lib\") {\n",
            "  visibility = [ \":only_me\" ]\n",
            "}\n",
            "group(\"other\") {\n",
            "  deps = [ \":lib\" ]\n",
            "}\n",
        ));
        assert!(check(&registry).is_err());
    }

    #[test]
    fn an_empty_visibility_list_admits_everyone() {
        let registry = eval(concat!(
            "group(\"lib\") {\n}\n",
            "group(\"other\") {\n",
            "  deps = [ \":lib\" ]\n",
            "}\n",
        ));
        assert!(check(&registry).is_ok());
    }

    #[test]
    fn a_non_testonly_target_cannot_depend_on_a_testonly_one() {
        let registry = eval(concat!(
            "group(\"test_support\") {\n",
            "  testonly = true\n",
            "}\n",
            "group(\"prod\") {\n",
            "  deps = [ \":test_support\" ]\n",
            "}\n",
        ));
        assert!(check(&registry).is_err());
    }
}
