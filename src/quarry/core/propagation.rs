//! Component H — the propagation engine. Computes inherited libraries
//! (H.2) and flattens the dependency DAG under the four ordering
//! disciplines (H.3): `DEFAULT`, `INCLUDE`, `LINK`, `LEGACY`.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use quarry_platform::Label;

use crate::core::item::Item;
use crate::core::ordered_set::UpgradeMap;
use crate::core::target::Target;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ordering {
    Default,
    Include,
    Link,
    Legacy,
}

/// One entry of `inherited_libraries`: the library target itself, plus
/// whether it's visible to *this* target's dependents (invariant 4: a
/// chain of public edges makes it public all the way up).
#[derive(Debug, Clone)]
pub struct InheritedLib {
    pub target: Arc<Item>,
    pub is_public: bool,
}

/// The direct link-relevant dependencies of `item` — `public_deps` then
/// `private_deps`, resolved to `Target` items only. Non-target deps can't
/// occur (a target can only depend on other targets), but an unresolved
/// edge is skipped defensively rather than panicking.
fn linked_children(item: &Item) -> Vec<(Arc<Item>, bool)> {
    let Item::Target(t) = item else { return Vec::new() };
    t.public_deps
        .iter()
        .chain(t.private_deps.iter())
        .filter_map(|(_, edge)| {
            edge.ref_
                .item()
                .filter(|i| i.as_target().is_some())
                .map(|i| (Arc::clone(i), edge.is_public))
        })
        .collect()
}

fn upsert_public(out: &mut UpgradeMap<Label, InheritedLib>, label: Label, target: Arc<Item>, is_public: bool) {
    out.upsert(label, InheritedLib { target, is_public }, |existing, new| {
        existing.is_public = existing.is_public || new.is_public;
    });
}

/// Component H.2. `root` itself is never an entry in its own result. Takes
/// the owning `Arc<Item>` (rather than a bare `&Target`) since every entry
/// clones further `Arc<Item>`s for its dependents to hold onto.
pub fn inherited_libraries(root: &Arc<Item>) -> UpgradeMap<Label, InheritedLib> {
    let mut memo: HashMap<Label, UpgradeMap<Label, InheritedLib>> = HashMap::new();
    compute(root, &mut memo)
}

fn compute(
    root: &Arc<Item>,
    memo: &mut HashMap<Label, UpgradeMap<Label, InheritedLib>>,
) -> UpgradeMap<Label, InheritedLib> {
    let label = root.label().clone();
    if let Some(cached) = memo.get(&label) {
        return cached.clone();
    }

    let mut out: UpgradeMap<Label, InheritedLib> = UpgradeMap::new();
    // A placeholder entry breaks cycles defensively; invariant 7 forbids
    // real cycles among declared items, so this only matters if that
    // invariant is ever violated by a caller that skipped the resolver.
    memo.insert(label.clone(), out.clone());

    for (dep_item, edge_public) in linked_children(root) {
        let Some(dep_target) = dep_item.as_target() else {
            continue;
        };

        upsert_public(&mut out, dep_item.label().clone(), Arc::clone(&dep_item), edge_public);

        if dep_target.is_final() {
            // Final targets (including complete static libs, invariant 5)
            // absorb their own transitive libraries internally; dependents
            // see only the final target itself.
            continue;
        }

        let nested = compute(&dep_item, memo);
        for (nested_label, nested_entry) in nested.iter() {
            let effective_public = edge_public && nested_entry.is_public;
            upsert_public(&mut out, nested_label.clone(), Arc::clone(&nested_entry.target), effective_public);
        }
    }

    memo.insert(label, out.clone());
    out
}

/// Component H.3: flatten the subgraph reachable from `root` under `order`.
pub fn flatten(root: &Arc<Item>, order: Ordering) -> Vec<Arc<Item>> {
    match order {
        Ordering::Default => bfs(root),
        Ordering::Include => dfs(root, false, true, false),
        Ordering::Legacy => dfs(root, false, false, false),
        Ordering::Link => dfs(root, true, true, true),
    }
}

fn bfs(root: &Arc<Item>) -> Vec<Arc<Item>> {
    let mut visited: HashSet<Label> = HashSet::new();
    let mut queue: VecDeque<Arc<Item>> = VecDeque::new();
    let mut output = Vec::new();

    visited.insert(root.label().clone());
    output.push(Arc::clone(root));
    queue.push_back(Arc::clone(root));

    while let Some(node) = queue.pop_front() {
        for (child, _) in linked_children(&node) {
            if visited.insert(child.label().clone()) {
                output.push(Arc::clone(&child));
                queue.push_back(child);
            }
        }
    }
    output
}

enum Frame {
    Enter(Arc<Item>),
    Exit(Arc<Item>),
}

/// A single iterative stack-based DFS (explicit `Frame` stack, no native
/// recursion) parameterized over:
/// - `reverse_children`: visit each node's own children in reverse
///   declared order (used by `LINK`, whose traversal is the reverse of a
///   postorder computed over reverse-ordered children).
/// - `emit_after`: append a node to the output after its children
///   (postorder, `INCLUDE`/`LINK`) rather than before (preorder, `LEGACY`).
/// - `final_reverse`: reverse the whole output at the end (`LINK`).
fn dfs(root: &Arc<Item>, reverse_children: bool, emit_after: bool, final_reverse: bool) -> Vec<Arc<Item>> {
    let mut visited: HashSet<Label> = HashSet::new();
    let mut output = Vec::new();
    let mut stack = vec![Frame::Enter(Arc::clone(root))];

    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Exit(item) => output.push(item),
            Frame::Enter(item) => {
                let label = item.label().clone();
                if !visited.insert(label) {
                    continue;
                }
                if !emit_after {
                    output.push(Arc::clone(&item));
                }

                let mut children: Vec<Arc<Item>> = linked_children(&item).into_iter().map(|(c, _)| c).collect();
                if reverse_children {
                    children.reverse();
                }
                if emit_after {
                    stack.push(Frame::Exit(Arc::clone(&item)));
                }
                // Push in reverse so the stack (LIFO) pops the first
                // logical child first.
                for child in children.into_iter().rev() {
                    stack.push(Frame::Enter(child));
                }
            }
        }
    }

    if final_reverse {
        output.reverse();
    }
    output
}

/// Flattened `libs`/`lib_dirs`/`frameworks`/... for `root`, per component
/// H.4: `root`'s own merged values, then each `inherited_libraries` entry's
/// merged values in order. A final target (e.g. a shared library) never
/// appears as an entry beneath another final target — `inherited_libraries`
/// already stopped there — so this function needs no separate "terminate at
/// executables" special case.
pub fn flattened_field(root: &Arc<Item>, field: impl Fn(&Target) -> &[String]) -> Vec<String> {
    let mut out = Vec::new();
    let Some(root_target) = root.as_target() else {
        return out;
    };
    out.extend(field(root_target).iter().cloned());

    let inherited = inherited_libraries(root);
    for (_, entry) in inherited.iter() {
        if let Some(t) = entry.target.as_target() {
            out.extend(field(t).iter().cloned());
        }
    }
    out
}

/// Component H.4's `recursive_hard_deps`: every target reachable through
/// any dependency edge (including `data_deps`/`gen_deps`, unlike the
/// link-only graph `inherited_libraries` walks) whose output type must
/// finish before `root` can be built.
pub fn recursive_hard_deps(root: &Arc<Item>) -> Vec<Arc<Item>> {
    let mut visited = HashSet::new();
    let mut out = Vec::new();
    let mut stack = vec![Arc::clone(root)];
    visited.insert(root.label().clone());

    while let Some(item) = stack.pop() {
        let Item::Target(t) = item.as_ref() else { continue };
        let all_edges = t
            .public_deps
            .iter()
            .chain(t.private_deps.iter())
            .chain(t.data_deps.iter())
            .chain(t.gen_deps.iter());
        for (_, edge) in all_edges {
            let Some(dep_item) = edge.ref_.item() else { continue };
            if !visited.insert(dep_item.label().clone()) {
                continue;
            }
            if let Some(dep_target) = dep_item.as_target() {
                if dep_target.output_type.is_hard_dep_producer() {
                    out.push(Arc::clone(dep_item));
                }
            }
            stack.push(Arc::clone(dep_item));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::item::ItemCommon;
    use crate::core::settings::test_settings_arc;
    use crate::core::target::OutputType;
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

    /// Builds a straight-line dependency chain from mutable `Target`s
    /// (so callers can still push sources/libs/etc. before finalizing),
    /// wraps each in `Arc<Item>`, resolves every edge, and runs
    /// `on_resolved`. Returns the items in declaration order.
    fn chain(mut targets: Vec<Target>) -> Vec<Arc<Item>> {
        for i in 0..targets.len() - 1 {
            let next_label = targets[i + 1].label().clone();
            targets[i].add_private_dep(next_label);
        }
        let items: Vec<Arc<Item>> = targets.into_iter().map(|t| Arc::new(Item::Target(t))).collect();
        for i in 0..items.len() - 1 {
            if let Item::Target(t) = items[i].as_ref() {
                for (_, edge) in t.private_deps.iter() {
                    edge.ref_.resolve(Arc::clone(&items[i + 1]));
                }
            }
        }
        for item in &items {
            if let Item::Target(t) = item.as_ref() {
                t.on_resolved();
            }
        }
        items
    }

    #[test]
    fn shared_lib_terminates_propagation() {
        // exec A -> shared B -> static C -> source_set D, D has libs=["foo"].
        let mut d = new_target("d", OutputType::SourceSet);
        d.own_config_values.libs.push("foo".to_string());
        let items = chain(vec![
            new_target("a", OutputType::Executable),
            new_target("b", OutputType::SharedLib),
            new_target("c", OutputType::StaticLib),
            d,
        ]);

        let inherited = inherited_libraries(&items[0]);
        let labels: Vec<_> = inherited.iter().map(|(l, _)| l.display_name(false)).collect();
        assert_eq!(labels, vec!["//:b"]);

        let all_libs = flattened_field(&items[0], |t| &t.config_values().libs);
        assert!(all_libs.is_empty(), "exec terminates propagation through a shared lib");

        let all_libs_b = flattened_field(&items[1], |t| &t.config_values().libs);
        assert_eq!(all_libs_b, vec!["foo".to_string()]);
    }

    #[test]
    fn complete_static_lib_absorbs_source_set() {
        let mut c = new_target("c", OutputType::SourceSet);
        c.own_config_values.libs.push("foo".to_string());
        let mut b = new_target("b", OutputType::StaticLib);
        b.complete_static_lib = true;
        let items = chain(vec![new_target("a", OutputType::Executable), b, c]);

        let inherited = inherited_libraries(&items[0]);
        let labels: Vec<_> = inherited.iter().map(|(l, _)| l.display_name(false)).collect();
        assert_eq!(labels, vec!["//:b"]);

        let all_libs = flattened_field(&items[0], |t| &t.config_values().libs);
        assert_eq!(all_libs, vec!["foo".to_string()]);
    }

    fn dag_fixture() -> HashMap<&'static str, Arc<Item>> {
        // A -> {B, C}; B -> {E, D}; C -> {D, F}; E -> F.
        let mut targets: HashMap<&str, Target> = HashMap::new();
        for name in ["a", "b", "c", "d", "e", "f"] {
            targets.insert(name, new_target(name, OutputType::SourceSet));
        }
        targets.get_mut("a").unwrap().add_private_dep(label("b"));
        targets.get_mut("a").unwrap().add_private_dep(label("c"));
        targets.get_mut("b").unwrap().add_private_dep(label("e"));
        targets.get_mut("b").unwrap().add_private_dep(label("d"));
        targets.get_mut("c").unwrap().add_private_dep(label("d"));
        targets.get_mut("c").unwrap().add_private_dep(label("f"));
        targets.get_mut("e").unwrap().add_private_dep(label("f"));

        let items: HashMap<&str, Arc<Item>> = targets
            .into_iter()
            .map(|(name, t)| (name, Arc::new(Item::Target(t))))
            .collect();

        for item in items.values() {
            if let Item::Target(t) = item.as_ref() {
                for (dep_label, edge) in t.private_deps.iter() {
                    edge.ref_.resolve(Arc::clone(&items[dep_label.name()]));
                }
            }
        }
        for item in items.values() {
            if let Item::Target(t) = item.as_ref() {
                t.on_resolved();
            }
        }
        items
    }

    fn names_of(items: &[Arc<Item>]) -> Vec<String> {
        items.iter().map(|i| i.label().name().to_string()).collect()
    }

    #[test]
    fn default_ordering_is_breadth_first() {
        let items = dag_fixture();
        let out = flatten(&items["a"], Ordering::Default);
        assert_eq!(names_of(&out), vec!["a", "b", "c", "e", "d", "f"]);
    }

    #[test]
    fn include_ordering_is_postorder_deps_before_dependents() {
        let items = dag_fixture();
        let out = flatten(&items["a"], Ordering::Include);
        assert_eq!(names_of(&out), vec!["f", "e", "d", "b", "c", "a"]);
    }

    #[test]
    fn link_ordering_is_dependents_before_deps() {
        let items = dag_fixture();
        let out = flatten(&items["a"], Ordering::Link);
        assert_eq!(names_of(&out), vec!["a", "b", "e", "c", "d", "f"]);
    }

    #[test]
    fn legacy_ordering_is_naive_preorder() {
        let items = dag_fixture();
        let out = flatten(&items["a"], Ordering::Legacy);
        assert_eq!(names_of(&out), vec!["a", "b", "e", "f", "d", "c"]);
    }
}
