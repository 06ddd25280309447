//! Component G — the dependency resolver. Runs incrementally as items are
//! declared (`on_item_declared`), and performs a final missing-item/cycle
//! sweep once the loader has drained (`check_complete`).

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use quarry_platform::Label;

use crate::core::item::{Item, ItemRef};
use crate::core::registry::{RecordState, Registry};
use crate::util::errors::{QuarryResult, ResolutionError};

/// Every label an item references, as a borrow into the item's own edge
/// fields — the walk `on_item_declared`/`retry` both perform.
fn item_refs(item: &Item) -> Vec<&ItemRef> {
    match item {
        Item::Target(t) => t
            .all_dep_edges()
            .map(|e| &e.ref_)
            .chain(t.all_config_refs())
            .chain(std::iter::once(&t.toolchain))
            .collect(),
        Item::Config(c) => c.configs.iter().map(|(_, r)| r).collect(),
        Item::Toolchain(tc) => tc.deps.iter().map(|(_, r)| r).collect(),
        Item::Pool(_) => Vec::new(),
    }
}

/// Resolves `item`'s remaining unresolved references against `registry`.
/// Returns the number still unresolved after the pass.
fn resolve_refs(registry: &Registry, from: &Label, item: &Item) -> usize {
    let mut pending = 0;
    for item_ref in item_refs(item) {
        if item_ref.is_resolved() {
            continue;
        }
        let record = registry.get_or_create(&item_ref.label, None);
        match record.item() {
            Some(found) => item_ref.resolve(Arc::clone(found)),
            None => {
                record.add_waiter(from.clone());
                pending += 1;
            }
        }
    }
    pending
}

fn finalize(item: &Item) {
    if let Item::Target(t) = item {
        t.on_resolved();
    }
}

/// Tracks, per declared label, how many of its references are still
/// unresolved. Once it hits zero the item is resolved and its waiters are
/// retried — iteratively, via a work queue, to bound recursion depth no
/// matter how deep the dependency chain runs.
pub struct Resolver {
    registry: Arc<Registry>,
    pending_counts: Mutex<HashMap<Label, usize>>,
}

impl Resolver {
    pub fn new(registry: Arc<Registry>) -> Resolver {
        Resolver {
            registry,
            pending_counts: Mutex::new(HashMap::new()),
        }
    }

    /// Call once per item, right after `Registry::declare` succeeds.
    pub fn on_item_declared(&self, item: Arc<Item>) {
        let label = item.label().clone();
        let pending = resolve_refs(&self.registry, &label, &item);
        tracing::trace!(label = %label, pending, "item declared");
        self.pending_counts.lock().unwrap().insert(label.clone(), pending);
        if pending == 0 {
            self.settle(label, item);
        }
    }

    /// Drains the resolve-then-retry-waiters loop starting from a
    /// newly-zero-pending item, iteratively rather than recursively.
    fn settle(&self, label: Label, item: Arc<Item>) {
        let mut queue: VecDeque<(Label, Arc<Item>)> = VecDeque::new();
        queue.push_back((label, item));

        while let Some((label, item)) = queue.pop_front() {
            finalize(&item);
            if let Some(record) = self.registry.get(&label) {
                record.set_state(RecordState::Resolved);
                for waiter_label in record.take_waiters() {
                    let Some(waiter_record) = self.registry.get(&waiter_label) else {
                        continue;
                    };
                    let Some(waiter_item) = waiter_record.item().cloned() else {
                        continue;
                    };
                    let remaining = resolve_refs(&self.registry, &waiter_label, &waiter_item);
                    self.pending_counts
                        .lock()
                        .unwrap()
                        .insert(waiter_label.clone(), remaining);
                    if remaining == 0 {
                        queue.push_back((waiter_label, waiter_item));
                    }
                }
            }
        }
    }

    /// Final sweep once the loader's queue is empty and no worker is still
    /// processing: every record still pending is either a missing label or
    /// part of a cycle.
    #[tracing::instrument(skip(self))]
    pub fn check_complete(&self) -> QuarryResult<()> {
        let records = self.registry.all_records();
        let unresolved: Vec<_> = records
            .iter()
            .filter(|r| r.state() != RecordState::Resolved)
            .collect();

        tracing::debug!(total = records.len(), unresolved = unresolved.len(), "final resolve sweep");
        if unresolved.is_empty() {
            return Ok(());
        }

        for record in &unresolved {
            if record.item().is_none() {
                let requested_from = record
                    .requested_from
                    .lock()
                    .unwrap()
                    .map(|l| l.to_string())
                    .unwrap_or_else(|| "<unknown>".to_string());
                return Err(ResolutionError::MissingItem {
                    label: record.label.display_name(true),
                    requested_from,
                }
                .into());
            }
        }

        if let Some(cycle) = find_cycle(&self.registry, &unresolved.iter().map(|r| r.label.clone()).collect::<Vec<_>>()) {
            return Err(ResolutionError::Cycle(cycle.iter().map(|l| l.display_name(true)).collect()).into());
        }

        // Pending but not a missing item and not a cycle shouldn't happen;
        // report it as a cycle-shaped error rather than silently passing.
        Err(ResolutionError::Cycle(
            unresolved.iter().map(|r| r.label.display_name(true)).collect(),
        )
        .into())
    }
}

/// DFS from each still-pending label over the "references" edge relation,
/// reporting the first cycle found as the ordered list of labels on it.
fn find_cycle(registry: &Registry, starts: &[Label]) -> Option<Vec<Label>> {
    for start in starts {
        let mut stack = Vec::new();
        let mut on_stack = HashSet::new();
        if let Some(cycle) = dfs(registry, start, &mut stack, &mut on_stack) {
            return Some(cycle);
        }
    }
    None
}

fn dfs(
    registry: &Registry,
    label: &Label,
    stack: &mut Vec<Label>,
    on_stack: &mut HashSet<Label>,
) -> Option<Vec<Label>> {
    if on_stack.contains(label) {
        let start = stack.iter().position(|l| l == label).unwrap_or(0);
        let mut cycle = stack[start..].to_vec();
        cycle.push(label.clone());
        return Some(cycle);
    }
    let Some(record) = registry.get(label) else {
        return None;
    };
    let Some(item) = record.item() else {
        return None;
    };

    stack.push(label.clone());
    on_stack.insert(label.clone());

    for item_ref in item_refs(item) {
        if item_ref.is_resolved() {
            continue;
        }
        if let Some(cycle) = dfs(registry, &item_ref.label, stack, on_stack) {
            return Some(cycle);
        }
    }

    stack.pop();
    on_stack.remove(label);
    None
}
