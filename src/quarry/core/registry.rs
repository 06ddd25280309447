//! Component F — the concurrent item/label registry ("Builder" in the
//! spec). Every label reference creates-or-finds a record with a null item
//! slot; every declaration completes an existing record.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use quarry_platform::Label;

use crate::core::item::Item;
use crate::util::errors::{Location, QuarryResult, ResolutionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// A reference exists but the declaring file hasn't produced the item.
    DeclaredButIncomplete,
    /// The item exists but some of its own references are still pending.
    PendingDeps,
    /// Fully resolved: the item is final and every reference it holds has
    /// been linked.
    Resolved,
}

/// One label's slot in the registry. `item` is written at most once (first
/// declaration wins; a second writer sees a `DuplicateLabel` error from
/// `try_emplace_item`). `waiters` collects labels of records that asked for
/// this one before it existed, so their resolution can be retried once it
/// does.
pub struct BuilderRecord {
    pub label: Label,
    item: OnceLock<Arc<Item>>,
    pub requested_from: Mutex<Option<Location>>,
    waiters: Mutex<Vec<Label>>,
    state: Mutex<RecordState>,
}

impl BuilderRecord {
    fn new(label: Label) -> BuilderRecord {
        BuilderRecord {
            label,
            item: OnceLock::new(),
            requested_from: Mutex::new(None),
            waiters: Mutex::new(Vec::new()),
            state: Mutex::new(RecordState::DeclaredButIncomplete),
        }
    }

    pub fn item(&self) -> Option<&Arc<Item>> {
        self.item.get()
    }

    pub fn state(&self) -> RecordState {
        *self.state.lock().unwrap()
    }

    pub fn set_state(&self, state: RecordState) {
        *self.state.lock().unwrap() = state;
    }

    pub(crate) fn add_waiter(&self, waiter: Label) {
        self.waiters.lock().unwrap().push(waiter);
    }

    /// Drains and returns the set of labels waiting on this record, so the
    /// resolver can retry them now that this record has an item.
    pub fn take_waiters(&self) -> Vec<Label> {
        std::mem::take(&mut self.waiters.lock().unwrap())
    }
}

/// The process-wide map from `Label` to `BuilderRecord`. The fast path
/// (find-or-create) only needs a shared lock over the map for the lookup
/// itself; each record's own state lives behind its own mutex so unrelated
/// labels never contend.
#[derive(Default)]
pub struct Registry {
    records: Mutex<HashMap<Label, Arc<BuilderRecord>>>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    /// Finds or creates the record for `label`. If this is the first time
    /// `label` is referenced (not declared), `requested_from` is recorded
    /// for the "missing item" diagnostic.
    pub fn get_or_create(&self, label: &Label, requested_from: Option<Location>) -> Arc<BuilderRecord> {
        let mut records = self.records.lock().unwrap();
        if let Some(record) = records.get(label) {
            return Arc::clone(record);
        }
        let record = Arc::new(BuilderRecord::new(label.clone()));
        if let Some(loc) = requested_from {
            *record.requested_from.lock().unwrap() = Some(loc);
        }
        records.insert(label.clone(), Arc::clone(&record));
        record
    }

    pub fn get(&self, label: &Label) -> Option<Arc<BuilderRecord>> {
        self.records.lock().unwrap().get(label).cloned()
    }

    /// Completes `label`'s record with a freshly declared item. Fails with
    /// `DuplicateLabel` if the label already has an item (invariant 1).
    pub fn declare(&self, label: &Label, item: Arc<Item>) -> QuarryResult<Arc<BuilderRecord>> {
        let record = self.get_or_create(label, None);
        record.item.set(item).map_err(|_| {
            anyhow::Error::new(ResolutionError::DuplicateLabel {
                label: label.display_name(true),
                first_location: "a previous declaration".to_string(),
            })
        })?;
        record.set_state(RecordState::PendingDeps);
        Ok(record)
    }

    pub fn all_records(&self) -> Vec<Arc<BuilderRecord>> {
        self.records.lock().unwrap().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::item::{Item, ItemCommon};
    use crate::core::settings::test_settings_arc;
    use crate::core::toolchain::Pool;
    use crate::util::errors::Location;
    use quarry_platform::SourceDir;
    use std::sync::Arc;

    fn label(name: &str) -> Label {
        Label::new(SourceDir::root(), name, None)
    }

    fn dummy_item(label: Label) -> Arc<Item> {
        Arc::new(Item::Pool(Pool::new(
            ItemCommon {
                label,
                settings: test_settings_arc(),
                defined_from: Location::new(1, 1),
                defined_in: Default::default(),
                build_dependency_files: Vec::new(),
            },
            1,
        )))
    }

    #[test]
    fn redeclaring_a_label_is_an_error() {
        let registry = Registry::new();
        let l = label("foo");
        registry.declare(&l, dummy_item(l.clone())).unwrap();
        assert!(registry.declare(&l, dummy_item(l.clone())).is_err());
    }

    #[test]
    fn reference_before_declaration_creates_pending_record() {
        let registry = Registry::new();
        let l = label("foo");
        let record = registry.get_or_create(&l, Some(Location::new(2, 1)));
        assert_eq!(record.state(), RecordState::DeclaredButIncomplete);
        assert!(record.item().is_none());
    }
}
