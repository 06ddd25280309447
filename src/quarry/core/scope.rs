//! Lexically nested environments. Every build file, block, template
//! invocation and target declaration evaluates inside its own `Scope`,
//! chained to a parent via `Rc` since scopes are never shared across files
//! (imports produce a merged snapshot instead, see [`crate::core::evaluator`]).

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use quarry_platform::{Atom, SourceDir};

use crate::core::settings::Settings;
use crate::core::template::TemplateDef;
use crate::core::value::Value;
use crate::util::errors::Location;

#[derive(Clone)]
struct Binding {
    value: Value,
    origin: Location,
    used: Cell<bool>,
}

/// An ordered mapping from identifier to `Value`, with an optional parent for
/// lookup fallthrough.
pub struct Scope {
    parent: Option<Rc<RefCell<Scope>>>,
    values: BTreeMap<Atom, Binding>,
    /// `template("name") { ... }` bindings. Looked up the same way as
    /// `values` (walking parents) since a template is visible anywhere the
    /// scope it was declared in is visible — importing a `.gni` merges its
    /// templates into the importer exactly like any other binding.
    templates: BTreeMap<Atom, Rc<TemplateDef>>,
    current_dir: SourceDir,
    settings: Rc<Settings>,
}

impl Scope {
    pub fn new(
        parent: Option<Rc<RefCell<Scope>>>,
        current_dir: SourceDir,
        settings: Rc<Settings>,
    ) -> Scope {
        Scope {
            parent,
            values: BTreeMap::new(),
            templates: BTreeMap::new(),
            current_dir,
            settings,
        }
    }

    /// A scope with no parent, seeded with the toolchain's settings — the
    /// root of every build-file evaluation.
    pub fn root(current_dir: SourceDir, settings: Rc<Settings>) -> Scope {
        Scope::new(None, current_dir, settings)
    }

    /// A child scope inheriting `current_dir` and `settings` from `self`.
    pub fn new_child(self_rc: &Rc<RefCell<Scope>>) -> Scope {
        let (current_dir, settings) = {
            let this = self_rc.borrow();
            (this.current_dir, Rc::clone(&this.settings))
        };
        Scope::new(Some(Rc::clone(self_rc)), current_dir, settings)
    }

    pub fn current_dir(&self) -> SourceDir {
        self.current_dir
    }

    pub fn set_current_dir(&mut self, dir: SourceDir) {
        self.current_dir = dir;
    }

    pub fn settings(&self) -> &Rc<Settings> {
        &self.settings
    }

    /// Looks up `name`, walking up through parents. Marks the binding used if
    /// found so `unused_bindings` can report dead locals at scope exit.
    pub fn get_value(&self, name: &str) -> Option<Value> {
        if let Some(binding) = self.values.get(name) {
            binding.used.set(true);
            return Some(binding.value.clone());
        }
        self.parent.as_ref().and_then(|p| p.borrow().get_value(name))
    }

    /// Like `get_value`, but does not mark the binding used — for internal
    /// bookkeeping reads that shouldn't suppress an "unused variable" report.
    pub fn peek_value(&self, name: &str) -> Option<Value> {
        if let Some(binding) = self.values.get(name) {
            return Some(binding.value.clone());
        }
        self.parent.as_ref().and_then(|p| p.borrow().peek_value(name))
    }

    /// Binds `name` to `value` at this scope's level (never a parent's),
    /// matching GN's rule that assignment always targets the innermost
    /// scope.
    pub fn set_value(&mut self, name: &str, value: Value, origin: Location) {
        self.values.insert(
            Atom::new(name),
            Binding {
                value,
                origin,
                used: Cell::new(false),
            },
        );
    }

    /// Marks `name` used without reading it — for fields the evaluator
    /// consumes structurally (e.g. `sources`) rather than through
    /// `get_value`.
    pub fn mark_used(&self, name: &str) {
        if let Some(binding) = self.values.get(name) {
            binding.used.set(true);
        }
    }

    pub fn contains_local(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn local_names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(Atom::as_str)
    }

    /// Names bound directly in this scope (not inherited) that were never
    /// read, paired with where they were assigned.
    pub fn unused_bindings(&self) -> Vec<(String, Location)> {
        self.values
            .iter()
            .filter(|(_, binding)| !binding.used.get())
            .map(|(name, binding)| (name.as_str().to_string(), binding.origin))
            .collect()
    }

    /// Merges every binding from `other` into `self`, as `import()` does with
    /// a `.gni` file's top-level scope. Names starting with `_` are private
    /// and are not merged.
    pub fn merge_importable(&mut self, other: &Scope) {
        for (name, binding) in &other.values {
            if name.as_str().starts_with('_') {
                continue;
            }
            self.values.insert(
                *name,
                Binding {
                    value: binding.value.clone(),
                    origin: binding.origin,
                    used: Cell::new(false),
                },
            );
        }
        for (name, template) in &other.templates {
            if name.as_str().starts_with('_') {
                continue;
            }
            self.templates.insert(*name, Rc::clone(template));
        }
    }

    /// Registers a `template("name") { ... }` at this scope's level.
    pub fn set_template(&mut self, name: &str, template: Rc<TemplateDef>) {
        self.templates.insert(Atom::new(name), template);
    }

    /// Looks up a template by name, walking up through parents.
    pub fn get_template(&self, name: &str) -> Option<Rc<TemplateDef>> {
        if let Some(template) = self.templates.get(name) {
            return Some(Rc::clone(template));
        }
        self.parent.as_ref().and_then(|p| p.borrow().get_template(name))
    }
}

/// Deep-copies this scope's own bindings and templates into a fresh `Scope`,
/// re-parented onto the same parent chain (cloning the `Rc` pointer, not its
/// contents — a scope's ancestors are never copied, only re-shared). This is
/// what backs `Value::Scope`'s clone: assigning a scope value copies its
/// local bindings rather than aliasing the original's `RefCell`.
impl Clone for Scope {
    fn clone(&self) -> Scope {
        Scope {
            parent: self.parent.as_ref().map(Rc::clone),
            values: self.values.clone(),
            templates: self.templates.clone(),
            current_dir: self.current_dir,
            settings: Rc::clone(&self.settings),
        }
    }
}

impl PartialEq for Scope {
    fn eq(&self, other: &Scope) -> bool {
        if self.values.len() != other.values.len() {
            return false;
        }
        self.values
            .iter()
            .all(|(name, binding)| match other.values.get(name) {
                Some(other_binding) => binding.value == other_binding.value,
                None => false,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::settings::test_settings;

    #[test]
    fn lookup_walks_up_parents() {
        let root = Rc::new(RefCell::new(Scope::root(SourceDir::root(), test_settings())));
        root.borrow_mut()
            .set_value("x", Value::Int(1), Location::new(1, 1));
        let child = Scope::new_child(&root);
        assert_eq!(child.get_value("x"), Some(Value::Int(1)));
    }

    #[test]
    fn assignment_targets_innermost_scope_only() {
        let root = Rc::new(RefCell::new(Scope::root(SourceDir::root(), test_settings())));
        let mut child = Scope::new_child(&root);
        child.set_value("x", Value::Int(2), Location::new(1, 1));
        assert!(root.borrow().get_value("x").is_none());
        assert_eq!(child.get_value("x"), Some(Value::Int(2)));
    }

    #[test]
    fn unused_binding_is_reported() {
        let mut scope = Scope::root(SourceDir::root(), test_settings());
        scope.set_value("dead", Value::Int(1), Location::new(3, 1));
        assert_eq!(scope.unused_bindings().len(), 1);
        scope.get_value("dead");
        assert!(scope.unused_bindings().is_empty());
    }
}
