//! `template("name") { ... }` bindings: a stored (AST, defining-scope)
//! pair invoked with a fresh child scope rather than a closure, so a
//! template never captures mutable parent state — only the lexical scope
//! it was declared in.

use std::cell::RefCell;
use std::rc::Rc;

use crate::core::ast::Block;
use crate::core::scope::Scope;

pub struct TemplateDef {
    pub body: Block,
    pub defining_scope: Rc<RefCell<Scope>>,
}
