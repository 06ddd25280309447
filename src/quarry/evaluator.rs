//! Component D — the scope-walking evaluator. Parses a build file, executes
//! its statements against a [`Scope`], and turns target/config/toolchain/
//! pool declarations into [`Item`]s fed to the registry and resolver.
//!
//! Shared across every worker thread the loader spawns (`registry`,
//! `resolver`, `defaults` and `imported` are all thread-safe), but the
//! `Scope` trees it builds for any one file are `Rc`-based and never cross a
//! thread boundary, matching "scopes are never shared across files".

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Command;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use quarry_platform::{Atom, Label, SourceDir, SourceFile};

use crate::core::ast::{AssignOp, BinaryOp, Block, ConditionNode, Expr, Literal, Statement, UnaryOp};
use crate::core::config_item::Config;
use crate::core::config_values::ConfigValues;
use crate::core::item::{Item, ItemCommon};
use crate::core::label_pattern::{filter_labels, label_matches, LabelPattern};
use crate::core::parser::parse_file;
use crate::core::registry::Registry;
use crate::core::resolver::Resolver;
use crate::core::scope::Scope;
use crate::core::target::{OutputType, Target};
use crate::core::template::TemplateDef;
use crate::core::toolchain::{Pool, Tool, Toolchain};
use crate::core::value::Value;
use crate::util::errors::{DiagnosticError, Location, QuarryResult};

/// The context threaded through every scope the evaluator creates: the
/// registry/resolver it feeds, `set_defaults` bodies recorded so far, and a
/// dedup set guaranteeing each file is imported at most once per toolchain.
pub struct Evaluator {
    pub registry: Arc<Registry>,
    pub resolver: Arc<Resolver>,
    source_root: PathBuf,
    /// `set_defaults("<builtin name>") { ... }` bodies, replayed into a
    /// fresh target scope before the target's own block runs, so ordinary
    /// assignment semantics let the block override any default.
    defaults: Mutex<HashMap<String, Block>>,
    imported: Mutex<std::collections::HashSet<(SourceFile, Label)>>,
}

impl Evaluator {
    pub fn new(registry: Arc<Registry>, resolver: Arc<Resolver>, source_root: PathBuf) -> Evaluator {
        Evaluator {
            registry,
            resolver,
            source_root,
            defaults: Mutex::new(HashMap::new()),
            imported: Mutex::new(std::collections::HashSet::new()),
        }
    }

    /// Parses `source` and executes it at top level in `scope`.
    pub fn eval_file(&self, file: SourceFile, source: &str, scope: &Rc<RefCell<Scope>>) -> QuarryResult<()> {
        let path = PathBuf::from(file.as_str());
        let block = parse_file(&path, source)?;
        self.exec_block(&block, file, scope)
    }

    pub fn exec_block(&self, block: &Block, file: SourceFile, scope: &Rc<RefCell<Scope>>) -> QuarryResult<()> {
        for stmt in &block.statements {
            self.exec_statement(stmt, file, scope)?;
        }
        Ok(())
    }

    fn exec_statement(&self, stmt: &Statement, file: SourceFile, scope: &Rc<RefCell<Scope>>) -> QuarryResult<()> {
        match stmt {
            Statement::Assignment { target, op, value, location } => {
                self.exec_assignment(target, *op, value, *location, file, scope)
            }
            Statement::Call { name, args, block, location } => {
                self.exec_call(name, args, block.as_ref(), *location, file, scope)
            }
            Statement::Condition(cond) => self.exec_condition(cond, file, scope),
            Statement::Foreach { variable, list, body, location } => {
                self.exec_foreach(variable, list, body, *location, file, scope)
            }
            Statement::Expression(expr) => {
                self.eval_expr(expr, file, scope)?;
                Ok(())
            }
        }
    }

    fn exec_condition(&self, cond: &ConditionNode, file: SourceFile, scope: &Rc<RefCell<Scope>>) -> QuarryResult<()> {
        // `if`/`else` share the enclosing scope rather than a child one:
        // assignments made inside are meant to be visible after the block,
        // the way `if (is_foo) { defines += ["FOO"] }` relies on.
        let cond_value = self.eval_expr(&cond.condition, file, scope)?;
        if cond_value.as_bool(cond.location)? {
            self.exec_block(&cond.then_block, file, scope)
        } else if let Some(else_block) = &cond.else_block {
            self.exec_block(else_block, file, scope)
        } else {
            Ok(())
        }
    }

    fn exec_foreach(
        &self,
        variable: &str,
        list: &Expr,
        body: &Block,
        location: Location,
        file: SourceFile,
        scope: &Rc<RefCell<Scope>>,
    ) -> QuarryResult<()> {
        let items = self.eval_expr(list, file, scope)?.as_list(location)?.to_vec();
        for item in items {
            scope.borrow_mut().set_value(variable, item, location);
            self.exec_block(body, file, scope)?;
        }
        Ok(())
    }

    fn exec_assignment(
        &self,
        target: &Expr,
        op: AssignOp,
        value_expr: &Expr,
        location: Location,
        file: SourceFile,
        scope: &Rc<RefCell<Scope>>,
    ) -> QuarryResult<()> {
        let name = match target {
            Expr::Identifier(name, _) => name.clone(),
            other => {
                return Err(self.err(file, other.location(), "left-hand side of an assignment must be a plain identifier"))
            }
        };
        let rhs = self.eval_expr(value_expr, file, scope)?;
        let new_value = match op {
            AssignOp::Assign => rhs,
            AssignOp::AppendAssign => {
                let current = scope.borrow().get_value(&name);
                combine_append(current, rhs, location)?
            }
            AssignOp::RemoveAssign => {
                let current = scope
                    .borrow()
                    .get_value(&name)
                    .ok_or_else(|| self.err(file, location, format!("cannot -= undefined variable `{}`", name)))?;
                combine_remove(current, rhs, location)?
            }
        };
        scope.borrow_mut().set_value(&name, new_value, location);
        Ok(())
    }

    fn eval_expr(&self, expr: &Expr, file: SourceFile, scope: &Rc<RefCell<Scope>>) -> QuarryResult<Value> {
        match expr {
            Expr::Literal(lit, _) => Ok(literal_to_value(lit)),
            Expr::Identifier(name, loc) => scope
                .borrow()
                .get_value(name)
                .ok_or_else(|| self.err(file, *loc, format!("undefined identifier `{}`", name))),
            Expr::List(items, _) => {
                let values = items
                    .iter()
                    .map(|e| self.eval_expr(e, file, scope))
                    .collect::<QuarryResult<Vec<_>>>()?;
                Ok(Value::List(values))
            }
            Expr::BinaryOp { op, lhs, rhs, location } => self.eval_binary(*op, lhs, rhs, *location, file, scope),
            Expr::UnaryOp { op, operand, location } => self.eval_unary(*op, operand, *location, file, scope),
            Expr::MemberAccessor { base, member, location } => {
                let base_value = self.eval_expr(base, file, scope)?;
                let base_scope = base_value.as_scope(*location)?;
                let value = base_scope.borrow().get_value(member);
                value.ok_or_else(|| self.err(file, *location, format!("no member `{}` in this scope", member)))
            }
            Expr::IndexAccessor { base, index, location } => {
                let base_value = self.eval_expr(base, file, scope)?;
                let list = base_value.as_list(*location)?;
                let idx = self.eval_expr(index, file, scope)?.as_int(*location)?;
                if idx < 0 || idx as usize >= list.len() {
                    return Err(self.err(file, *location, format!("index {} out of range (length {})", idx, list.len())));
                }
                Ok(list[idx as usize].clone())
            }
            Expr::FunctionCall { name, args, location, .. } => self
                .call_value_builtin(name, args, *location, file, scope)?
                .ok_or_else(|| self.err(file, *location, format!("unknown function `{}`", name))),
        }
    }

    fn eval_binary(
        &self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        location: Location,
        file: SourceFile,
        scope: &Rc<RefCell<Scope>>,
    ) -> QuarryResult<Value> {
        if matches!(op, BinaryOp::And | BinaryOp::Or) {
            let l = self.eval_expr(lhs, file, scope)?.as_bool(location)?;
            return match op {
                BinaryOp::And if !l => Ok(Value::Bool(false)),
                BinaryOp::Or if l => Ok(Value::Bool(true)),
                _ => {
                    let r = self.eval_expr(rhs, file, scope)?.as_bool(location)?;
                    Ok(Value::Bool(r))
                }
            };
        }

        let l = self.eval_expr(lhs, file, scope)?;
        let r = self.eval_expr(rhs, file, scope)?;
        match op {
            BinaryOp::Add => match (&l, &r) {
                (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a + b)),
                (Value::List(a), Value::List(b)) => {
                    let mut combined = a.clone();
                    combined.extend(b.iter().cloned());
                    Ok(Value::List(combined))
                }
                _ => Ok(Value::Str(format!("{}{}", l.display_unquoted(), r.display_unquoted()))),
            },
            BinaryOp::Sub => Ok(Value::Int(l.as_int(location)? - r.as_int(location)?)),
            BinaryOp::Eq => Ok(Value::Bool(l == r)),
            BinaryOp::NotEq => Ok(Value::Bool(l != r)),
            BinaryOp::Less => Ok(Value::Bool(l.as_int(location)? < r.as_int(location)?)),
            BinaryOp::LessEq => Ok(Value::Bool(l.as_int(location)? <= r.as_int(location)?)),
            BinaryOp::Greater => Ok(Value::Bool(l.as_int(location)? > r.as_int(location)?)),
            BinaryOp::GreaterEq => Ok(Value::Bool(l.as_int(location)? >= r.as_int(location)?)),
            BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
        }
    }

    fn eval_unary(
        &self,
        op: UnaryOp,
        operand: &Expr,
        location: Location,
        file: SourceFile,
        scope: &Rc<RefCell<Scope>>,
    ) -> QuarryResult<Value> {
        let v = self.eval_expr(operand, file, scope)?;
        match op {
            UnaryOp::Not => Ok(Value::Bool(!v.as_bool(location)?)),
            UnaryOp::Neg => Ok(Value::Int(-v.as_int(location)?)),
        }
    }

    // --- statement-shaped calls (declarations, built-ins with side effects) ---

    fn exec_call(
        &self,
        name: &str,
        args: &[Expr],
        block: Option<&Block>,
        location: Location,
        file: SourceFile,
        scope: &Rc<RefCell<Scope>>,
    ) -> QuarryResult<()> {
        if let Some(output_type) = OutputType::from_builtin_name(name) {
            return self.declare_target(output_type, args, block, location, file, scope);
        }
        match name {
            "config" => self.declare_config(args, block, location, file, scope),
            "toolchain" => self.declare_toolchain(args, block, location, file, scope),
            "pool" => self.declare_pool(args, block, location, file, scope),
            "template" => self.declare_template(args, block, file, scope),
            "declare_args" => self.exec_declare_args(block, location, file, scope),
            "set_defaults" => self.exec_set_defaults(args, block, location, file, scope),
            "import" => {
                let path = self.single_string_arg(args, file, scope, "import")?;
                self.do_import(&path, location, file, scope)
            }
            "write_file" => self.exec_write_file(args, location, file, scope),
            "assert" => self.exec_assert(args, location, file, scope),
            "print" => self.exec_print(args, file, scope),
            "tool" => Err(self.err(file, location, "tool() is only valid inside a toolchain() block")),
            _ => {
                if let Some(template) = scope.borrow().get_template(name) {
                    return self.invoke_template(&template, args, block, location, file, scope);
                }
                if let Some(value) = self.call_value_builtin(name, args, location, file, scope)? {
                    let _ = value;
                    return Ok(());
                }
                Err(self.err(file, location, format!("unknown function `{}`", name)))
            }
        }
    }

    fn exec_assert(&self, args: &[Expr], location: Location, file: SourceFile, scope: &Rc<RefCell<Scope>>) -> QuarryResult<()> {
        if args.is_empty() || args.len() > 2 {
            return Err(self.err(file, location, "assert() takes one or two arguments"));
        }
        let ok = self.eval_expr(&args[0], file, scope)?.is_truthy();
        if ok {
            return Ok(());
        }
        let message = if args.len() > 1 {
            self.eval_expr(&args[1], file, scope)?.display_unquoted()
        } else {
            "assertion failed".to_string()
        };
        Err(self.err(file, location, message))
    }

    fn exec_print(&self, args: &[Expr], file: SourceFile, scope: &Rc<RefCell<Scope>>) -> QuarryResult<()> {
        let parts = args
            .iter()
            .map(|a| self.eval_expr(a, file, scope).map(|v| v.display_unquoted()))
            .collect::<QuarryResult<Vec<_>>>()?;
        println!("{}", parts.join(" "));
        Ok(())
    }

    fn exec_write_file(&self, args: &[Expr], location: Location, file: SourceFile, scope: &Rc<RefCell<Scope>>) -> QuarryResult<()> {
        if args.len() != 2 {
            return Err(self.err(file, location, "write_file() takes exactly 2 arguments"));
        }
        let current_dir = scope.borrow().current_dir();
        let path_str = self.eval_expr(&args[0], file, scope)?.as_str(location)?.to_string();
        let contents_value = self.eval_expr(&args[1], file, scope)?;
        let contents = match &contents_value {
            Value::Str(s) => s.clone(),
            Value::List(items) => {
                let mut s = String::new();
                for item in items {
                    s.push_str(&item.display_unquoted());
                    s.push('\n');
                }
                s
            }
            other => other.display_unquoted(),
        };
        let target = SourceFile::from_relative(&current_dir, &path_str);
        let physical = self.to_physical_file(&target);
        if let Some(parent) = physical.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| self.err(file, location, format!("couldn't create {}: {}", parent.display(), e)))?;
        }
        std::fs::write(&physical, contents)
            .map_err(|e| self.err(file, location, format!("couldn't write {}: {}", target, e)))?;
        Ok(())
    }

    fn exec_declare_args(&self, block: Option<&Block>, location: Location, file: SourceFile, scope: &Rc<RefCell<Scope>>) -> QuarryResult<()> {
        let block = block.ok_or_else(|| self.err(file, location, "declare_args() requires a block"))?;
        let args_scope = Rc::new(RefCell::new(Scope::new_child(scope)));
        self.exec_block(block, file, &args_scope)?;

        let overrides = scope.borrow().settings().build_settings.args.clone();
        let names: Vec<String> = args_scope.borrow().local_names().map(str::to_string).collect();
        for name in names {
            let default = args_scope.borrow().peek_value(&name).expect("just listed as a local name");
            let value = match overrides.iter().find(|(k, _)| k == &name) {
                Some((_, raw)) => coerce_arg_override(raw, &default),
                None => default,
            };
            scope.borrow_mut().set_value(&name, value, location);
        }
        Ok(())
    }

    fn exec_set_defaults(
        &self,
        args: &[Expr],
        block: Option<&Block>,
        location: Location,
        file: SourceFile,
        scope: &Rc<RefCell<Scope>>,
    ) -> QuarryResult<()> {
        let target_type = self.single_string_arg(args, file, scope, "set_defaults")?;
        if OutputType::from_builtin_name(&target_type).is_none() {
            return Err(self.err(file, location, format!("set_defaults: `{}` is not a target type", target_type)));
        }
        let block = block.ok_or_else(|| self.err(file, location, "set_defaults() requires a block"))?;
        self.defaults.lock().unwrap().insert(target_type, block.clone());
        Ok(())
    }

    fn do_import(&self, path_str: &str, location: Location, file: SourceFile, scope: &Rc<RefCell<Scope>>) -> QuarryResult<()> {
        let (current_dir, settings) = {
            let s = scope.borrow();
            (s.current_dir(), Rc::clone(s.settings()))
        };
        let import_file = SourceFile::from_relative(&current_dir, path_str);
        let key = (import_file, settings.toolchain_label.as_ref().clone());
        if !self.imported.lock().unwrap().insert(key) {
            return Ok(());
        }

        let physical = self.to_physical_file(&import_file);
        let source = std::fs::read_to_string(&physical)
            .map_err(|e| self.err(file, location, format!("couldn't read {}: {}", import_file, e)))?;

        let import_scope = Rc::new(RefCell::new(Scope::new(None, import_file.dir(), Rc::clone(&settings))));
        self.eval_file(import_file, &source, &import_scope)?;
        scope.borrow_mut().merge_importable(&import_scope.borrow());
        Ok(())
    }

    // --- target/config/toolchain/pool declarations ---

    fn declare_target(
        &self,
        output_type: OutputType,
        args: &[Expr],
        block: Option<&Block>,
        location: Location,
        file: SourceFile,
        scope: &Rc<RefCell<Scope>>,
    ) -> QuarryResult<()> {
        let target_name = self.single_string_arg(args, file, scope, output_type.builtin_name())?;
        let block = block
            .ok_or_else(|| self.err(file, location, format!("{}(\"{}\") requires a block", output_type.builtin_name(), target_name)))?;

        let (current_dir, settings) = {
            let s = scope.borrow();
            (s.current_dir(), Rc::clone(s.settings()))
        };
        let toolchain_label = Arc::clone(&settings.toolchain_label);
        let label = Label::new(current_dir, &target_name, Some(Arc::clone(&toolchain_label)));

        let target_scope = Rc::new(RefCell::new(Scope::new_child(scope)));
        if let Some(default_block) = self.defaults.lock().unwrap().get(output_type.builtin_name()).cloned() {
            self.exec_block(&default_block, file, &target_scope)?;
        }
        self.exec_block(block, file, &target_scope)?;

        let mut target = Target::new(
            ItemCommon {
                label: label.clone(),
                settings: Arc::new(settings.as_ref().clone()),
                defined_from: location,
                defined_in: PathBuf::from(file.as_str()),
                build_dependency_files: vec![file],
            },
            output_type,
            toolchain_label.as_ref().clone(),
        );

        self.apply_common_target_fields(&mut target, &target_scope, file, current_dir, &toolchain_label, location)?;
        if output_type == OutputType::StaticLib {
            if let Some(v) = target_scope.borrow().get_value("complete_static_lib") {
                target.complete_static_lib = v.as_bool(location)?;
            }
        }
        if matches!(output_type, OutputType::RustLibrary | OutputType::RustProcMacro) {
            self.apply_rust_fields(&mut target, &target_scope, file, current_dir, &toolchain_label, location)?;
        }

        self.report_unused(file, &target_scope)?;

        let item = Arc::new(Item::Target(target));
        self.registry.declare(&label, Arc::clone(&item))?;
        self.resolver.on_item_declared(item);
        Ok(())
    }

    fn apply_common_target_fields(
        &self,
        target: &mut Target,
        scope: &Rc<RefCell<Scope>>,
        file: SourceFile,
        current_dir: SourceDir,
        toolchain_label: &Arc<Label>,
        location: Location,
    ) -> QuarryResult<()> {
        let s = scope.borrow();

        if let Some(v) = s.get_value("sources") {
            for f in v.into_string_list(location)? {
                target.sources.push_back_if_unique(SourceFile::from_relative(&current_dir, &f));
            }
        }
        if let Some(v) = s.get_value("public") {
            for f in v.into_string_list(location)? {
                target.public_headers.push_back_if_unique(SourceFile::from_relative(&current_dir, &f));
            }
        }
        if let Some(v) = s.get_value("inputs") {
            for f in v.into_string_list(location)? {
                target.inputs.push_back_if_unique(SourceFile::from_relative(&current_dir, &f));
            }
        }
        if let Some(v) = s.get_value("data") {
            for f in v.into_string_list(location)? {
                target.data.push_back_if_unique(SourceFile::from_relative(&current_dir, &f));
            }
        }

        if let Some(v) = s.get_value("deps") {
            for label_str in v.into_string_list(location)? {
                let dep = Label::parse(&current_dir, Some(toolchain_label), &label_str)
                    .map_err(|e| self.err(file, location, e.to_string()))?;
                target.add_private_dep(dep);
            }
        }
        if let Some(v) = s.get_value("public_deps") {
            for label_str in v.into_string_list(location)? {
                let dep = Label::parse(&current_dir, Some(toolchain_label), &label_str)
                    .map_err(|e| self.err(file, location, e.to_string()))?;
                target.add_public_dep(dep);
            }
        }
        if let Some(v) = s.get_value("data_deps") {
            for label_str in v.into_string_list(location)? {
                let dep = Label::parse(&current_dir, Some(toolchain_label), &label_str)
                    .map_err(|e| self.err(file, location, e.to_string()))?;
                target.add_data_dep(dep);
            }
        }
        if let Some(v) = s.get_value("gen_deps") {
            for label_str in v.into_string_list(location)? {
                let dep = Label::parse(&current_dir, Some(toolchain_label), &label_str)
                    .map_err(|e| self.err(file, location, e.to_string()))?;
                target.add_gen_dep(dep);
            }
        }

        if let Some(v) = s.get_value("configs") {
            for label_str in v.into_string_list(location)? {
                let c = Label::parse(&current_dir, Some(toolchain_label), &label_str)
                    .map_err(|e| self.err(file, location, e.to_string()))?;
                target.add_config(c);
            }
        }
        if let Some(v) = s.get_value("public_configs") {
            for label_str in v.into_string_list(location)? {
                let c = Label::parse(&current_dir, Some(toolchain_label), &label_str)
                    .map_err(|e| self.err(file, location, e.to_string()))?;
                target.add_public_config(c);
            }
        }
        if let Some(v) = s.get_value("all_dependent_configs") {
            for label_str in v.into_string_list(location)? {
                let c = Label::parse(&current_dir, Some(toolchain_label), &label_str)
                    .map_err(|e| self.err(file, location, e.to_string()))?;
                target.add_all_dependent_config(c);
            }
        }

        if let Some(v) = s.get_value("visibility") {
            let mut patterns = Vec::new();
            for p in v.into_string_list(location)? {
                patterns.push(
                    LabelPattern::parse(&current_dir, Some(toolchain_label), &p)
                        .map_err(|e| self.err(file, location, e.to_string()))?,
                );
            }
            target.visibility = patterns;
        }
        if let Some(v) = s.get_value("testonly") {
            target.testonly = v.as_bool(location)?;
        }
        if let Some(v) = s.get_value("all_headers_public") {
            target.all_headers_public = v.as_bool(location)?;
        }

        drop(s);
        apply_config_value_fields(&mut target.own_config_values, scope, location)?;
        Ok(())
    }

    fn apply_rust_fields(
        &self,
        target: &mut Target,
        scope: &Rc<RefCell<Scope>>,
        file: SourceFile,
        current_dir: SourceDir,
        toolchain_label: &Arc<Label>,
        location: Location,
    ) -> QuarryResult<()> {
        let s = scope.borrow();
        if let Some(v) = s.get_value("crate_name") {
            target.crate_name = Some(v.as_str(location)?.to_string());
        }
        if let Some(v) = s.get_value("crate_root") {
            target.crate_root = Some(SourceFile::from_relative(&current_dir, v.as_str(location)?));
        }
        if let Some(v) = s.get_value("crate_type") {
            target.crate_type = Some(v.as_str(location)?.to_string());
        }
        if let Some(v) = s.get_value("aliased_deps") {
            let aliased_scope = v.as_scope(location)?;
            let names: Vec<String> = aliased_scope.borrow().local_names().map(str::to_string).collect();
            for crate_name in names {
                let label_str = aliased_scope
                    .borrow()
                    .peek_value(&crate_name)
                    .expect("just listed as a local name")
                    .as_str(location)?
                    .to_string();
                let label = Label::parse(&current_dir, Some(toolchain_label), &label_str)
                    .map_err(|e| self.err(file, location, e.to_string()))?;
                target.aliased_deps.push(crate::core::target::AliasedDep { crate_name, label });
            }
        }
        Ok(())
    }

    fn declare_config(
        &self,
        args: &[Expr],
        block: Option<&Block>,
        location: Location,
        file: SourceFile,
        scope: &Rc<RefCell<Scope>>,
    ) -> QuarryResult<()> {
        let name = self.single_string_arg(args, file, scope, "config")?;
        let block = block.ok_or_else(|| self.err(file, location, "config() requires a block"))?;

        let (current_dir, settings) = {
            let s = scope.borrow();
            (s.current_dir(), Rc::clone(s.settings()))
        };
        let toolchain_label = Arc::clone(&settings.toolchain_label);
        let label = Label::new(current_dir, &name, Some(Arc::clone(&toolchain_label)));

        let config_scope = Rc::new(RefCell::new(Scope::new_child(scope)));
        self.exec_block(block, file, &config_scope)?;

        let mut values = ConfigValues::new();
        apply_config_value_fields(&mut values, &config_scope, location)?;

        let mut config = Config::new(ItemCommon {
            label: label.clone(),
            settings: Arc::new(settings.as_ref().clone()),
            defined_from: location,
            defined_in: PathBuf::from(file.as_str()),
            build_dependency_files: vec![file],
        });
        config.config_values = values;
        if let Some(v) = config_scope.borrow().get_value("configs") {
            for label_str in v.into_string_list(location)? {
                let sub = Label::parse(&current_dir, Some(&toolchain_label), &label_str)
                    .map_err(|e| self.err(file, location, e.to_string()))?;
                crate::core::item::push_ref(&mut config.configs, sub);
            }
        }

        self.report_unused(file, &config_scope)?;

        let item = Arc::new(Item::Config(config));
        self.registry.declare(&label, Arc::clone(&item))?;
        self.resolver.on_item_declared(item);
        Ok(())
    }

    fn declare_pool(
        &self,
        args: &[Expr],
        block: Option<&Block>,
        location: Location,
        file: SourceFile,
        scope: &Rc<RefCell<Scope>>,
    ) -> QuarryResult<()> {
        let name = self.single_string_arg(args, file, scope, "pool")?;
        let block = block.ok_or_else(|| self.err(file, location, "pool() requires a block"))?;

        let (current_dir, settings) = {
            let s = scope.borrow();
            (s.current_dir(), Rc::clone(s.settings()))
        };
        let label = Label::new(current_dir, &name, Some(Arc::clone(&settings.toolchain_label)));

        let pool_scope = Rc::new(RefCell::new(Scope::new_child(scope)));
        self.exec_block(block, file, &pool_scope)?;
        let depth = pool_scope
            .borrow()
            .get_value("depth")
            .ok_or_else(|| self.err(file, location, "pool() requires `depth`"))?
            .as_int(location)? as u32;
        self.report_unused(file, &pool_scope)?;

        let item = Arc::new(Item::Pool(Pool::new(
            ItemCommon {
                label: label.clone(),
                settings: Arc::new(settings.as_ref().clone()),
                defined_from: location,
                defined_in: PathBuf::from(file.as_str()),
                build_dependency_files: vec![file],
            },
            depth,
        )));
        self.registry.declare(&label, Arc::clone(&item))?;
        self.resolver.on_item_declared(item);
        Ok(())
    }

    fn declare_toolchain(
        &self,
        args: &[Expr],
        block: Option<&Block>,
        location: Location,
        file: SourceFile,
        scope: &Rc<RefCell<Scope>>,
    ) -> QuarryResult<()> {
        let name = self.single_string_arg(args, file, scope, "toolchain")?;
        let block = block.ok_or_else(|| self.err(file, location, "toolchain() requires a block"))?;

        let (current_dir, settings) = {
            let s = scope.borrow();
            (s.current_dir(), Rc::clone(s.settings()))
        };
        let label = Label::new(current_dir, &name, None);

        let toolchain_scope = Rc::new(RefCell::new(Scope::new_child(scope)));
        let mut tools = HashMap::new();
        for stmt in &block.statements {
            if let Statement::Call { name: call_name, args: call_args, block: call_block, location: call_loc } = stmt {
                if call_name == "tool" {
                    let tool = self.build_tool(call_args, call_block.as_ref(), *call_loc, file, &toolchain_scope, current_dir)?;
                    tools.insert(Atom::new(&tool.name), tool);
                    continue;
                }
            }
            self.exec_statement(stmt, file, &toolchain_scope)?;
        }

        let mut toolchain = Toolchain::new(ItemCommon {
            label: label.clone(),
            settings: Arc::new(settings.as_ref().clone()),
            defined_from: location,
            defined_in: PathBuf::from(file.as_str()),
            build_dependency_files: vec![file],
        });
        toolchain.tools = tools;
        if let Some(v) = toolchain_scope.borrow().get_value("deps") {
            for label_str in v.into_string_list(location)? {
                let dep = Label::parse(&current_dir, None, &label_str).map_err(|e| self.err(file, location, e.to_string()))?;
                crate::core::item::push_ref(&mut toolchain.deps, dep);
            }
        }
        if let Some(v) = toolchain_scope.borrow().get_value("concurrent_links") {
            toolchain.concurrent_links = Some(v.as_int(location)? as u32);
        }
        self.report_unused(file, &toolchain_scope)?;

        let item = Arc::new(Item::Toolchain(toolchain));
        self.registry.declare(&label, Arc::clone(&item))?;
        self.resolver.on_item_declared(item);
        Ok(())
    }

    fn build_tool(
        &self,
        args: &[Expr],
        block: Option<&Block>,
        location: Location,
        file: SourceFile,
        parent_scope: &Rc<RefCell<Scope>>,
        current_dir: SourceDir,
    ) -> QuarryResult<Tool> {
        let name = self.single_string_arg(args, file, parent_scope, "tool")?;
        let block = block.ok_or_else(|| self.err(file, location, "tool() requires a block"))?;
        let tool_scope = Rc::new(RefCell::new(Scope::new_child(parent_scope)));
        self.exec_block(block, file, &tool_scope)?;

        let mut tool = Tool::new(name);
        let s = tool_scope.borrow();
        if let Some(v) = s.get_value("command") {
            tool.command = v.as_str(location)?.to_string();
        }
        if let Some(v) = s.get_value("description") {
            tool.description = Some(v.as_str(location)?.to_string());
        }
        if let Some(v) = s.get_value("depfile") {
            tool.depfile = Some(v.as_str(location)?.to_string());
        }
        if let Some(v) = s.get_value("outputs") {
            tool.outputs = v.into_string_list(location)?;
        }
        if let Some(v) = s.get_value("rspfile") {
            tool.rspfile = Some(v.as_str(location)?.to_string());
        }
        if let Some(v) = s.get_value("rspfile_content") {
            tool.rspfile_content = Some(v.as_str(location)?.to_string());
        }
        if let Some(v) = s.get_value("restat") {
            tool.restat = v.as_bool(location)?;
        }
        if let Some(v) = s.get_value("pool") {
            let pool_label = Label::parse(&current_dir, None, v.as_str(location)?).map_err(|e| self.err(file, location, e.to_string()))?;
            tool.pool = Some(pool_label);
        }
        Ok(tool)
    }

    fn declare_template(&self, args: &[Expr], block: Option<&Block>, file: SourceFile, scope: &Rc<RefCell<Scope>>) -> QuarryResult<()> {
        let name = self.single_string_arg(args, file, scope, "template")?;
        let loc = args.first().map(|a| a.location()).unwrap_or(Location::new(1, 1));
        let body = block.ok_or_else(|| self.err(file, loc, "template() requires a block"))?.clone();
        scope.borrow_mut().set_template(
            &name,
            Rc::new(TemplateDef {
                body,
                defining_scope: Rc::clone(scope),
            }),
        );
        Ok(())
    }

    fn invoke_template(
        &self,
        def: &Rc<TemplateDef>,
        args: &[Expr],
        block: Option<&Block>,
        location: Location,
        file: SourceFile,
        call_scope: &Rc<RefCell<Scope>>,
    ) -> QuarryResult<()> {
        let target_name = self.single_string_arg(args, file, call_scope, "template invocation")?;

        let invoker_scope = Rc::new(RefCell::new(Scope::new_child(call_scope)));
        if let Some(block) = block {
            self.exec_block(block, file, &invoker_scope)?;
        }

        // The template body's scope parents off the *defining* scope (so it
        // sees whatever else was visible where the template was declared),
        // but its `current_dir` is the call site's — a template invoked from
        // many directories always declares its targets relative to the
        // caller, never to wherever the `.gni` that defined it lives.
        let template_scope = Rc::new(RefCell::new(Scope::new_child(&def.defining_scope)));
        let call_dir = call_scope.borrow().current_dir();
        template_scope.borrow_mut().set_current_dir(call_dir);
        template_scope
            .borrow_mut()
            .set_value("target_name", Value::from(target_name), location);
        template_scope
            .borrow_mut()
            .set_value("invoker", Value::Scope(Rc::clone(&invoker_scope)), location);

        self.exec_block(&def.body, file, &template_scope)
    }

    // --- value-returning built-ins ---

    fn call_value_builtin(
        &self,
        name: &str,
        args: &[Expr],
        location: Location,
        file: SourceFile,
        scope: &Rc<RefCell<Scope>>,
    ) -> QuarryResult<Option<Value>> {
        match name {
            "defined" => Ok(Some(self.builtin_defined(args, location, file, scope)?)),
            "get_label_info" => Ok(Some(self.builtin_get_label_info(args, location, file, scope)?)),
            "get_target_outputs" => Ok(Some(self.builtin_get_target_outputs(args, location, file, scope)?)),
            "label_matches" => Ok(Some(self.builtin_label_matches(args, location, file, scope)?)),
            "filter_labels" => Ok(Some(self.builtin_filter_labels(args, location, file, scope)?)),
            "read_file" => Ok(Some(self.builtin_read_file(args, location, file, scope)?)),
            "exec_script" => Ok(Some(self.builtin_exec_script(args, location, file, scope)?)),
            _ => Ok(None),
        }
    }

    fn builtin_defined(&self, args: &[Expr], location: Location, file: SourceFile, scope: &Rc<RefCell<Scope>>) -> QuarryResult<Value> {
        if args.len() != 1 {
            return Err(self.err(file, location, "defined() takes exactly 1 argument"));
        }
        match &args[0] {
            Expr::Identifier(name, _) => Ok(Value::from(scope.borrow().peek_value(name).is_some())),
            Expr::MemberAccessor { base, member, location: loc } => {
                let base_value = self.eval_expr(base, file, scope)?;
                let base_scope = base_value.as_scope(*loc)?;
                Ok(Value::from(base_scope.borrow().peek_value(member).is_some()))
            }
            other => Err(self.err(file, other.location(), "defined() takes an identifier or `scope.name`")),
        }
    }

    fn builtin_get_label_info(&self, args: &[Expr], location: Location, file: SourceFile, scope: &Rc<RefCell<Scope>>) -> QuarryResult<Value> {
        if args.len() != 2 {
            return Err(self.err(file, location, "get_label_info() takes exactly 2 arguments"));
        }
        let label_str = self.eval_expr(&args[0], file, scope)?.as_str(location)?.to_string();
        let what = self.eval_expr(&args[1], file, scope)?.as_str(location)?.to_string();

        let (current_dir, settings) = {
            let s = scope.borrow();
            (s.current_dir(), Rc::clone(s.settings()))
        };
        let label = Label::parse(&current_dir, Some(&settings.toolchain_label), &label_str)
            .map_err(|e| self.err(file, location, e.to_string()))?;

        let label_settings = match label.toolchain() {
            Some(t) if t != settings.toolchain_label.as_ref() => crate::core::settings::Settings::new(
                Arc::clone(&settings.build_settings),
                Arc::new(t.clone()),
                Arc::clone(&settings.default_toolchain_label),
            ),
            _ => settings.as_ref().clone(),
        };

        let dir_str = label.dir().as_str();
        let gen_path = label_settings
            .toolchain_out_dir()
            .join_dir("gen")
            .join_dir(dir_str.trim_start_matches("//"));
        let out_path = label_settings
            .toolchain_out_dir()
            .join_dir("obj")
            .join_dir(dir_str.trim_start_matches("//"));

        let result = match what.as_str() {
            "name" => Value::from(label.name().to_string()),
            "dir" => Value::from(dir_str.trim_end_matches('/').to_string()),
            "target_gen_dir" => Value::from(gen_path.as_str().trim_end_matches('/').to_string()),
            "target_out_dir" => Value::from(out_path.as_str().trim_end_matches('/').to_string()),
            "label_no_toolchain" => Value::from(label.display_name(false)),
            "toolchain" => Value::from(label.toolchain().map(|t| t.display_name(false)).unwrap_or_default()),
            other => return Err(self.err(file, location, format!("get_label_info: unknown key `{}`", other))),
        };
        Ok(result)
    }

    fn builtin_get_target_outputs(&self, args: &[Expr], location: Location, file: SourceFile, scope: &Rc<RefCell<Scope>>) -> QuarryResult<Value> {
        if args.len() != 1 {
            return Err(self.err(file, location, "get_target_outputs() takes exactly 1 argument"));
        }
        let label_str = self.eval_expr(&args[0], file, scope)?.as_str(location)?.to_string();
        let (current_dir, settings) = {
            let s = scope.borrow();
            (s.current_dir(), Rc::clone(s.settings()))
        };
        let label = Label::parse(&current_dir, Some(&settings.toolchain_label), &label_str)
            .map_err(|e| self.err(file, location, e.to_string()))?;

        let record = self
            .registry
            .get(&label)
            .ok_or_else(|| self.err(file, location, format!("get_target_outputs: {} has not been declared yet", label)))?;
        let item = record
            .item()
            .ok_or_else(|| self.err(file, location, format!("get_target_outputs: {} is not yet complete", label)))?;
        let target = item
            .as_target()
            .ok_or_else(|| self.err(file, location, format!("get_target_outputs: {} is not a target", label)))?;

        if !target.data.is_empty() {
            return Ok(Value::from(target.data.iter().map(|f| f.as_str().to_string()).collect::<Vec<_>>()));
        }
        let out_dir = settings
            .toolchain_out_dir()
            .join_dir("obj")
            .join_dir(label.dir().as_str().trim_start_matches("//"));
        Ok(Value::List(vec![Value::from(out_dir.join_file(label.name()).as_str().to_string())]))
    }

    fn builtin_label_matches(&self, args: &[Expr], location: Location, file: SourceFile, scope: &Rc<RefCell<Scope>>) -> QuarryResult<Value> {
        if args.len() != 2 {
            return Err(self.err(file, location, "label_matches() takes exactly 2 arguments"));
        }
        let label_str = self.eval_expr(&args[0], file, scope)?.as_str(location)?.to_string();
        let pattern_strs = self.eval_expr(&args[1], file, scope)?.into_string_list(location)?;
        let (current_dir, settings) = {
            let s = scope.borrow();
            (s.current_dir(), Rc::clone(s.settings()))
        };
        let label = Label::parse(&current_dir, Some(&settings.toolchain_label), &label_str)
            .map_err(|e| self.err(file, location, e.to_string()))?;
        let patterns = pattern_strs
            .iter()
            .map(|p| LabelPattern::parse(&current_dir, Some(&settings.toolchain_label), p).map_err(|e| self.err(file, location, e.to_string())))
            .collect::<QuarryResult<Vec<_>>>()?;
        Ok(Value::from(label_matches(&label, &patterns)))
    }

    fn builtin_filter_labels(&self, args: &[Expr], location: Location, file: SourceFile, scope: &Rc<RefCell<Scope>>) -> QuarryResult<Value> {
        if args.len() != 2 {
            return Err(self.err(file, location, "filter_labels() takes exactly 2 arguments"));
        }
        let label_strs = self.eval_expr(&args[0], file, scope)?.into_string_list(location)?;
        let pattern_strs = self.eval_expr(&args[1], file, scope)?.into_string_list(location)?;
        let (current_dir, settings) = {
            let s = scope.borrow();
            (s.current_dir(), Rc::clone(s.settings()))
        };
        let labels = label_strs
            .iter()
            .map(|l| Label::parse(&current_dir, Some(&settings.toolchain_label), l).map_err(|e| self.err(file, location, e.to_string())))
            .collect::<QuarryResult<Vec<_>>>()?;
        let patterns = pattern_strs
            .iter()
            .map(|p| LabelPattern::parse(&current_dir, Some(&settings.toolchain_label), p).map_err(|e| self.err(file, location, e.to_string())))
            .collect::<QuarryResult<Vec<_>>>()?;
        let filtered = filter_labels(&labels, &patterns);
        Ok(Value::from(filtered.iter().map(|l| l.display_name(true)).collect::<Vec<_>>()))
    }

    fn builtin_read_file(&self, args: &[Expr], location: Location, file: SourceFile, scope: &Rc<RefCell<Scope>>) -> QuarryResult<Value> {
        if args.is_empty() || args.len() > 2 {
            return Err(self.err(file, location, "read_file() takes 1 or 2 arguments"));
        }
        let path_str = self.eval_expr(&args[0], file, scope)?.as_str(location)?.to_string();
        let current_dir = scope.borrow().current_dir();
        let source_file = SourceFile::from_relative(&current_dir, &path_str);
        let physical = self.to_physical_file(&source_file);
        let contents = std::fs::read_to_string(&physical)
            .map_err(|e| self.err(file, location, format!("couldn't read {}: {}", source_file, e)))?;
        Ok(Value::from(contents))
    }

    fn builtin_exec_script(&self, args: &[Expr], location: Location, file: SourceFile, scope: &Rc<RefCell<Scope>>) -> QuarryResult<Value> {
        if args.len() < 2 || args.len() > 4 {
            return Err(self.err(file, location, "exec_script() takes 2 to 4 arguments"));
        }
        let script_path = self.eval_expr(&args[0], file, scope)?.as_str(location)?.to_string();
        let script_args = self.eval_expr(&args[1], file, scope)?.into_string_list(location)?;
        let result_mode = if args.len() >= 3 {
            self.eval_expr(&args[2], file, scope)?.as_str(location)?.to_string()
        } else {
            "string".to_string()
        };

        let current_dir = scope.borrow().current_dir();
        let physical_script = self.to_physical_file(&SourceFile::from_relative(&current_dir, &script_path));
        let output = Command::new(&physical_script)
            .args(&script_args)
            .current_dir(&self.source_root)
            .output()
            .map_err(|e| self.err(file, location, format!("exec_script failed to run {}: {}", script_path, e)))?;
        if !output.status.success() {
            return Err(self.err(file, location, format!("exec_script {} exited with {}", script_path, output.status)));
        }
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        self.parse_exec_script_result(&stdout, &result_mode, location, file, scope)
    }

    fn parse_exec_script_result(
        &self,
        stdout: &str,
        mode: &str,
        location: Location,
        file: SourceFile,
        scope: &Rc<RefCell<Scope>>,
    ) -> QuarryResult<Value> {
        match mode {
            "string" => Ok(Value::from(stdout.trim_end().to_string())),
            "trim string" => Ok(Value::from(stdout.trim().to_string())),
            "list lines" => Ok(Value::from(stdout.lines().map(|l| l.to_string()).collect::<Vec<_>>())),
            "value" => {
                let synthetic = format!("_exec_script_result = {}", stdout);
                let path = PathBuf::from(file.as_str());
                let block = parse_file(&path, &synthetic)?;
                let result_scope = Rc::new(RefCell::new(Scope::new_child(scope)));
                self.exec_block(&block, file, &result_scope)?;
                result_scope
                    .borrow()
                    .peek_value("_exec_script_result")
                    .ok_or_else(|| self.err(file, location, "exec_script: \"value\" mode produced no result"))
            }
            other => Err(self.err(file, location, format!("exec_script: unknown result mode `{}`", other))),
        }
    }

    // --- shared helpers ---

    fn single_string_arg(&self, args: &[Expr], file: SourceFile, scope: &Rc<RefCell<Scope>>, context: &str) -> QuarryResult<String> {
        if args.len() != 1 {
            let loc = args.first().map(|a| a.location()).unwrap_or(Location::new(1, 1));
            return Err(self.err(file, loc, format!("{}() takes exactly one string argument", context)));
        }
        let location = args[0].location();
        Ok(self.eval_expr(&args[0], file, scope)?.as_str(location)?.to_string())
    }

    /// Reports the first binding assigned directly in `scope` (not a
    /// parent's) that was never read, as an evaluation error. Called for
    /// every kind of scope that exits for good — target/config/pool/
    /// toolchain declaration blocks, and (from [`crate::loader`]) each
    /// loaded file's own top-level scope — but not a `.gni` import's
    /// sibling scope, whose whole purpose is exporting bindings the
    /// importer, not the imported file itself, will read.
    pub(crate) fn report_unused(&self, file: SourceFile, scope: &Rc<RefCell<Scope>>) -> QuarryResult<()> {
        if let Some((name, location)) = scope.borrow().unused_bindings().into_iter().next() {
            return Err(self.err(file, location, format!("variable `{}` was assigned but never used", name)));
        }
        Ok(())
    }

    pub(crate) fn to_physical_file(&self, file: &SourceFile) -> PathBuf {
        match file.as_str().strip_prefix("//") {
            Some(rel) => self.source_root.join(rel),
            None => PathBuf::from(file.as_str()),
        }
    }

    fn err(&self, file: SourceFile, location: Location, message: impl Into<String>) -> anyhow::Error {
        DiagnosticError::new(PathBuf::from(file.as_str()), location, message).into()
    }
}

fn literal_to_value(lit: &Literal) -> Value {
    match lit {
        Literal::Integer(i) => Value::Int(*i),
        Literal::String(s) => Value::Str(s.clone()),
        Literal::Bool(b) => Value::Bool(*b),
    }
}

fn combine_append(current: Option<Value>, rhs: Value, location: Location) -> QuarryResult<Value> {
    match current {
        None => Ok(rhs),
        Some(Value::List(mut items)) => {
            let mut extra = rhs.as_list(location)?.to_vec();
            items.append(&mut extra);
            Ok(Value::List(items))
        }
        Some(Value::Str(s)) => Ok(Value::Str(format!("{}{}", s, rhs.display_unquoted()))),
        Some(Value::Int(i)) => Ok(Value::Int(i + rhs.as_int(location)?)),
        Some(other) => Err(anyhow::anyhow!("{}: cannot += onto a {}", location, other.type_name())),
    }
}

fn combine_remove(current: Value, rhs: Value, location: Location) -> QuarryResult<Value> {
    let items = current.as_list(location)?.to_vec();
    let remove = rhs.as_list(location)?.to_vec();
    Ok(Value::List(items.into_iter().filter(|v| !remove.contains(v)).collect()))
}

/// Converts a raw `--args` override string to the same `Value` variant as
/// the `declare_args()` default it's overriding, so a bool/int arg stays
/// typed the way the build file declared it.
fn coerce_arg_override(raw: &str, default: &Value) -> Value {
    match default {
        Value::Bool(_) => Value::Bool(raw == "true"),
        Value::Int(_) => Value::Int(raw.parse().unwrap_or(0)),
        _ => Value::Str(raw.to_string()),
    }
}

/// Reads the 16 flag-bag fields common to `config()` and a target's
/// `own_config_values`, in declaration order.
fn apply_config_value_fields(values: &mut ConfigValues, scope: &Rc<RefCell<Scope>>, location: Location) -> QuarryResult<()> {
    let s = scope.borrow();
    macro_rules! field {
        ($name:literal, $field:ident) => {
            if let Some(v) = s.get_value($name) {
                values.$field = v.into_string_list(location)?;
            }
        };
    }
    field!("defines", defines);
    field!("include_dirs", include_dirs);
    field!("cflags", cflags);
    field!("cflags_c", cflags_c);
    field!("cflags_cc", cflags_cc);
    field!("cflags_objc", cflags_objc);
    field!("cflags_objcc", cflags_objcc);
    field!("ldflags", ldflags);
    field!("framework_dirs", framework_dirs);
    field!("frameworks", frameworks);
    field!("weak_frameworks", weak_frameworks);
    field!("libs", libs);
    field!("lib_dirs", lib_dirs);
    field!("swiftflags", swiftflags);
    field!("rustflags", rustflags);
    field!("rustenv", rustenv);
    field!("externs", externs);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::settings::Settings;

    fn str_lit(s: &str) -> Expr {
        Expr::Literal(Literal::String(s.to_string()), Location::new(1, 1))
    }

    fn call(name: &str, args: Vec<Expr>) -> Expr {
        Expr::FunctionCall {
            name: name.to_string(),
            args,
            block: None,
            location: Location::new(1, 1),
        }
    }

    fn new_evaluator() -> Evaluator {
        let registry = Arc::new(Registry::new());
        let resolver = Arc::new(Resolver::new(Arc::clone(&registry)));
        Evaluator::new(registry, resolver, PathBuf::from("/src"))
    }

    /// Builds the scope from spec §8 scenario 6: current dir `//src/foo/`,
    /// default toolchain `//toolchain:default`, build dir `//out/Debug/`.
    fn scenario_scope() -> Rc<RefCell<Scope>> {
        use crate::core::settings::BuildSettings;
        let build_settings = Arc::new(BuildSettings::new(SourceDir::root(), SourceDir::new("//out/Debug/")));
        let toolchain = Arc::new(Label::new(SourceDir::new("//toolchain/"), "default", None));
        let settings = Rc::new(Settings::new(build_settings, Arc::clone(&toolchain), toolchain));
        Rc::new(RefCell::new(Scope::root(SourceDir::new("//src/foo/"), settings)))
    }

    #[test]
    fn declares_a_simple_target_via_eval_file() {
        let evaluator = new_evaluator();
        let build_settings = Arc::new(crate::core::settings::BuildSettings::new(SourceDir::root(), SourceDir::new("//out/Debug/")));
        let toolchain = Arc::new(Label::new(SourceDir::new("//toolchain/"), "default", None));
        let settings = Rc::new(Settings::new(build_settings, Arc::clone(&toolchain), toolchain));
        let scope = Rc::new(RefCell::new(Scope::root(SourceDir::root(), settings)));
        let file = SourceFile::new("//BUILD.gn");

        evaluator
            .eval_file(file, "group(\"foo\") {\n  deps = [ \":bar\" ]\n}\n\ngroup(\"bar\") {\n}\n", &scope)
            .expect("build file should evaluate cleanly");

        let foo = Label::new(SourceDir::root(), "foo", Some(Arc::new(Label::new(SourceDir::new("//toolchain/"), "default", None))));
        let record = evaluator.registry.get(&foo).expect("foo should be declared");
        assert!(record.item().is_some());
    }

    #[test]
    fn get_label_info_matches_worked_example_default_toolchain() {
        let evaluator = new_evaluator();
        let scope = scenario_scope();
        let file = SourceFile::new("//src/foo/BUILD.gn");

        let dir = evaluator
            .eval_expr(&call("get_label_info", vec![str_lit("//src/foo:foo"), str_lit("dir")]), file, &scope)
            .unwrap();
        assert_eq!(dir, Value::from("//src/foo"));

        let gen_dir = evaluator
            .eval_expr(&call("get_label_info", vec![str_lit("//src/foo:foo"), str_lit("target_gen_dir")]), file, &scope)
            .unwrap();
        assert_eq!(gen_dir, Value::from("//out/Debug/gen/src/foo"));
    }

    #[test]
    fn get_label_info_matches_worked_example_alternate_toolchain() {
        let evaluator = new_evaluator();
        let scope = scenario_scope();
        let file = SourceFile::new("//src/foo/BUILD.gn");

        let gen_dir = evaluator
            .eval_expr(
                &call(
                    "get_label_info",
                    vec![str_lit("//src/foo:foo(//toolchain:random)"), str_lit("target_gen_dir")],
                ),
                file,
                &scope,
            )
            .unwrap();
        assert_eq!(gen_dir, Value::from("//out/Debug/random/gen/src/foo"));
    }

    #[test]
    fn append_assignment_on_undefined_name_takes_the_rhs() {
        let loc = Location::new(1, 1);
        let result = combine_append(None, Value::from(vec!["a", "b"]), loc).unwrap();
        assert_eq!(result, Value::from(vec!["a", "b"]));
    }

    #[test]
    fn append_assignment_concatenates_lists() {
        let loc = Location::new(1, 1);
        let result = combine_append(Some(Value::from(vec!["a"])), Value::from(vec!["b"]), loc).unwrap();
        assert_eq!(result, Value::from(vec!["a", "b"]));
    }

    #[test]
    fn remove_assignment_drops_matching_entries() {
        let loc = Location::new(1, 1);
        let result = combine_remove(Value::from(vec!["a", "b", "c"]), Value::from(vec!["b"]), loc).unwrap();
        assert_eq!(result, Value::from(vec!["a", "c"]));
    }

    #[test]
    fn condition_assignments_are_visible_after_the_block() {
        let evaluator = new_evaluator();
        let build_settings = Arc::new(crate::core::settings::BuildSettings::new(SourceDir::root(), SourceDir::new("//out/Debug/")));
        let toolchain = Arc::new(Label::new(SourceDir::new("//toolchain/"), "default", None));
        let settings = Rc::new(Settings::new(build_settings, Arc::clone(&toolchain), toolchain));
        let scope = Rc::new(RefCell::new(Scope::root(SourceDir::root(), settings)));
        let file = SourceFile::new("//BUILD.gn");

        evaluator
            .eval_file(file, "enable_foo = true\ndefines = []\nif (enable_foo) {\n  defines += [\"FOO\"]\n}\n", &scope)
            .unwrap();

        assert_eq!(scope.borrow().peek_value("defines"), Some(Value::from(vec!["FOO"])));
    }
}
