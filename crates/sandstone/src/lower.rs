//! The AST lowering engine.
//!
//! A single recursive walk over the ruff syntax tree turns each statement
//! and expression into command text, opening side-effect files for modules,
//! functions and conditional branches as it goes. Expression lowering
//! follows one convention throughout: every expression leaves its value in
//! the calling scope's result-temp cell (`<ns>.?Result` on the Temp
//! objective), and whoever consumes the value resets the cell.
//!
//! All compilation state lives in [`Compiler`] and is threaded explicitly
//! through the recursion; there are no globals, so outputs are reproducible
//! run to run.

use std::{fs, path::Path};

use ahash::{HashSet, HashSetExt};
use log::{debug, warn};
use ruff_python_ast::{
    self as ast, CmpOp, ElifElseClause, Expr, Number, Operator, Parameters, Stmt, UnaryOp,
};
use ruff_python_parser::parse_module;
use ruff_text_size::{Ranged, TextRange};
use serde_json::{Value, json};

use crate::{
    commands::{
        CheckKind, Comparison, DebugTip, ScoreOp, check_sb, comment, comment_block, debug_objective, debug_text,
        function_call, function_call_inline, objective_add, sb_assign, sb_assign_inline, sb_const, sb_op, sb_reset,
        tellraw,
    },
    config::{CompileConfig, GlobalConfig},
    encoder::ScoreCodes,
    error::{CodeLoc, CompileError, CompileResult},
    frames::CallFrames,
    imports,
    namespace::{ScopeKind, SymbolTable, function_path, join_base, root_of, strip_root},
    output::FileTree,
    signature::{BoundArg, DefaultValue, Parameter, Signature},
    template::TemplateRegistry,
};

/// Names of the fixed builtin set, resolved before user scopes.
const BUILTIN_FUNCTIONS: &[&str] = &["print"];

/// Number of omit-default slots registered for variadic-ish builtins.
const BUILTIN_PRINT_SLOTS: usize = 8;

/// The engine objectives lowering writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Objective {
    Args,
    Vars,
    Temp,
    Flags,
    FuncResult,
}

/// Resolves an [`Objective`] to its configured engine name.
fn objective_name(gconf: &GlobalConfig, objective: Objective) -> &str {
    match objective {
        Objective::Args => &gconf.sb_args,
        Objective::Vars => &gconf.sb_vars,
        Objective::Temp => &gconf.sb_temp,
        Objective::Flags => &gconf.sb_flags,
        Objective::FuncResult => &gconf.sb_func_result,
    }
}

/// Monotonic block-uid generator, rendered in hex like the emitted file
/// names.
#[derive(Debug, Default)]
struct UidGen(u64);

impl UidGen {
    fn next(&mut self) -> String {
        self.0 += 1;
        format!("{:x}", self.0)
    }
}

/// The compilation context: every process-wide table of the compiler, plus
/// the recursive lowering entry points.
#[derive(Debug)]
pub struct Compiler {
    pub(crate) config: CompileConfig,
    pub(crate) gconf: GlobalConfig,
    pub(crate) symbols: SymbolTable,
    pub(crate) codes: ScoreCodes,
    pub(crate) frames: CallFrames,
    pub(crate) templates: TemplateRegistry,
    pub(crate) func_args: indexmap::IndexMap<String, Signature>,
    pub(crate) files: FileTree,
    /// Module namespaces already lowered or being lowered; guards cycles.
    imported: HashSet<String>,
    /// Source text of the module currently being lowered, innermost last.
    sources: Vec<String>,
    uids: UidGen,
    /// Constant initialisation of the flag cells, emitted with the runtime
    /// init file.
    flag_inits: Vec<String>,
}

impl Compiler {
    pub fn new(config: CompileConfig) -> Self {
        Self::with_global(config, GlobalConfig::default())
    }

    pub fn with_global(config: CompileConfig, gconf: GlobalConfig) -> Self {
        let mut codes = ScoreCodes::new();
        let mut flag_inits = Vec::new();
        for (name, value) in [
            (gconf.flag_false.clone(), 0),
            (gconf.flag_true.clone(), 1),
            (gconf.flag_neg.clone(), -1),
            (gconf.flag_decimal.clone(), gconf.decimal_flag_value()),
        ] {
            let code = codes.encode(&name, &gconf.sb_flags);
            flag_inits.push(sb_const(&code, &gconf.sb_flags, value));
        }

        let mut func_args = indexmap::IndexMap::new();
        let mut print_sig = Signature::new();
        for slot in 1..=BUILTIN_PRINT_SLOTS {
            print_sig.push(format!("value{slot}"), Parameter::with_default(DefaultValue::Omit));
        }
        func_args.insert(format!("{}\\print", gconf.builtin_namespace), print_sig);

        let files = FileTree::new(&config.output_root);
        Self {
            config,
            gconf,
            symbols: SymbolTable::new(),
            codes,
            frames: CallFrames::new(),
            templates: TemplateRegistry::new(),
            func_args,
            files,
            imported: HashSet::new(),
            sources: Vec::new(),
            uids: UidGen::default(),
            flag_inits,
        }
    }

    /// Compiles the entry module (dotted name under the source root) and
    /// everything it imports.
    pub fn compile(&mut self, entry: &str) -> CompileResult<()> {
        let module_ns = join_base(&self.config.base_namespace, entry);
        let mut path = self.config.source_root.clone();
        for part in entry.split('.') {
            path.push(part);
        }
        let path = path.with_extension("py");
        if !path.is_file() {
            return Err(CompileError::ImportNotFound { name: entry.to_owned() });
        }
        self.lower_module_file(&path, &module_ns)
    }

    /// Writes the runtime-initialisation file: objective creation, cell
    /// registration, flag population.
    ///
    /// Call once after every entry module has been compiled.
    pub fn finish(&mut self) -> CompileResult<()> {
        let mut text = String::new();
        for objective in self.gconf.objectives() {
            text.push_str(&objective_add(objective));
        }
        for line in self.codes.registrations() {
            text.push_str(line);
        }
        for line in &self.flag_inits {
            text.push_str(line);
        }
        self.files.write_runtime_init(&text)?;
        debug!(
            "compilation finished: {} files, {} registered cells",
            self.files.files().count(),
            self.codes.registrations().len()
        );
        Ok(())
    }

    pub fn config(&self) -> &CompileConfig {
        &self.config
    }

    pub fn global_config(&self) -> &GlobalConfig {
        &self.gconf
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn codes(&self) -> &ScoreCodes {
        &self.codes
    }

    pub fn files(&self) -> &FileTree {
        &self.files
    }

    // ---- shared helpers -------------------------------------------------

    /// The result-temp cell of a scope.
    pub(crate) fn result_cell(&self, namespace: &str) -> String {
        format!("{namespace}{}", self.gconf.result_ext)
    }

    /// Configured engine name of an objective.
    pub(crate) fn objective(&self, objective: Objective) -> &str {
        objective_name(&self.gconf, objective)
    }

    /// Encodes a cell on an objective, registering it on first use.
    pub(crate) fn encode(&mut self, cell: &str, objective: Objective) -> String {
        self.codes.encode(cell, objective_name(&self.gconf, objective))
    }

    /// `a ← b` with both cells encoded.
    fn assign(&mut self, a: &str, obj_a: Objective, b: &str, obj_b: Objective) -> String {
        let code_a = self.codes.encode(a, objective_name(&self.gconf, obj_a));
        let code_b = self.codes.encode(b, objective_name(&self.gconf, obj_b));
        sb_assign(
            &code_a,
            objective_name(&self.gconf, obj_a),
            &code_b,
            objective_name(&self.gconf, obj_b),
        )
    }

    /// `a ← k` with the cell encoded.
    fn set_const(&mut self, a: &str, obj: Objective, value: i32) -> String {
        let code = self.codes.encode(a, objective_name(&self.gconf, obj));
        sb_const(&code, objective_name(&self.gconf, obj), value)
    }

    /// `a ⊕= b` with both cells encoded.
    fn operate(&mut self, op: ScoreOp, a: &str, obj_a: Objective, b: &str, obj_b: Objective) -> String {
        let code_a = self.codes.encode(a, objective_name(&self.gconf, obj_a));
        let code_b = self.codes.encode(b, objective_name(&self.gconf, obj_b));
        sb_op(
            op,
            &code_a,
            objective_name(&self.gconf, obj_a),
            &code_b,
            objective_name(&self.gconf, obj_b),
        )
    }

    /// Resets an already-encoded cell; unknown cells are a contract
    /// violation surfaced to the caller.
    fn reset(&mut self, a: &str, obj: Objective) -> CompileResult<String> {
        let objective = objective_name(&self.gconf, obj);
        let code = self.codes.code_of(a, objective)?;
        Ok(sb_reset(&code, objective))
    }

    /// Conditional wrapper with both compared cells encoded.
    fn check(
        &mut self,
        kind: CheckKind,
        a: &str,
        obj_a: Objective,
        cmp: Comparison,
        b: &str,
        obj_b: Objective,
        inner: &str,
    ) -> String {
        let code_a = self.codes.encode(a, objective_name(&self.gconf, obj_a));
        let code_b = self.codes.encode(b, objective_name(&self.gconf, obj_b));
        check_sb(
            kind,
            &code_a,
            objective_name(&self.gconf, obj_a),
            cmp,
            &code_b,
            objective_name(&self.gconf, obj_b),
            inner,
        )
    }

    /// Debug-gated comment line.
    fn note(&self, tag: &str, kv: &[(&str, &str)]) -> String {
        comment(self.config.debug, tag, kv)
    }

    /// Debug dump of a cell, optionally showing where its value came from.
    fn dbg_cell(&mut self, tip: DebugTip, obj: Objective, name: &str, from: Option<(Objective, &str)>) -> String {
        if !self.config.debug {
            return String::new();
        }
        let objective = objective_name(&self.gconf, obj).to_owned();
        let code = self.codes.encode(name, &objective);
        let from = from.map(|(from_obj, from_name)| {
            let from_objective = objective_name(&self.gconf, from_obj).to_owned();
            let from_code = self.codes.encode(from_name, &from_objective);
            (from_objective, from_name.to_owned(), from_code)
        });
        debug_objective(
            true,
            tip,
            &objective,
            name,
            &code,
            from.as_ref().map(|(o, n, c)| (o.as_str(), n.as_str(), c.as_str())),
        )
    }

    /// Live score component for tellraw emission.
    pub(crate) fn score_component(&mut self, cell: &str) -> Value {
        let code = self.encode(cell, Objective::Vars);
        json!({ "score": { "name": code, "objective": self.objective(Objective::Vars) } })
    }

    /// Resolves a name or attribute expression to the cell it reads.
    pub(crate) fn resolve_cell(&mut self, expr: &Expr, namespace: &str) -> CompileResult<String> {
        match expr {
            Expr::Name(name) => Ok(self.symbols.get(name.id.as_str(), namespace)?.0),
            Expr::Attribute(attr) => {
                let (_, value_ns, _) = self.ns_from_node(&attr.value, namespace, false, ScopeKind::Unresolved)?;
                Ok(self.symbols.get(attr.attr.as_str(), &value_ns)?.0)
            }
            other => Err(self.unsupported_node(other.range(), "expression is not a readable cell", namespace)),
        }
    }

    fn loc(&self, range: TextRange) -> Option<CodeLoc> {
        self.sources.last().map(|source| CodeLoc::new(source, range))
    }

    fn unsupported_node(&self, range: TextRange, what: &str, namespace: &str) -> CompileError {
        CompileError::UnsupportedNode {
            what: what.to_owned(),
            namespace: namespace.to_owned(),
            loc: self.loc(range),
        }
    }

    // ---- modules --------------------------------------------------------

    /// Parses and lowers one module file into its namespace.
    ///
    /// The namespace is registered before the body is lowered, so a module
    /// that re-enters itself through a cyclic import returns immediately on
    /// the second entry.
    pub(crate) fn lower_module_file(&mut self, path: &Path, namespace: &str) -> CompileResult<()> {
        if self.imported.contains(namespace) {
            return Ok(());
        }
        self.imported.insert(namespace.to_owned());
        debug!("lowering module {namespace} from {}", path.display());

        let source = fs::read_to_string(path)?;
        let parsed = parse_module(&source).map_err(|err| CompileError::Parse {
            path: path.display().to_string(),
            message: err.to_string(),
            loc: Some(CodeLoc::new(&source, err.range())),
        })?;
        let module = parsed.into_syntax();

        self.symbols.init_root(namespace, ScopeKind::Module);
        self.frames.init(namespace);
        self.sources.push(source);

        let mut text = format!("# compiled by sandstone v{}\n\n", env!("CARGO_PKG_VERSION"));
        let mut failure = None;
        for stmt in &module.body {
            match self.emit_stmt(stmt, namespace) {
                Ok(commands) => text.push_str(&commands),
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }
        self.sources.pop();
        if let Some(err) = failure {
            return Err(err);
        }
        self.files.write_module(namespace, &text)
    }

    // ---- statements -----------------------------------------------------

    pub(crate) fn emit_stmt(&mut self, stmt: &Stmt, namespace: &str) -> CompileResult<String> {
        match stmt {
            Stmt::Import(import) => imports::emit_import(self, import, namespace),
            Stmt::ImportFrom(import) => imports::emit_import_from(self, import, namespace),
            Stmt::FunctionDef(function) if !function.is_async => self.emit_function_def(function, namespace),
            Stmt::Global(global) => self.emit_global(global, namespace),
            Stmt::If(branch) => self.emit_if(branch, namespace),
            Stmt::Return(ret) => self.emit_return(ret, namespace),
            Stmt::Assign(assign) => self.emit_assign(assign, namespace),
            Stmt::Expr(expr) => self.emit_expr_stmt(expr, namespace),
            other => Ok(self.unknown_node(stmt_kind(other), &format!("{other:?}"), namespace)),
        }
    }

    fn emit_function_def(&mut self, function: &ast::StmtFunctionDef, namespace: &str) -> CompileResult<String> {
        let name = function.name.as_str();
        let func_ns = format!("{namespace}\\{name}");
        if !function.decorator_list.is_empty() {
            warn!("decorators on {func_ns} are not translated and were ignored");
        }

        self.symbols.set(name, &func_ns, namespace, ScopeKind::Function)?;
        self.frames.init(&func_ns);

        let mut text = self.note("FunctionDef: prologue", &[("name", name)]);
        text.push_str(&self.emit_arguments(&function.parameters, &func_ns)?);
        text.push_str(&self.note("FunctionDef: body", &[]));
        for stmt in &function.body {
            let commands = self.emit_stmt(stmt, &func_ns)?;
            text.push_str(&commands);
        }
        self.files.write_function(namespace, name, &text)?;
        Ok(String::new())
    }

    /// The function prologue: records the signature and moves every
    /// argument cell into the variable objective.
    ///
    /// Parameters are walked in reverse so declared defaults stay aligned
    /// with the final slots, exactly as they bind at call sites.
    fn emit_arguments(&mut self, parameters: &Parameters, func_ns: &str) -> CompileResult<String> {
        if self.func_args.contains_key(func_ns) {
            warn!("function namespace {func_ns} already exists; the previous signature is overwritten");
        }
        if !parameters.posonlyargs.is_empty()
            || parameters.vararg.is_some()
            || !parameters.kwonlyargs.is_empty()
            || parameters.kwarg.is_some()
        {
            warn!("{func_ns}: only plain positional parameters are translated; other kinds were ignored");
        }

        let mut reversed: Vec<(String, Parameter)> = Vec::with_capacity(parameters.args.len());
        let mut text = self.note("arguments: ingest", &[]);
        for param in parameters.args.iter().rev() {
            let name = param.parameter.name.as_str();
            let record = match &param.default {
                None => Parameter::positional(),
                Some(default) => match literal_int(default) {
                    Some(value) => Parameter::with_default(DefaultValue::Int(value)),
                    None => {
                        return Err(CompileError::UnsupportedDefault {
                            function: func_ns.to_owned(),
                            param: name.to_owned(),
                            loc: self.loc(default.range()),
                        });
                    }
                },
            };
            reversed.push((name.to_owned(), record));

            let cell = format!("{func_ns}.{name}");
            self.encode(&cell, Objective::Args);
            self.symbols.set(name, &cell, func_ns, ScopeKind::Variable)?;
            text.push_str(&self.assign(&cell, Objective::Vars, &cell, Objective::Args));
            text.push_str(&self.reset(&cell, Objective::Args)?);
            text.push_str(&self.dbg_cell(DebugTip::Set, Objective::Vars, &cell, Some((Objective::Args, &cell))));
        }

        let mut signature = Signature::new();
        for (name, record) in reversed.into_iter().rev() {
            signature.push(name, record);
        }
        self.func_args.insert(func_ns.to_owned(), signature);
        Ok(text)
    }

    /// `global x` rebinds `x` in the current scope to the compiled unit
    /// root's cell of the same name. Mid-level scopes cannot be targeted.
    fn emit_global(&mut self, global: &ast::StmtGlobal, namespace: &str) -> CompileResult<String> {
        let root_ns = join_base(&self.config.base_namespace, root_of(namespace));
        for name in &global.names {
            let cell = format!("{root_ns}.{}", name.as_str());
            self.symbols.set(name.as_str(), &cell, namespace, ScopeKind::Variable)?;
        }
        Ok(String::new())
    }

    fn emit_if(&mut self, branch: &ast::StmtIf, namespace: &str) -> CompileResult<String> {
        self.emit_if_parts(&branch.test, &branch.body, &branch.elif_else_clauses, namespace)
    }

    /// Lowers one if/else level: a file per branch, then the conditional
    /// dispatch pair in the enclosing command stream. `elif` chains recurse
    /// into the else branch file.
    fn emit_if_parts(
        &mut self,
        test: &Expr,
        body: &[Stmt],
        rest: &[ElifElseClause],
        namespace: &str,
    ) -> CompileResult<String> {
        let uid = self.uids.next();
        let result = self.result_cell(namespace);

        let mut true_text = self.dbg_cell(DebugTip::Branch, Objective::Temp, &result, None);
        for stmt in body {
            let commands = self.emit_stmt(stmt, namespace)?;
            true_text.push_str(&commands);
        }

        let mut else_text = self.dbg_cell(DebugTip::Branch, Objective::Temp, &result, None);
        else_text.push_str(&self.emit_else_clauses(rest, namespace)?);

        self.files.write_branch(namespace, &uid, false, &true_text)?;
        self.files.write_branch(namespace, &uid, true, &else_text)?;

        let mut text = self.emit_expr(test, namespace)?;
        text.push_str(&self.note("If: check condition", &[("uid", &uid)]));
        let branch_path = function_path(&format!("{namespace}\\.if\\{uid}"));
        let false_flag = self.gconf.flag_false.clone();
        text.push_str(&self.check(
            CheckKind::Unless,
            &result,
            Objective::Temp,
            Comparison::Equal,
            &false_flag,
            Objective::Flags,
            &function_call_inline(&branch_path),
        ));
        text.push_str(&self.check(
            CheckKind::If,
            &result,
            Objective::Temp,
            Comparison::Equal,
            &false_flag,
            Objective::Flags,
            &function_call_inline(&format!("{branch_path}-else")),
        ));
        text.push_str(&self.dbg_cell(DebugTip::Reset, Objective::Temp, &result, None));
        text.push_str(&self.reset(&result, Objective::Temp)?);
        Ok(text)
    }

    fn emit_else_clauses(&mut self, clauses: &[ElifElseClause], namespace: &str) -> CompileResult<String> {
        let Some((first, rest)) = clauses.split_first() else {
            return Ok(String::new());
        };
        match &first.test {
            // plain `else:` — the grammar guarantees it is last
            None => {
                let mut text = String::new();
                for stmt in &first.body {
                    let commands = self.emit_stmt(stmt, namespace)?;
                    text.push_str(&commands);
                }
                Ok(text)
            }
            // `elif` — a nested conditional inside the else branch
            Some(test) => self.emit_if_parts(test, &first.body, rest, namespace),
        }
    }

    fn emit_return(&mut self, ret: &ast::StmtReturn, namespace: &str) -> CompileResult<String> {
        let function = match self.symbols.node_at(namespace) {
            Some(node) if node.kind == ScopeKind::Function => node.full_namespace.clone(),
            _ => {
                return Err(self.unsupported_node(ret.range(), "return outside of a function", namespace));
            }
        };

        let mut text = self.note("Return: evaluate value", &[]);
        match &ret.value {
            Some(value) => text.push_str(&self.emit_expr(value, namespace)?),
            None => text.push_str(&self.emit_const_value(0, namespace)),
        }

        let result = self.result_cell(namespace);
        text.push_str(&self.note("Return: store value", &[]));
        text.push_str(&self.assign(&function, Objective::FuncResult, &result, Objective::Temp));
        text.push_str(&self.dbg_cell(
            DebugTip::Result,
            Objective::FuncResult,
            &function,
            Some((Objective::Temp, &result)),
        ));
        text.push_str(&self.dbg_cell(DebugTip::Reset, Objective::Temp, &result, None));
        text.push_str(&self.reset(&result, Objective::Temp)?);
        Ok(text)
    }

    fn emit_assign(&mut self, assign: &ast::StmtAssign, namespace: &str) -> CompileResult<String> {
        let mut text = self.emit_expr(&assign.value, namespace)?;
        let from = self.result_cell(namespace);

        for target in &assign.targets {
            let (name, scope, cell) = self.assign_target(target, namespace)?;
            text.push_str(&self.note("Assign: store value", &[("name", &name)]));
            self.symbols.set(&name, &cell, &scope, ScopeKind::Variable)?;
            text.push_str(&self.assign(&cell, Objective::Vars, &from, Objective::Temp));
            text.push_str(&self.dbg_cell(DebugTip::Assign, Objective::Vars, &cell, Some((Objective::Temp, &from))));
            text.push_str(&self.dbg_cell(DebugTip::Reset, Objective::Temp, &from, None));
            text.push_str(&self.reset(&from, Objective::Temp)?);
        }
        Ok(text)
    }

    /// Resolves an assignment target to `(name, binding scope, cell)`.
    ///
    /// An existing variable binding (including a `global` rebinding) keeps
    /// its cell; anything else creates a cell in the resolved scope.
    fn assign_target(&mut self, target: &Expr, namespace: &str) -> CompileResult<(String, String, String)> {
        match target {
            Expr::Name(name) => {
                let id = name.id.as_str();
                let cell = match self.symbols.get_raw(id, namespace) {
                    Ok((node, _)) if node.kind == ScopeKind::Variable => node.full_namespace.clone(),
                    Ok((node, _)) if node.kind == ScopeKind::Attribute => self.symbols.get(id, namespace)?.0,
                    Ok(_) | Err(CompileError::NameNotFound { .. }) => format!("{namespace}.{id}"),
                    Err(err) => return Err(err),
                };
                Ok((id.to_owned(), namespace.to_owned(), cell))
            }
            Expr::Attribute(attr) => {
                let (_, value_ns, _) = self.ns_from_node(&attr.value, namespace, false, ScopeKind::Unresolved)?;
                let id = attr.attr.as_str();
                let cell = match self.symbols.get_raw(id, &value_ns) {
                    Ok((node, _)) if node.kind == ScopeKind::Variable => node.full_namespace.clone(),
                    Ok(_) | Err(CompileError::NameNotFound { .. }) => format!("{value_ns}.{id}"),
                    Err(err) => return Err(err),
                };
                Ok((id.to_owned(), value_ns, cell))
            }
            other => Err(self.unsupported_node(other.range(), "assignment target", namespace)),
        }
    }

    fn emit_expr_stmt(&mut self, stmt: &ast::StmtExpr, namespace: &str) -> CompileResult<String> {
        let mut text = self.emit_expr(&stmt.value, namespace)?;
        let result = self.result_cell(namespace);
        match self.reset(&result, Objective::Temp) {
            Ok(reset) => {
                text.push_str(&self.note("Expr: discard value", &[]));
                text.push_str(&reset);
            }
            Err(CompileError::UnknownCell { .. }) => {
                warn!("expression in {namespace} produced no value; nothing to discard");
            }
            Err(err) => return Err(err),
        }
        Ok(text)
    }

    // ---- expressions ----------------------------------------------------

    pub(crate) fn emit_expr(&mut self, expr: &Expr, namespace: &str) -> CompileResult<String> {
        match expr {
            Expr::Name(name) => self.emit_name(name, namespace),
            Expr::Attribute(attr) => self.emit_attribute(attr, namespace),
            Expr::BinOp(op) => self.emit_bin_op(op, namespace),
            Expr::UnaryOp(op) => self.emit_unary_op(op, namespace),
            Expr::Compare(cmp) => self.emit_compare(cmp, namespace),
            Expr::Call(call) => self.emit_call(call, namespace),
            Expr::NumberLiteral(_) | Expr::BooleanLiteral(_) => self.emit_constant(expr, namespace),
            Expr::StringLiteral(_) | Expr::NoneLiteral(_) | Expr::EllipsisLiteral(_) | Expr::BytesLiteral(_) => {
                Err(CompileError::UnsupportedConstant {
                    value: expr_kind(expr).to_owned(),
                    namespace: namespace.to_owned(),
                    loc: self.loc(expr.range()),
                })
            }
            other => Ok(self.unknown_node(expr_kind(other), &format!("{other:?}"), namespace)),
        }
    }

    fn emit_name(&mut self, name: &ast::ExprName, namespace: &str) -> CompileResult<String> {
        let mut text = self.note("Name: load", &[("name", name.id.as_str())]);
        let (cell, _) = self.symbols.get(name.id.as_str(), namespace)?;
        let result = self.result_cell(namespace);
        text.push_str(&self.assign(&result, Objective::Temp, &cell, Objective::Vars));
        Ok(text)
    }

    fn emit_attribute(&mut self, attr: &ast::ExprAttribute, namespace: &str) -> CompileResult<String> {
        let Expr::Name(value) = &*attr.value else {
            return Err(self.unsupported_node(attr.range(), "attribute access on a non-name", namespace));
        };
        let (base_ns, _) = self.symbols.get(value.id.as_str(), namespace)?;
        let (cell, _) = self.symbols.get(attr.attr.as_str(), &base_ns)?;

        let mut text = self.note("Attribute: load", &[("base", &base_ns), ("attr", attr.attr.as_str())]);
        let result = self.result_cell(namespace);
        text.push_str(&self.assign(&result, Objective::Temp, &cell, Objective::Vars));
        Ok(text)
    }

    fn emit_constant(&mut self, expr: &Expr, namespace: &str) -> CompileResult<String> {
        let value = literal_int(expr).ok_or_else(|| CompileError::UnsupportedConstant {
            value: expr_kind(expr).to_owned(),
            namespace: namespace.to_owned(),
            loc: self.loc(expr.range()),
        })?;
        Ok(self.emit_const_value(value, namespace))
    }

    /// Loads an integer literal into the result-temp.
    fn emit_const_value(&mut self, value: i32, namespace: &str) -> String {
        let result = self.result_cell(namespace);
        let mut text = self.note("Constant: load", &[("value", &value.to_string())]);
        text.push_str(&self.set_const(&result, Objective::Temp, value));
        text.push_str(&self.dbg_cell(DebugTip::Set, Objective::Temp, &result, None));
        text
    }

    fn emit_bin_op(&mut self, op: &ast::ExprBinOp, namespace: &str) -> CompileResult<String> {
        let op_name = format!("{:?}", op.op);
        let mut text = self.note("BinOp", &[("op", &op_name)]);
        let result = self.result_cell(namespace);

        text.push_str(&self.note("BinOp: left operand", &[]));
        text.push_str(&self.emit_expr(&op.left, namespace)?);

        let uid = self.uids.next();
        let scratch = format!("{namespace}.*BinOp{uid}");
        text.push_str(&self.assign(&scratch, Objective::Temp, &result, Objective::Temp));
        self.frames.push(namespace, &scratch);
        text.push_str(&self.reset(&result, Objective::Temp)?);

        text.push_str(&self.note("BinOp: right operand", &[]));
        text.push_str(&self.emit_expr(&op.right, namespace)?);

        let score_op = match op.op {
            Operator::Add => ScoreOp::Add,
            Operator::Sub => ScoreOp::Sub,
            Operator::Mult => ScoreOp::Mul,
            Operator::Div => ScoreOp::Div,
            unsupported => {
                return Err(CompileError::UnsupportedOperator {
                    op: format!("{unsupported:?}"),
                    namespace: namespace.to_owned(),
                    loc: self.loc(op.range()),
                });
            }
        };
        text.push_str(&self.operate(score_op, &scratch, Objective::Temp, &result, Objective::Temp));
        text.push_str(&self.reset(&result, Objective::Temp)?);

        text.push_str(&self.note("BinOp: forward result", &[]));
        text.push_str(&self.assign(&result, Objective::Temp, &scratch, Objective::Temp));
        text.push_str(&self.dbg_cell(DebugTip::Calc, Objective::Temp, &result, None));
        text.push_str(&self.dbg_cell(DebugTip::Reset, Objective::Temp, &scratch, None));
        text.push_str(&self.reset(&scratch, Objective::Temp)?);
        self.frames.remove(namespace, &scratch);
        Ok(text)
    }

    fn emit_unary_op(&mut self, op: &ast::ExprUnaryOp, namespace: &str) -> CompileResult<String> {
        let mut text = self.note("UnaryOp", &[("op", &format!("{:?}", op.op))]);
        text.push_str(&self.emit_expr(&op.operand, namespace)?);

        let result = self.result_cell(namespace);
        let scratch = format!("{namespace}.*UnaryOp");
        let false_flag = self.gconf.flag_false.clone();
        let true_flag = self.gconf.flag_true.clone();
        let neg_flag = self.gconf.flag_neg.clone();

        match op.op {
            UnaryOp::Not => {
                // operand != 0 -> 0, operand == 0 -> 1
                let scratch_code = self.encode(&scratch, Objective::Temp);
                let false_code = self.encode(&false_flag, Objective::Flags);
                let true_code = self.encode(&true_flag, Objective::Flags);
                let temp = self.objective(Objective::Temp).to_owned();
                let flags = self.objective(Objective::Flags).to_owned();
                text.push_str(&self.check(
                    CheckKind::Unless,
                    &result,
                    Objective::Temp,
                    Comparison::Equal,
                    &false_flag,
                    Objective::Flags,
                    &sb_assign_inline(&scratch_code, &temp, &false_code, &flags),
                ));
                text.push_str(&self.check(
                    CheckKind::If,
                    &result,
                    Objective::Temp,
                    Comparison::Equal,
                    &false_flag,
                    Objective::Flags,
                    &sb_assign_inline(&scratch_code, &temp, &true_code, &flags),
                ));
            }
            UnaryOp::USub => {
                text.push_str(&self.assign(&scratch, Objective::Temp, &result, Objective::Temp));
                text.push_str(&self.operate(ScoreOp::Mul, &scratch, Objective::Temp, &neg_flag, Objective::Flags));
            }
            unsupported => {
                return Err(CompileError::UnsupportedOperator {
                    op: format!("{unsupported:?}"),
                    namespace: namespace.to_owned(),
                    loc: self.loc(op.range()),
                });
            }
        }

        text.push_str(&self.reset(&result, Objective::Temp)?);
        text.push_str(&self.note("UnaryOp: forward result", &[]));
        text.push_str(&self.assign(&result, Objective::Temp, &scratch, Objective::Temp));
        text.push_str(&self.dbg_cell(DebugTip::Calc, Objective::Temp, &result, None));
        text.push_str(&self.dbg_cell(DebugTip::Reset, Objective::Temp, &scratch, None));
        text.push_str(&self.reset(&scratch, Objective::Temp)?);
        Ok(text)
    }

    fn emit_compare(&mut self, cmp: &ast::ExprCompare, namespace: &str) -> CompileResult<String> {
        if cmp.ops.len() != 1 {
            return Err(CompileError::UnsupportedCompare {
                what: "chained comparisons".to_owned(),
                namespace: namespace.to_owned(),
                loc: self.loc(cmp.range()),
            });
        }
        let op = cmp.ops[0];
        let (kind, comparison) = match op {
            CmpOp::Eq => (CheckKind::If, Comparison::Equal),
            CmpOp::NotEq => (CheckKind::Unless, Comparison::Equal),
            CmpOp::Gt => (CheckKind::If, Comparison::More),
            CmpOp::Lt => (CheckKind::If, Comparison::Less),
            CmpOp::GtE => (CheckKind::If, Comparison::MoreEqual),
            CmpOp::LtE => (CheckKind::If, Comparison::LessEqual),
            unsupported => {
                return Err(CompileError::UnsupportedCompare {
                    what: format!("{unsupported:?}"),
                    namespace: namespace.to_owned(),
                    loc: self.loc(cmp.range()),
                });
            }
        };

        let result = self.result_cell(namespace);
        let left_cell = format!("{namespace}.*CompareLeft");
        let result_cell = format!("{namespace}.*CompareResult");
        let false_flag = self.gconf.flag_false.clone();
        let true_flag = self.gconf.flag_true.clone();

        let mut text = self.note("Compare", &[("op", &format!("{op:?}"))]);
        text.push_str(&self.note("Compare: left operand", &[]));
        text.push_str(&self.emit_expr(&cmp.left, namespace)?);
        text.push_str(&self.assign(&left_cell, Objective::Temp, &result, Objective::Temp));
        self.frames.push(namespace, &left_cell);
        text.push_str(&self.reset(&result, Objective::Temp)?);

        text.push_str(&self.assign(&result_cell, Objective::Temp, &false_flag, Objective::Flags));
        self.frames.push(namespace, &result_cell);

        text.push_str(&self.note("Compare: right operand", &[]));
        text.push_str(&self.emit_expr(&cmp.comparators[0], namespace)?);

        let result_code = self.encode(&result_cell, Objective::Temp);
        let true_code = self.encode(&true_flag, Objective::Flags);
        let temp = self.objective(Objective::Temp).to_owned();
        let flags = self.objective(Objective::Flags).to_owned();
        text.push_str(&self.check(
            kind,
            &left_cell,
            Objective::Temp,
            comparison,
            &result,
            Objective::Temp,
            &sb_assign_inline(&result_code, &temp, &true_code, &flags),
        ));

        text.push_str(&self.reset(&left_cell, Objective::Temp)?);
        self.frames.remove(namespace, &left_cell);
        text.push_str(&self.note("Compare: forward result", &[]));
        text.push_str(&self.assign(&result, Objective::Temp, &result_cell, Objective::Temp));
        text.push_str(&self.reset(&result_cell, Objective::Temp)?);
        self.frames.remove(namespace, &result_cell);
        Ok(text)
    }

    // ---- calls ----------------------------------------------------------

    fn emit_call(&mut self, call: &ast::ExprCall, namespace: &str) -> CompileResult<String> {
        let (name, func_ns, origin_ns) = match &*call.func {
            Expr::Name(n) if BUILTIN_FUNCTIONS.contains(&n.id.as_str()) => {
                let name = n.id.to_string();
                let func_ns = format!("{}\\{name}", self.gconf.builtin_namespace);
                (name, func_ns, self.gconf.builtin_namespace.clone())
            }
            func => self.ns_from_node(func, namespace, true, ScopeKind::Function)?,
        };

        // template functions take over the whole call site
        let template_key = format!("{}.{name}", strip_root(&origin_ns));
        if let Some(generator) = self.templates.lookup(&template_key) {
            let mut text = self.note("Template.Call", &[("func", &template_key)]);
            text.push_str(&debug_text(
                self.config.debug,
                DebugTip::CallTemplate,
                &[json!({ "text": template_key, "color": "dark_purple" })],
            ));
            text.push_str(&generator(self, &call.arguments, namespace)?);
            text.push_str(&self.note("Template.Call: end", &[]));
            return Ok(text);
        }

        let signature = self
            .func_args
            .get(&func_ns)
            .cloned()
            .ok_or_else(|| CompileError::NameNotFound {
                name: func_ns.clone(),
                namespace: namespace.to_owned(),
            })?;
        if !call.arguments.keywords.is_empty() {
            warn!("keyword arguments in call to {func_ns} are not translated and were ignored");
        }

        let result = self.result_cell(namespace);
        let mut text = String::new();
        for bound in signature.bind(&func_ns, call.arguments.args.iter())? {
            let param = match bound {
                BoundArg::Supplied { param, value } => {
                    text.push_str(&self.note("Call: evaluate argument", &[("name", param)]));
                    text.push_str(&self.emit_expr(value, namespace)?);
                    param
                }
                BoundArg::Default { param, value } => {
                    text.push_str(&self.note("Call: declared default", &[("name", param)]));
                    text.push_str(&self.emit_const_value(value, namespace));
                    param
                }
                BoundArg::Omitted { param } => {
                    text.push_str(&self.note("Call: omitted slot", &[("name", param)]));
                    continue;
                }
            };
            let arg_cell = format!("{func_ns}.{param}");
            text.push_str(&self.note("Call: pass argument", &[("name", param)]));
            text.push_str(&self.assign(&arg_cell, Objective::Args, &result, Objective::Temp));
            text.push_str(&self.dbg_cell(DebugTip::SetArg, Objective::Args, &arg_cell, Some((Objective::Temp, &result))));
            text.push_str(&self.dbg_cell(DebugTip::Reset, Objective::Temp, &result, None));
            text.push_str(&self.reset(&result, Objective::Temp)?);
        }

        let invocation_path = function_path(&func_ns);
        text.push_str(&debug_text(
            self.config.debug,
            DebugTip::Call,
            &[json!({ "text": invocation_path, "color": "dark_purple" })],
        ));

        // inside a function the caller's frame is spilled around the call,
        // so recursion restores every live cell afterwards
        let at_module_level = namespace == join_base(&self.config.base_namespace, root_of(namespace));
        if at_module_level {
            text.push_str(&function_call(&invocation_path));
        } else {
            let (save, restore) =
                self.frames
                    .save_restore(namespace, &self.symbols, &mut self.codes, &self.gconf, self.config.debug)?;
            text.push_str(&save);
            text.push_str(&function_call(&invocation_path));
            text.push_str(&restore);
        }

        self.encode(&func_ns, Objective::FuncResult);
        text.push_str(&self.assign(&result, Objective::Temp, &func_ns, Objective::FuncResult));
        text.push_str(&self.reset(&func_ns, Objective::FuncResult)?);
        Ok(text)
    }

    /// Resolves a name or attribute expression to
    /// `(bare name, full namespace, origin namespace)`, creating the node
    /// when permitted. Attribute indirections are followed; the origin is
    /// the namespace the final name was looked up from, which is what
    /// template dispatch keys on.
    fn ns_from_node(
        &mut self,
        node: &Expr,
        namespace: &str,
        create_missing: bool,
        kind: ScopeKind,
    ) -> CompileResult<(String, String, String)> {
        match node {
            Expr::Name(name) => self.ns_from_name(name.id.as_str(), namespace, create_missing, kind),
            Expr::Attribute(attr) => {
                let (_, value_ns, _) = self.ns_from_node(&attr.value, namespace, create_missing, kind)?;
                let name = attr.attr.as_str();
                let full = match self.symbols.get(name, &value_ns) {
                    Ok((full, _)) => full,
                    Err(CompileError::NameNotFound { .. }) if create_missing => {
                        let full = format!("{value_ns}\\{name}");
                        self.symbols.set(name, &full, &value_ns, kind)?;
                        full
                    }
                    Err(err) => return Err(err),
                };
                Ok((name.to_owned(), full, value_ns))
            }
            other => Err(self.unsupported_node(other.range(), "expression does not name a scope", namespace)),
        }
    }

    fn ns_from_name(
        &mut self,
        name: &str,
        namespace: &str,
        create_missing: bool,
        kind: ScopeKind,
    ) -> CompileResult<(String, String, String)> {
        let resolved = match self.symbols.get_raw(name, namespace) {
            Ok((node, _)) => Some((node.full_namespace.clone(), node.kind)),
            Err(CompileError::NameNotFound { .. }) if create_missing => None,
            Err(err) => return Err(err),
        };
        let (full, found_kind) = match resolved {
            Some(found) => found,
            None => {
                let full = format!("{namespace}\\{name}");
                self.symbols.set(name, &full, namespace, kind)?;
                (full, kind)
            }
        };
        if found_kind == ScopeKind::Attribute
            && let Some((target_ns, target_name)) = full.split_once('|')
        {
            let (target_ns, target_name) = (target_ns.to_owned(), target_name.to_owned());
            return self.ns_from_name(&target_name, &target_ns, create_missing, kind);
        }
        Ok((name.to_owned(), full, namespace.to_owned()))
    }

    // ---- degradation ----------------------------------------------------

    /// Unknown node kinds keep the rest of the program compiling: a red
    /// in-game diagnostic plus a structural dump comment mark the spot.
    fn unknown_node(&mut self, kind: &str, dump: &str, namespace: &str) -> String {
        warn!("cannot lower node {kind} in {namespace}; emitting a diagnostic instead");
        let mut text = tellraw(&[json!({
            "text": format!("unparseable node: {namespace}.{kind}"),
            "color": "red",
        })]);
        text.push_str(&comment_block(&format!("unparseable node {kind}:")));
        text.push_str(&comment_block(dump));
        text
    }
}

/// Integer value of a literal expression, with booleans as 1/0.
fn literal_int(expr: &Expr) -> Option<i32> {
    match expr {
        Expr::NumberLiteral(n) => match &n.value {
            Number::Int(i) => i.as_i64().and_then(|i| i32::try_from(i).ok()),
            _ => None,
        },
        Expr::BooleanLiteral(b) => Some(i32::from(b.value)),
        _ => None,
    }
}

fn stmt_kind(stmt: &Stmt) -> &'static str {
    match stmt {
        Stmt::FunctionDef(f) if f.is_async => "AsyncFunctionDef",
        Stmt::FunctionDef(_) => "FunctionDef",
        Stmt::ClassDef(_) => "ClassDef",
        Stmt::While(_) => "While",
        Stmt::For(_) => "For",
        Stmt::With(_) => "With",
        Stmt::Try(_) => "Try",
        Stmt::Raise(_) => "Raise",
        Stmt::Assert(_) => "Assert",
        Stmt::Delete(_) => "Delete",
        Stmt::AugAssign(_) => "AugAssign",
        Stmt::AnnAssign(_) => "AnnAssign",
        Stmt::Match(_) => "Match",
        Stmt::Break(_) => "Break",
        Stmt::Continue(_) => "Continue",
        Stmt::Pass(_) => "Pass",
        Stmt::Nonlocal(_) => "Nonlocal",
        Stmt::TypeAlias(_) => "TypeAlias",
        _ => "Stmt",
    }
}

fn expr_kind(expr: &Expr) -> &'static str {
    match expr {
        Expr::StringLiteral(_) => "StringLiteral",
        Expr::BytesLiteral(_) => "BytesLiteral",
        Expr::NoneLiteral(_) => "NoneLiteral",
        Expr::EllipsisLiteral(_) => "EllipsisLiteral",
        Expr::NumberLiteral(_) => "NumberLiteral",
        Expr::BooleanLiteral(_) => "BooleanLiteral",
        Expr::BoolOp(_) => "BoolOp",
        Expr::Lambda(_) => "Lambda",
        Expr::If(_) => "IfExp",
        Expr::Dict(_) => "Dict",
        Expr::Set(_) => "Set",
        Expr::List(_) => "List",
        Expr::Tuple(_) => "Tuple",
        Expr::ListComp(_) => "ListComp",
        Expr::SetComp(_) => "SetComp",
        Expr::DictComp(_) => "DictComp",
        Expr::Generator(_) => "GeneratorExp",
        Expr::Await(_) => "Await",
        Expr::Yield(_) => "Yield",
        Expr::YieldFrom(_) => "YieldFrom",
        Expr::Starred(_) => "Starred",
        Expr::Slice(_) => "Slice",
        Expr::Subscript(_) => "Subscript",
        Expr::FString(_) => "FString",
        _ => "Expr",
    }
}
