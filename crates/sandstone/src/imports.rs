//! Import resolution.
//!
//! Dotted names are probed first under the user source root, then against
//! the host template modules and the template root. User modules are
//! parsed and lowered recursively into fresh namespaces; template modules
//! run their host initialiser instead, which registers generators into the
//! template registry. A user file can also opt into template treatment
//! with a `# sandstone: template` marker in its opening lines.
//!
//! Cyclic imports terminate because a module's namespace is registered
//! before its body is lowered: the second entry returns without doing
//! anything.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use log::{debug, warn};
use ruff_python_ast as ast;

use crate::{
    commands::function_call,
    error::{CompileError, CompileResult},
    lower::Compiler,
    namespace::{ScopeKind, function_path, join_base},
    output::MODULE_FILE,
    template::TemplateModule,
};

/// First-lines marker declaring a user source file to be a template.
const TEMPLATE_SENTINEL: &str = "# sandstone: template";

/// How many opening lines are scanned for the sentinel (coding cookies and
/// shebangs may come first).
const SENTINEL_WINDOW: usize = 5;

/// Where a dotted module name was found.
enum Located {
    /// Regular user module file to parse and lower.
    UserFile(PathBuf),
    /// User package directory.
    UserDir,
    /// Module whose lowering is provided by the host (or by nothing, in
    /// which case its init degrades).
    Template,
    /// Package level of the template tree.
    TemplateDir,
}

/// Probes a dotted name in source-root → host-template → template-root
/// order.
fn locate(compiler: &Compiler, name: &str) -> CompileResult<Located> {
    let relative: PathBuf = name.split('.').collect();

    let user_base = compiler.config().source_root.join(&relative);
    let user_file = user_base.with_extension("py");
    if user_file.is_file() {
        return if is_template_file(&user_file)? {
            Ok(Located::Template)
        } else {
            Ok(Located::UserFile(user_file))
        };
    }
    if user_base.is_dir() {
        return Ok(Located::UserDir);
    }

    if TemplateModule::from_dotted(name).is_some() {
        return Ok(Located::Template);
    }
    let template_base = compiler.config().template_root.join(&relative);
    if template_base.with_extension("py").is_file() {
        return Ok(Located::Template);
    }
    if TemplateModule::package_exists(name) || template_base.is_dir() {
        return Ok(Located::TemplateDir);
    }

    Err(CompileError::ImportNotFound { name: name.to_owned() })
}

/// Whether a user source file carries the template sentinel.
fn is_template_file(path: &Path) -> CompileResult<bool> {
    let reader = BufReader::new(File::open(path)?);
    for line in reader.lines().take(SENTINEL_WINDOW) {
        if line?.trim() == TEMPLATE_SENTINEL {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Imports `name`, optionally binding it (or `asname`) in `namespace`.
///
/// Returns the command text the import contributes at its site and whether
/// the target was a module (as opposed to a package).
pub(crate) fn import_as(
    compiler: &mut Compiler,
    name: &str,
    asname: Option<&str>,
    namespace: &str,
    register: bool,
) -> CompileResult<(String, bool)> {
    let module_ns = join_base(&compiler.config().base_namespace, name);
    let binding = asname.unwrap_or(name);

    match locate(compiler, name)? {
        Located::UserFile(path) => {
            if register {
                compiler.symbols.set(binding, &module_ns, namespace, ScopeKind::Module)?;
            }
            compiler.lower_module_file(&path, &module_ns)?;
            let command = function_call(&format!("{}/{MODULE_FILE}", function_path(&module_ns)));
            Ok((command, true))
        }
        Located::Template => {
            if let Err(err) = compiler.templates.init_module(name) {
                warn!("{err}; calls into {name} will not resolve");
            } else {
                debug!("initialised template module {name}");
            }
            compiler.symbols.init_root(&module_ns, ScopeKind::Module);
            if register {
                compiler.symbols.set(binding, &module_ns, namespace, ScopeKind::Module)?;
            }
            Ok((String::new(), true))
        }
        Located::UserDir | Located::TemplateDir => {
            compiler.symbols.init_root(&module_ns, ScopeKind::Package);
            if register {
                compiler.symbols.set(binding, &module_ns, namespace, ScopeKind::Package)?;
            }
            Ok((String::new(), false))
        }
    }
}

/// `import a.b [as m], …`
pub(crate) fn emit_import(compiler: &mut Compiler, import: &ast::StmtImport, namespace: &str) -> CompileResult<String> {
    let mut text = String::new();
    for alias in &import.names {
        let name = alias.name.as_str();
        if name.starts_with('.') {
            return Err(CompileError::UnsupportedImport {
                name: name.to_owned(),
                namespace: namespace.to_owned(),
                reason: "relative imports are not supported".to_owned(),
            });
        }
        let asname = alias.asname.as_ref().map(ast::Identifier::as_str);
        let (command, _) = import_as(compiler, name, asname, namespace, true)?;
        text.push_str(&command);
    }
    Ok(text)
}

/// `from a.b import x [as y], …`
///
/// The module is imported (unbound), then each name binds as an attribute
/// node pointing into it. When the target is a package, the named
/// submodules are imported recursively and registered inside the package's
/// scope under their own names, so the attribute indirections resolve.
pub(crate) fn emit_import_from(
    compiler: &mut Compiler,
    import: &ast::StmtImportFrom,
    namespace: &str,
) -> CompileResult<String> {
    let module = match (&import.module, import.level) {
        (Some(module), 0) => module.as_str(),
        _ => {
            return Err(CompileError::UnsupportedImport {
                name: import.module.as_ref().map(ast::Identifier::as_str).unwrap_or(".").to_owned(),
                namespace: namespace.to_owned(),
                reason: "relative imports are not supported".to_owned(),
            });
        }
    };

    let (mut text, is_module) = import_as(compiler, module, None, namespace, false)?;
    let module_ns = join_base(&compiler.config().base_namespace, module);

    for alias in &import.names {
        let name = alias.name.as_str();
        let binding = alias.asname.as_ref().map_or(name, ast::Identifier::as_str);
        compiler
            .symbols
            .set(binding, &format!("{module_ns}|{name}"), namespace, ScopeKind::Attribute)?;

        if !is_module {
            let submodule = format!("{module}.{name}");
            let (command, _) = import_as(compiler, &submodule, None, namespace, false)?;
            text.push_str(&command);
            let submodule_ns = join_base(&compiler.config().base_namespace, &submodule);
            compiler.symbols.set(name, &submodule_ns, &module_ns, ScopeKind::Module)?;
        }
    }
    Ok(text)
}
