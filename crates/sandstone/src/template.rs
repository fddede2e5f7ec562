//! The template function registry.
//!
//! A template function is a source-visible callable whose lowering is
//! supplied by a host-side generator instead of being translated from a
//! Python body. Generators receive the raw argument ASTs and the calling
//! namespace and return the complete command text for the call site; no
//! argument marshalling happens around them.
//!
//! Template modules register their generators when first imported, keyed by
//! the dotted source name the call site resolves to (e.g.
//! `template.MinecraftSupport.builtin.tprint`).

use ahash::{HashMap, HashMapExt, HashSet, HashSetExt};
use ruff_python_ast::Arguments;

use crate::{
    error::{CompileError, CompileResult},
    lower::Compiler,
    templates,
};

/// A host-side code generator standing in for a source-level function.
pub type TemplateFn = fn(&mut Compiler, &Arguments, &str) -> CompileResult<String>;

/// The host template modules shipped with the compiler.
///
/// Mirrors the original support library: `builtin` provides `tprint`,
/// `scoreboard` raw score access, `EnvBuild` compile-time environment
/// setup, and `bossbar` the bossbar command family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TemplateModule {
    Builtin,
    Scoreboard,
    EnvBuild,
    BossBar,
}

impl TemplateModule {
    /// Resolves a dotted module name to its host implementation.
    pub fn from_dotted(name: &str) -> Option<Self> {
        match name {
            "template.MinecraftSupport.builtin" => Some(Self::Builtin),
            "template.MinecraftSupport.scoreboard" => Some(Self::Scoreboard),
            "template.MinecraftSupport.EnvBuild" => Some(Self::EnvBuild),
            "template.MinecraftSupport.bossbar" => Some(Self::BossBar),
            _ => None,
        }
    }

    /// Whether a dotted name denotes a package of the host template tree.
    pub fn package_exists(name: &str) -> bool {
        matches!(name, "template" | "template.MinecraftSupport")
    }

    /// Registers this module's generators.
    pub fn init(self, registry: &mut TemplateRegistry) {
        match self {
            Self::Builtin => templates::builtin::register(registry),
            Self::Scoreboard => templates::scoreboard::register(registry),
            Self::EnvBuild => templates::env_build::register(registry),
            Self::BossBar => templates::bossbar::register(registry),
        }
    }
}

/// Process-wide mapping from dotted source names to host generators.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    generators: HashMap<String, TemplateFn>,
    initialised: HashSet<String>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self {
            generators: HashMap::new(),
            initialised: HashSet::new(),
        }
    }

    /// Registers a generator under its dotted source name.
    pub fn register(&mut self, dotted_name: &str, generator: TemplateFn) {
        self.generators.insert(dotted_name.to_owned(), generator);
    }

    /// Looks up the generator for a call site's resolved dotted name.
    pub fn lookup(&self, dotted_name: &str) -> Option<TemplateFn> {
        self.generators.get(dotted_name).copied()
    }

    /// Runs the host initialiser of a template module, once.
    ///
    /// A module without a host implementation contributes no callables and
    /// reports [`CompileError::TemplateInitFailed`]; the import resolver
    /// logs and continues, so later calls surface as name errors.
    pub fn init_module(&mut self, dotted_name: &str) -> CompileResult<()> {
        if self.initialised.contains(dotted_name) {
            return Ok(());
        }
        let module = TemplateModule::from_dotted(dotted_name).ok_or_else(|| CompileError::TemplateInitFailed {
            module: dotted_name.to_owned(),
            reason: "no host implementation registered for this module".to_owned(),
        })?;
        self.initialised.insert(dotted_name.to_owned());
        module.init(self);
        Ok(())
    }
}
