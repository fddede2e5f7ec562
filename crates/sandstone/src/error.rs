use std::fmt;

use ruff_text_size::TextRange;

/// Line/column pair pointing into a compiled source file.
///
/// Both are 1-based, matching what editors display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeLoc {
    pub line: u32,
    pub column: u32,
}

impl CodeLoc {
    /// Computes the location of `range`'s start within `source`.
    pub fn new(source: &str, range: TextRange) -> Self {
        let offset = usize::from(range.start()).min(source.len());
        let prefix = &source[..offset];
        let line = prefix.bytes().filter(|b| *b == b'\n').count() as u32 + 1;
        let column = prefix.rfind('\n').map_or(offset, |nl| offset - nl - 1) as u32 + 1;
        Self { line, column }
    }
}

impl fmt::Display for CodeLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Formats the optional location suffix used by the error messages.
fn at(loc: &Option<CodeLoc>) -> String {
    match loc {
        Some(loc) => format!(" at {loc}"),
        None => String::new(),
    }
}

/// Everything that can abort a compilation.
///
/// Source-subset violations, name resolution failures and argument
/// mismatches abort the current unit; template init failures and unknown
/// AST nodes degrade instead and never surface here.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("unsupported syntax: {what} in {namespace}{}", at(.loc))]
    UnsupportedNode {
        what: String,
        namespace: String,
        loc: Option<CodeLoc>,
    },

    #[error("unsupported operator {op} in {namespace}{}", at(.loc))]
    UnsupportedOperator {
        op: String,
        namespace: String,
        loc: Option<CodeLoc>,
    },

    #[error("unsupported constant {value} in {namespace}{}", at(.loc))]
    UnsupportedConstant {
        value: String,
        namespace: String,
        loc: Option<CodeLoc>,
    },

    #[error("unsupported comparison in {namespace}: {what}{}", at(.loc))]
    UnsupportedCompare {
        what: String,
        namespace: String,
        loc: Option<CodeLoc>,
    },

    #[error("unsupported default value for parameter {param} of {function}{}", at(.loc))]
    UnsupportedDefault {
        function: String,
        param: String,
        loc: Option<CodeLoc>,
    },

    #[error("unsupported import {name} in {namespace}: {reason}")]
    UnsupportedImport {
        name: String,
        namespace: String,
        reason: String,
    },

    #[error("name {name} not found in namespace {namespace}")]
    NameNotFound { name: String, namespace: String },

    #[error("missing argument {param} in call to {function}")]
    MissingArgument { function: String, param: String },

    #[error("extra argument passed to {function}: {argument}")]
    ExtraArgument { function: String, argument: String },

    #[error("cell {name} was never allocated on objective {objective}")]
    UnknownCell { name: String, objective: String },

    #[error("template module {module} failed to initialise: {reason}")]
    TemplateInitFailed { module: String, reason: String },

    #[error("module {name} not found under the source or template roots")]
    ImportNotFound { name: String },

    #[error("invalid call to template {name}: {message}")]
    InvalidTemplateCall { name: String, message: String },

    #[error("syntax error in {path}: {message}{}", at(.loc))]
    Parse {
        path: String,
        message: String,
        loc: Option<CodeLoc>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type CompileResult<T> = Result<T, CompileError>;
