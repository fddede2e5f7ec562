#![doc = include_str!("../../../README.md")]
#![expect(clippy::must_use_candidate, reason = "accessor and builder returns are advisory")]
#![expect(clippy::cast_possible_truncation, reason = "numeric narrowing is checked or clamped")]
#![expect(clippy::too_many_arguments, reason = "command builders thread cell/objective pairs")]

mod commands;
mod config;
mod encoder;
mod error;
mod frames;
mod imports;
mod lower;
mod namespace;
mod output;
mod signature;
mod template;
mod templates;

pub use crate::{
    commands::{CheckKind, Comparison, DebugTip, ScoreOp},
    config::{CompileConfig, GlobalConfig},
    encoder::ScoreCodes,
    error::{CodeLoc, CompileError, CompileResult},
    frames::CallFrames,
    lower::Compiler,
    namespace::{ScopeKind, ScopeNode, SymbolTable, function_path, join_base, parent_and_name, root_of, strip_root},
    output::{FileTree, IF_DIR, INIT_FILE, MODULE_FILE},
    signature::{DefaultValue, ParamKind, Parameter, Signature},
    template::{TemplateFn, TemplateRegistry},
};
