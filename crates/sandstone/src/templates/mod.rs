//! Host template modules.
//!
//! Each submodule mirrors one module of the original in-game support
//! library and registers its generators into the [`TemplateRegistry`]
//! when the module is first imported.

pub(crate) mod bossbar;
pub(crate) mod builtin;
pub(crate) mod env_build;
pub(crate) mod scoreboard;

use ruff_python_ast::{Expr, Keyword, Number};
use serde_json::{Map, Value, json};

use crate::error::{CompileError, CompileResult};

/// Invalid-argument error for a template call site.
pub(crate) fn invalid(template: &str, message: impl Into<String>) -> CompileError {
    CompileError::InvalidTemplateCall {
        name: template.to_owned(),
        message: message.into(),
    }
}

/// The value of a keyword argument, if the caller passed one.
pub(crate) fn keyword<'a>(keywords: &'a [Keyword], name: &str) -> Option<&'a Expr> {
    keywords
        .iter()
        .find(|kw| kw.arg.as_ref().is_some_and(|arg| arg.as_str() == name))
        .map(|kw| &kw.value)
}

/// Requires a string-literal argument.
pub(crate) fn str_literal(template: &str, what: &str, expr: &Expr) -> CompileResult<String> {
    match expr {
        Expr::StringLiteral(s) => Ok(s.value.to_string()),
        _ => Err(invalid(template, format!("{what} must be a string literal"))),
    }
}

/// Requires an integer-literal argument (booleans count as 1/0).
pub(crate) fn int_literal(template: &str, what: &str, expr: &Expr) -> CompileResult<i32> {
    match expr {
        Expr::NumberLiteral(n) => match &n.value {
            Number::Int(i) => i
                .as_i64()
                .and_then(|i| i32::try_from(i).ok())
                .ok_or_else(|| invalid(template, format!("{what} is out of the cell range"))),
            _ => Err(invalid(template, format!("{what} must be an integer literal"))),
        },
        Expr::BooleanLiteral(b) => Ok(i32::from(b.value)),
        _ => Err(invalid(template, format!("{what} must be an integer literal"))),
    }
}

/// Converts a literal dict expression into a JSON value.
///
/// Keys must be string literals; values may be strings, integers, booleans
/// or nested dicts. Used for text-component arguments.
pub(crate) fn dict_to_json(template: &str, expr: &Expr) -> CompileResult<Value> {
    match expr {
        Expr::StringLiteral(s) => Ok(Value::String(s.value.to_string())),
        Expr::BooleanLiteral(b) => Ok(Value::Bool(b.value)),
        Expr::NumberLiteral(n) => match &n.value {
            Number::Int(i) => i
                .as_i64()
                .map(|i| json!(i))
                .ok_or_else(|| invalid(template, "integer out of range")),
            _ => Err(invalid(template, "unsupported number in component")),
        },
        Expr::Dict(dict) => {
            let mut map = Map::new();
            for item in &dict.items {
                let key = item
                    .key
                    .as_ref()
                    .ok_or_else(|| invalid(template, "component dicts cannot use ** unpacking"))?;
                let key = str_literal(template, "component key", key)?;
                map.insert(key, dict_to_json(template, &item.value)?);
            }
            Ok(Value::Object(map))
        }
        _ => Err(invalid(template, "unsupported value in component")),
    }
}

/// Positional argument accessor with an arity check message.
pub(crate) fn positional<'a>(template: &str, args: &'a [Expr], index: usize, what: &str) -> CompileResult<&'a Expr> {
    args.get(index)
        .ok_or_else(|| invalid(template, format!("missing argument {what}")))
}
