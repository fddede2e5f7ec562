//! Function signatures and the call-site argument policy.
//!
//! The source subset only produces positional parameters, optionally with
//! integer-literal defaults; the model nevertheless carries the full kind
//! lattice so host-registered signatures (and future front ends) can state
//! keyword parameters.
//!
//! Defaults are right-aligned: with `n` parameters and `m` defaults the
//! final `m` parameters carry them. The distinguished `Omit` default marks
//! a slot that is silently skipped when the caller supplies no value — no
//! command is emitted for it, which is how the variadic-ish `print` builtin
//! is modelled.

use indexmap::IndexMap;

use crate::error::{CompileError, CompileResult};

/// How a parameter may be bound at a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ParamKind {
    Positional,
    PositionalDefault,
    Keyword,
    KeywordDefault,
}

/// A parameter's default, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    /// No default: the caller must supply a value.
    Required,
    /// Integer-literal default (booleans are 1/0).
    Int(i32),
    /// The "unnecessary" sentinel: emit nothing when the caller omits it.
    Omit,
}

/// A single named parameter.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub kind: ParamKind,
    pub default: DefaultValue,
}

impl Parameter {
    pub fn positional() -> Self {
        Self {
            kind: ParamKind::Positional,
            default: DefaultValue::Required,
        }
    }

    pub fn with_default(default: DefaultValue) -> Self {
        Self {
            kind: ParamKind::PositionalDefault,
            default,
        }
    }
}

/// What lowering must do for one parameter slot of a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundArg<'a, A> {
    /// Marshal the caller's expression into the parameter's cell.
    Supplied { param: &'a str, value: A },
    /// Marshal the declared integer default.
    Default { param: &'a str, value: i32 },
    /// Emit nothing for this slot.
    Omitted { param: &'a str },
}

/// An ordered mapping from parameter name to parameter record.
#[derive(Debug, Clone, Default)]
pub struct Signature {
    params: IndexMap<String, Parameter>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter; insertion order is calling order.
    pub fn push(&mut self, name: impl Into<String>, param: Parameter) {
        self.params.insert(name.into(), param);
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    /// Pairs caller-supplied positional arguments with the parameter list.
    ///
    /// Surplus arguments fail with [`CompileError::ExtraArgument`]; missing
    /// arguments without a default fail with
    /// [`CompileError::MissingArgument`]; missing arguments whose default is
    /// the omit sentinel produce [`BoundArg::Omitted`].
    pub fn bind<'a, A>(
        &'a self,
        function: &str,
        args: impl IntoIterator<Item = A>,
    ) -> CompileResult<Vec<BoundArg<'a, A>>> {
        use itertools::{EitherOrBoth, Itertools};

        let mut bound = Vec::with_capacity(self.params.len());
        for pair in self.params.iter().zip_longest(args) {
            match pair {
                EitherOrBoth::Both((name, _), value) => bound.push(BoundArg::Supplied { param: name, value }),
                EitherOrBoth::Right(_) => {
                    return Err(CompileError::ExtraArgument {
                        function: function.to_owned(),
                        argument: format!("argument {}", bound.len() + 1),
                    });
                }
                EitherOrBoth::Left((name, param)) => match param.default {
                    DefaultValue::Required => {
                        return Err(CompileError::MissingArgument {
                            function: function.to_owned(),
                            param: name.clone(),
                        });
                    }
                    DefaultValue::Int(value) => bound.push(BoundArg::Default { param: name, value }),
                    DefaultValue::Omit => bound.push(BoundArg::Omitted { param: name }),
                },
            }
        }
        Ok(bound)
    }
}
