//! The `builtin` template module: in-game printing.

use ruff_python_ast::{Arguments, Expr, Number};
use serde_json::{Value, json};

use crate::{
    commands::tellraw,
    error::CompileResult,
    lower::Compiler,
    template::TemplateRegistry,
    templates::{invalid, keyword, str_literal},
};

const TPRINT: &str = "template.MinecraftSupport.builtin.tprint";

pub(crate) fn register(registry: &mut TemplateRegistry) {
    registry.register(TPRINT, tprint);
}

/// `tprint(*values, sep=" ")` — broadcasts its arguments to every player.
///
/// Variable arguments become live score components so the printed value is
/// whatever the cell holds when the line runs; literals are embedded as
/// plain text.
fn tprint(compiler: &mut Compiler, args: &Arguments, namespace: &str) -> CompileResult<String> {
    let sep = match keyword(&args.keywords, "sep") {
        Some(expr) => str_literal(TPRINT, "sep", expr)?,
        None => " ".to_owned(),
    };

    let mut components = Vec::new();
    for (index, arg) in args.args.iter().enumerate() {
        if index > 0 && !sep.is_empty() {
            components.push(json!({ "text": sep }));
        }
        components.push(component(compiler, arg, namespace)?);
    }
    Ok(tellraw(&components))
}

fn component(compiler: &mut Compiler, expr: &Expr, namespace: &str) -> CompileResult<Value> {
    match expr {
        Expr::Name(_) | Expr::Attribute(_) => {
            let cell = compiler.resolve_cell(expr, namespace)?;
            Ok(compiler.score_component(&cell))
        }
        Expr::NumberLiteral(n) => match &n.value {
            Number::Int(i) => Ok(json!({ "text": i.to_string() })),
            _ => Err(invalid(TPRINT, "only integers can be printed")),
        },
        Expr::BooleanLiteral(b) => Ok(json!({ "text": if b.value { "1" } else { "0" } })),
        Expr::StringLiteral(s) => Ok(json!({ "text": s.value.to_string() })),
        _ => Err(invalid(TPRINT, "arguments must be variables or literals")),
    }
}
