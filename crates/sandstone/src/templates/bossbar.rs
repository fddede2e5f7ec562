//! The `bossbar` template module.
//!
//! Generators for the engine's bossbar command family. Literal values are
//! embedded directly; a variable passed for `value`/`max` produces an
//! `execute store result bossbar …` form that reads the live score.

use ruff_python_ast::{Arguments, Expr, Number};
use serde_json::{Value, json};

use crate::{
    error::CompileResult,
    lower::{Compiler, Objective},
    template::TemplateRegistry,
    templates::{dict_to_json, int_literal, invalid, positional, str_literal},
};

const MODULE: &str = "template.MinecraftSupport.bossbar";

const ALLOWED_COLORS: [&str; 7] = ["blue", "green", "pink", "purple", "red", "white", "yellow"];
const ALLOWED_STYLES: [&str; 5] = ["notched_6", "notched_10", "notched_12", "notched_20", "progress"];

pub(crate) fn register(registry: &mut TemplateRegistry) {
    registry.register(&format!("{MODULE}.add"), add);
    registry.register(&format!("{MODULE}.remove"), remove);
    registry.register(&format!("{MODULE}.set_players"), set_players);
    registry.register(&format!("{MODULE}.set_value"), set_value);
    registry.register(&format!("{MODULE}.set_max"), set_max);
    registry.register(&format!("{MODULE}.set_name"), set_name);
    registry.register(&format!("{MODULE}.set_color"), set_color);
    registry.register(&format!("{MODULE}.set_style"), set_style);
    registry.register(&format!("{MODULE}.set_visible"), set_visible);
}

/// Normalises a bossbar id, defaulting the `minecraft:` namespace.
fn check_id(template: &str, expr: &Expr) -> CompileResult<String> {
    let id = str_literal(template, "id", expr)?;
    if id.contains('\n') {
        return Err(invalid(template, "id must not contain newlines"));
    }
    if id.contains(':') {
        Ok(id)
    } else {
        Ok(format!("minecraft:{id}"))
    }
}

/// A bossbar display name: a plain string or a literal component dict.
fn check_name(template: &str, expr: &Expr) -> CompileResult<Value> {
    match expr {
        Expr::StringLiteral(s) => Ok(json!({ "text": s.value.to_string() })),
        Expr::Dict(_) => dict_to_json(template, expr),
        _ => Err(invalid(template, "name must be a string or component dict")),
    }
}

/// A bossbar numeric value: non-negative, with floats carried at the
/// configured decimal precision.
fn check_value(template: &str, compiler: &Compiler, expr: &Expr) -> CompileResult<i32> {
    let value = match expr {
        Expr::NumberLiteral(n) => match n.value {
            Number::Float(f) => (f * f64::from(compiler.global_config().decimal_flag_value())) as i32,
            _ => int_literal(template, "value", expr)?,
        },
        _ => int_literal(template, "value", expr)?,
    };
    if value < 0 {
        return Err(invalid(template, "value must not be negative"));
    }
    Ok(value)
}

fn add(_compiler: &mut Compiler, args: &Arguments, _namespace: &str) -> CompileResult<String> {
    let template = "template.MinecraftSupport.bossbar.add";
    let id = check_id(template, positional(template, &args.args, 0, "id")?)?;
    let name = check_name(template, positional(template, &args.args, 1, "name")?)?;
    Ok(format!("bossbar add {id} {name}\n"))
}

fn remove(_compiler: &mut Compiler, args: &Arguments, _namespace: &str) -> CompileResult<String> {
    let template = "template.MinecraftSupport.bossbar.remove";
    let id = check_id(template, positional(template, &args.args, 0, "id")?)?;
    Ok(format!("bossbar remove {id}\n"))
}

fn set_players(_compiler: &mut Compiler, args: &Arguments, _namespace: &str) -> CompileResult<String> {
    let template = "template.MinecraftSupport.bossbar.set_players";
    let id = check_id(template, positional(template, &args.args, 0, "id")?)?;
    let players = str_literal(template, "players", positional(template, &args.args, 1, "players")?)?;
    Ok(format!("bossbar set {id} players {players}\n"))
}

/// Shared lowering of `set_value` / `set_max`.
fn set_numeric(
    template: &str,
    field: &str,
    compiler: &mut Compiler,
    args: &Arguments,
    namespace: &str,
) -> CompileResult<String> {
    let id = check_id(template, positional(template, &args.args, 0, "id")?)?;
    let value = positional(template, &args.args, 1, field)?;
    match value {
        Expr::Name(_) | Expr::Attribute(_) => {
            let cell = compiler.resolve_cell(value, namespace)?;
            let code = compiler.encode(&cell, Objective::Vars);
            let vars = compiler.objective(Objective::Vars);
            Ok(format!(
                "execute store result bossbar {id} {field} run scoreboard players get {code} {vars}\n"
            ))
        }
        literal => {
            let value = check_value(template, compiler, literal)?;
            Ok(format!("bossbar set {id} {field} {value}\n"))
        }
    }
}

fn set_value(compiler: &mut Compiler, args: &Arguments, namespace: &str) -> CompileResult<String> {
    set_numeric(
        "template.MinecraftSupport.bossbar.set_value",
        "value",
        compiler,
        args,
        namespace,
    )
}

fn set_max(compiler: &mut Compiler, args: &Arguments, namespace: &str) -> CompileResult<String> {
    set_numeric("template.MinecraftSupport.bossbar.set_max", "max", compiler, args, namespace)
}

fn set_name(_compiler: &mut Compiler, args: &Arguments, _namespace: &str) -> CompileResult<String> {
    let template = "template.MinecraftSupport.bossbar.set_name";
    let id = check_id(template, positional(template, &args.args, 0, "id")?)?;
    let name = check_name(template, positional(template, &args.args, 1, "name")?)?;
    Ok(format!("bossbar set {id} name {name}\n"))
}

fn set_color(_compiler: &mut Compiler, args: &Arguments, _namespace: &str) -> CompileResult<String> {
    let template = "template.MinecraftSupport.bossbar.set_color";
    let id = check_id(template, positional(template, &args.args, 0, "id")?)?;
    let color = str_literal(template, "color", positional(template, &args.args, 1, "color")?)?;
    if !ALLOWED_COLORS.contains(&color.as_str()) {
        return Err(invalid(template, format!("color must be one of {ALLOWED_COLORS:?}")));
    }
    Ok(format!("bossbar set {id} color {color}\n"))
}

fn set_style(_compiler: &mut Compiler, args: &Arguments, _namespace: &str) -> CompileResult<String> {
    let template = "template.MinecraftSupport.bossbar.set_style";
    let id = check_id(template, positional(template, &args.args, 0, "id")?)?;
    let style_arg = positional(template, &args.args, 1, "style")?;
    let style = match style_arg {
        Expr::StringLiteral(s) => s.value.to_string(),
        _ => format!("notched_{}", int_literal(template, "style", style_arg)?),
    };
    if !ALLOWED_STYLES.contains(&style.as_str()) {
        return Err(invalid(template, format!("style must be one of {ALLOWED_STYLES:?}")));
    }
    Ok(format!("bossbar set {id} style {style}\n"))
}

fn set_visible(_compiler: &mut Compiler, args: &Arguments, _namespace: &str) -> CompileResult<String> {
    let template = "template.MinecraftSupport.bossbar.set_visible";
    let id = check_id(template, positional(template, &args.args, 0, "id")?)?;
    let visible = match positional(template, &args.args, 1, "visible")? {
        Expr::BooleanLiteral(b) => b.value,
        _ => return Err(invalid(template, "visible must be a boolean literal")),
    };
    Ok(format!("bossbar set {id} visible {visible}\n"))
}
