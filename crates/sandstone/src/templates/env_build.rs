//! The `EnvBuild` template module: compile-time environment setup.

use ruff_python_ast::{Arguments, Expr};

use crate::{
    commands::{objective_add, sb_const},
    error::CompileResult,
    lower::Compiler,
    template::TemplateRegistry,
    templates::{int_literal, invalid, positional, str_literal},
};

const BUILD_SCOREBOARD: &str = "template.MinecraftSupport.EnvBuild.build_scoreboard";

pub(crate) fn register(registry: &mut TemplateRegistry) {
    registry.register(BUILD_SCOREBOARD, build_scoreboard);
}

/// `build_scoreboard(objective, {name: value, ...})` — creates a raw engine
/// objective and seeds its cells with constants.
fn build_scoreboard(_compiler: &mut Compiler, args: &Arguments, _namespace: &str) -> CompileResult<String> {
    let objective = str_literal(
        BUILD_SCOREBOARD,
        "objective",
        positional(BUILD_SCOREBOARD, &args.args, 0, "objective")?,
    )?;
    let values = positional(BUILD_SCOREBOARD, &args.args, 1, "values")?;
    let Expr::Dict(dict) = values else {
        return Err(invalid(BUILD_SCOREBOARD, "values must be a literal dict"));
    };

    let mut text = objective_add(&objective);
    for item in &dict.items {
        let key = item
            .key
            .as_ref()
            .ok_or_else(|| invalid(BUILD_SCOREBOARD, "values cannot use ** unpacking"))?;
        let name = str_literal(BUILD_SCOREBOARD, "cell name", key)?;
        let value = int_literal(BUILD_SCOREBOARD, "cell value", &item.value)?;
        text.push_str(&sb_const(&name, &objective, value));
    }
    Ok(text)
}
