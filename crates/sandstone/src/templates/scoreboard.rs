//! The `scoreboard` template module: raw engine score access.
//!
//! These generators bridge between compiler-managed cells and scoreboards
//! that exist in the world independently of the compiler (created by
//! `EnvBuild.build_scoreboard` or by other datapacks), so the engine-side
//! names are used verbatim without going through the name encoder.

use ruff_python_ast::{Arguments, Expr};

use crate::{
    commands::{sb_assign, sb_const},
    error::CompileResult,
    lower::{Compiler, Objective},
    template::TemplateRegistry,
    templates::{int_literal, invalid, positional, str_literal},
};

const GET_SCORE: &str = "template.MinecraftSupport.scoreboard.get_score";
const SET_SCORE: &str = "template.MinecraftSupport.scoreboard.set_score";

pub(crate) fn register(registry: &mut TemplateRegistry) {
    registry.register(GET_SCORE, get_score);
    registry.register(SET_SCORE, set_score);
}

/// `get_score(name, objective)` — reads a raw engine score into the calling
/// scope's result-temp, from where an enclosing assignment picks it up.
fn get_score(compiler: &mut Compiler, args: &Arguments, namespace: &str) -> CompileResult<String> {
    if args.args.len() != 2 {
        return Err(invalid(GET_SCORE, "expected (name, objective)"));
    }
    let name = str_literal(GET_SCORE, "name", &args.args[0])?;
    let objective = str_literal(GET_SCORE, "objective", &args.args[1])?;

    let result = compiler.result_cell(namespace);
    let code = compiler.encode(&result, Objective::Temp);
    let temp = compiler.objective(Objective::Temp).to_owned();
    Ok(sb_assign(&code, &temp, &name, &objective))
}

/// `set_score(name, objective, value)` — writes a raw engine score from a
/// literal or from a compiled variable.
fn set_score(compiler: &mut Compiler, args: &Arguments, namespace: &str) -> CompileResult<String> {
    if args.args.len() != 3 {
        return Err(invalid(SET_SCORE, "expected (name, objective, value)"));
    }
    let name = str_literal(SET_SCORE, "name", &args.args[0])?;
    let objective = str_literal(SET_SCORE, "objective", &args.args[1])?;

    let value = positional(SET_SCORE, &args.args, 2, "value")?;
    match value {
        Expr::Name(_) | Expr::Attribute(_) => {
            let cell = compiler.resolve_cell(value, namespace)?;
            let code = compiler.encode(&cell, Objective::Vars);
            let vars = compiler.objective(Objective::Vars).to_owned();
            Ok(sb_assign(&name, &objective, &code, &vars))
        }
        literal => {
            let value = int_literal(SET_SCORE, "value", literal)?;
            Ok(sb_const(&name, &objective, value))
        }
    }
}
