//! Pure command-text builders.
//!
//! Every function here formats exactly one command of the target engine and
//! returns it with a trailing newline, except the `*_inline` forms which are
//! meant to be composed inside an `execute … run <inner>` wrapper. None of
//! them consult compiler state; callers pass already-encoded cell ids.

use serde_json::{Value, json};

/// Scoreboard binary operations, rendered as the engine's operation tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ScoreOp {
    #[strum(serialize = "+=")]
    Add,
    #[strum(serialize = "-=")]
    Sub,
    #[strum(serialize = "*=")]
    Mul,
    #[strum(serialize = "/=")]
    Div,
    #[strum(serialize = "%=")]
    Mod,
    #[strum(serialize = "<")]
    Min,
    #[strum(serialize = ">")]
    Max,
    #[strum(serialize = "><")]
    Swap,
}

/// Whether a conditional runs on a match or on a non-match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum CheckKind {
    If,
    Unless,
}

/// Score comparison operators accepted by `execute if|unless score`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Comparison {
    #[strum(serialize = "<")]
    Less,
    #[strum(serialize = "<=")]
    LessEqual,
    #[strum(serialize = "=")]
    Equal,
    #[strum(serialize = ">=")]
    MoreEqual,
    #[strum(serialize = ">")]
    More,
}

/// Labels prefixed to debug output so in-game logs can be filtered by step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum DebugTip {
    Init,
    Set,
    Assign,
    Reset,
    Result,
    Call,
    CallTemplate,
    SetArg,
    Calc,
    Branch,
}

/// `a ← b` between two score cells.
pub fn sb_assign(a: &str, obj_a: &str, b: &str, obj_b: &str) -> String {
    format!("{}\n", sb_assign_inline(a, obj_a, b, obj_b))
}

/// Newline-free form of [`sb_assign`] for `execute … run` composition.
pub fn sb_assign_inline(a: &str, obj_a: &str, b: &str, obj_b: &str) -> String {
    format!("scoreboard players operation {a} {obj_a} = {b} {obj_b}")
}

/// `a ← k` for a literal constant.
pub fn sb_const(a: &str, obj: &str, value: i32) -> String {
    format!("scoreboard players set {a} {obj} {value}\n")
}

/// `a ⊕= b` between two score cells.
pub fn sb_op(op: ScoreOp, a: &str, obj_a: &str, b: &str, obj_b: &str) -> String {
    format!("scoreboard players operation {a} {obj_a} {op} {b} {obj_b}\n")
}

/// Removes the cell from its objective.
pub fn sb_reset(a: &str, obj: &str) -> String {
    format!("scoreboard players reset {a} {obj}\n")
}

/// Registration command creating a cell at zero without disturbing it if it
/// already exists.
pub fn sb_register(a: &str, obj: &str) -> String {
    format!("scoreboard players add {a} {obj} 0\n")
}

/// Creates an objective of the plain `dummy` criterion.
pub fn objective_add(obj: &str) -> String {
    format!("scoreboard objectives add {obj} dummy\n")
}

/// Conditionally runs `inner` (given without its newline) when the score
/// comparison holds.
pub fn check_sb(
    kind: CheckKind,
    a: &str,
    obj_a: &str,
    cmp: Comparison,
    b: &str,
    obj_b: &str,
    inner: &str,
) -> String {
    format!("execute {kind} score {a} {obj_a} {cmp} {b} {obj_b} run {inner}\n")
}

/// Invocation of another command file.
pub fn function_call(path: &str) -> String {
    format!("function {path}\n")
}

/// Newline-free form of [`function_call`] for `execute … run` composition.
pub fn function_call_inline(path: &str) -> String {
    format!("function {path}")
}

/// Reads a score into the transient storage slot as an int.
pub fn store_score(a: &str, obj: &str, root: &str, slot: &str) -> String {
    format!("execute store result storage {root} {slot} int 1 run scoreboard players get {a} {obj}\n")
}

/// Pushes the transient storage slot onto a storage stack list.
pub fn storage_push(root: &str, stack: &str, slot: &str) -> String {
    format!("data modify storage {root} {stack} append from storage {root} {slot}\n")
}

/// Reads the tail of a storage stack list back into a score.
pub fn load_score(a: &str, obj: &str, root: &str, stack: &str) -> String {
    format!("execute store result score {a} {obj} run data get storage {root} {stack}[-1] 1\n")
}

/// Drops the tail of a storage stack list.
pub fn storage_pop(root: &str, stack: &str) -> String {
    format!("data remove storage {root} {stack}[-1]\n")
}

/// Broadcast of raw text components to every player.
pub fn tellraw(components: &[Value]) -> String {
    format!("tellraw @a {}\n", Value::Array(components.to_vec()))
}

/// One-line comment tagged with optional `key=value` context.
///
/// No-op outside debug mode.
pub fn comment(debug: bool, tag: &str, kv: &[(&str, &str)]) -> String {
    if !debug {
        return String::new();
    }
    let mut line = format!("# {tag}");
    for (key, value) in kv {
        line.push_str(&format!(" {key}={value}"));
    }
    line.push('\n');
    line
}

/// Multi-line text rendered as a block of comment lines, one `#` per line.
///
/// Unlike [`comment`] this is not debug-gated; it carries structural
/// diagnostics that must survive into the output.
pub fn comment_block(text: &str) -> String {
    let mut out = String::new();
    for line in text.lines() {
        out.push_str("# ");
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Debug broadcast of free-form components behind a `[Debug] <tip>` label.
///
/// No-op outside debug mode.
pub fn debug_text(debug: bool, tip: DebugTip, components: &[Value]) -> String {
    if !debug {
        return String::new();
    }
    let mut all = vec![json!({"text": format!("[Debug] {tip} "), "color": "gray"})];
    all.extend_from_slice(components);
    tellraw(&all)
}

/// Debug broadcast showing a named cell's long name and live score, with an
/// optional `from` cell when the step moved a value.
///
/// No-op outside debug mode.
pub fn debug_objective(
    debug: bool,
    tip: DebugTip,
    objective: &str,
    name: &str,
    code: &str,
    from: Option<(&str, &str, &str)>,
) -> String {
    if !debug {
        return String::new();
    }
    let mut components = vec![
        json!({"text": format!("{name} "), "color": "gold"}),
        json!({"score": {"name": code, "objective": objective}}),
    ];
    if let Some((from_objective, from_name, from_code)) = from {
        components.push(json!({"text": format!(" <- {from_name} "), "color": "gold"}));
        components.push(json!({"score": {"name": from_code, "objective": from_objective}}));
    }
    debug_text(debug, tip, &components)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn assign_formats_operation() {
        assert_eq!(
            sb_assign("a", "Vars", "b", "Temp"),
            "scoreboard players operation a Vars = b Temp\n"
        );
    }

    #[test]
    fn op_tokens_match_engine_syntax() {
        assert_eq!(ScoreOp::Add.to_string(), "+=");
        assert_eq!(ScoreOp::Div.to_string(), "/=");
        assert_eq!(ScoreOp::Swap.to_string(), "><");
        assert_eq!(
            sb_op(ScoreOp::Mul, "x", "Temp", "y", "Temp"),
            "scoreboard players operation x Temp *= y Temp\n"
        );
    }

    #[test]
    fn check_wraps_inline_command() {
        let inner = sb_assign_inline("r", "Temp", "t", "Flags");
        assert_eq!(
            check_sb(CheckKind::Unless, "c", "Temp", Comparison::Equal, "f", "Flags", &inner),
            "execute unless score c Temp = f Flags run scoreboard players operation r Temp = t Flags\n"
        );
    }

    #[test]
    fn storage_pair_round_trips_through_temp_slot() {
        assert_eq!(
            store_score("a", "Vars", "sandstone:runtime", "Temp"),
            "execute store result storage sandstone:runtime Temp int 1 run scoreboard players get a Vars\n"
        );
        assert_eq!(
            storage_push("sandstone:runtime", "LocalVars", "Temp"),
            "data modify storage sandstone:runtime LocalVars append from storage sandstone:runtime Temp\n"
        );
        assert_eq!(
            load_score("a", "Vars", "sandstone:runtime", "LocalVars"),
            "execute store result score a Vars run data get storage sandstone:runtime LocalVars[-1] 1\n"
        );
        assert_eq!(
            storage_pop("sandstone:runtime", "LocalVars"),
            "data remove storage sandstone:runtime LocalVars[-1]\n"
        );
    }

    #[test]
    fn comment_and_debug_are_noops_when_disabled() {
        assert_eq!(comment(false, "Assign", &[("name", "x")]), "");
        assert_eq!(debug_text(false, DebugTip::Call, &[]), "");
        assert_eq!(debug_objective(false, DebugTip::Set, "Vars", "n", "a", None), "");
    }

    #[test]
    fn comment_renders_tag_and_context() {
        assert_eq!(
            comment(true, "Assign", &[("name", "x"), ("uid", "3")]),
            "# Assign name=x uid=3\n"
        );
    }

    #[test]
    fn comment_block_prefixes_every_line() {
        assert_eq!(comment_block("a\nb"), "# a\n# b\n");
    }
}
