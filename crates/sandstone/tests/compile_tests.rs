//! End-to-end compilation tests.
//!
//! Each test builds a small source tree in a temp directory, runs the
//! compiler and asserts on the emitted `.mcfunction` tree: which files
//! exist, which commands they contain, and in what order.

use std::{fs, path::Path};

use pretty_assertions::assert_eq;
use sandstone::{CompileConfig, CompileError, Compiler, ScopeKind};

/// Writes the given sources, compiles `entry`, and returns the output dir
/// handle plus the compiler for table inspection.
fn compile(sources: &[(&str, &str)], entry: &str) -> (tempfile::TempDir, Compiler) {
    try_compile(sources, entry).expect("compilation should succeed")
}

fn try_compile(sources: &[(&str, &str)], entry: &str) -> Result<(tempfile::TempDir, Compiler), CompileError> {
    let src = tempfile::tempdir().unwrap();
    for (name, text) in sources {
        let path = src.path().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }
    let out = tempfile::tempdir().unwrap();
    let config = CompileConfig::new(src.path(), src.path().join("template"), out.path(), "source_code:");
    let mut compiler = Compiler::new(config);
    compiler.compile(entry)?;
    compiler.finish()?;
    Ok((out, compiler))
}

fn read(dir: &Path, relative: &str) -> String {
    fs::read_to_string(dir.join(relative)).unwrap_or_else(|err| panic!("missing {relative}: {err}"))
}

/// Byte-for-byte snapshot of an output tree: sorted relative paths plus
/// contents.
fn snapshot(dir: &Path) -> Vec<(String, String)> {
    fn walk(root: &Path, dir: &Path, into: &mut Vec<(String, String)>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(root, &path, into);
            } else {
                let relative = path.strip_prefix(root).unwrap().to_string_lossy().into_owned();
                into.push((relative, fs::read_to_string(&path).unwrap()));
            }
        }
    }
    let mut files = Vec::new();
    walk(dir, dir, &mut files);
    files.sort();
    files
}

const FACTORIAL: &str = "\
def factorial(n):
    if n == 0:
        return 1
    else:
        value = n - 1
        ret = factorial(value)
        return n * ret

x = factorial(5)
";

// === scenario: recursion =====================================================

#[test]
fn recursion_emits_branch_files_and_module() {
    let (out, _) = compile(&[("recursive.py", FACTORIAL)], "recursive");
    assert!(out.path().join("recursive/.__module.mcfunction").is_file());
    assert!(out.path().join("recursive/factorial.mcfunction").is_file());
    assert!(out.path().join("recursive/factorial/.if/1.mcfunction").is_file());
    assert!(out.path().join("recursive/factorial/.if/1-else.mcfunction").is_file());
    assert!(out.path().join(".__init__.mcfunction").is_file());

    let module = read(out.path(), "recursive/.__module.mcfunction");
    assert!(module.contains("function source_code:recursive/factorial\n"));
}

#[test]
fn recursive_call_saves_and_restores_the_frame() {
    let (out, _) = compile(&[("recursive.py", FACTORIAL)], "recursive");
    let else_branch = read(out.path(), "recursive/factorial/.if/1-else.mcfunction");

    let call_at = else_branch
        .find("function source_code:recursive/factorial\n")
        .expect("recursive invocation in the else branch");
    let (before, after) = else_branch.split_at(call_at);

    // the save phase spills the caller's variables onto the LocalVars stack
    assert!(before.contains("data modify storage sandstone:runtime LocalVars append from storage sandstone:runtime Temp"));
    // and the restore phase pops them back, tail first
    assert!(after.contains("execute store result score"));
    assert!(after.contains("data remove storage sandstone:runtime LocalVars[-1]"));
}

/// Save order must be the exact reverse of restore order, or unwinding a
/// recursion of depth d would scramble the frames.
#[test]
fn save_and_restore_orders_mirror_each_other() {
    let (out, _) = compile(&[("recursive.py", FACTORIAL)], "recursive");
    let else_branch = read(out.path(), "recursive/factorial/.if/1-else.mcfunction");

    let saved: Vec<&str> = else_branch
        .lines()
        .filter_map(|line| {
            line.strip_prefix("execute store result storage sandstone:runtime Temp int 1 run scoreboard players get ")
        })
        .map(|rest| rest.split_whitespace().next().unwrap())
        .collect();
    let restored: Vec<&str> = else_branch
        .lines()
        .filter_map(|line| line.strip_prefix("execute store result score "))
        .map(|rest| rest.split_whitespace().next().unwrap())
        .collect();

    assert!(!saved.is_empty());
    let mut expected: Vec<&str> = saved.clone();
    expected.reverse();
    assert_eq!(restored, expected);
}

#[test]
fn caller_consumes_and_clears_the_return_cell() {
    let (out, compiler) = compile(&[("recursive.py", FACTORIAL)], "recursive");
    let module = read(out.path(), "recursive/.__module.mcfunction");

    let ret_code = compiler
        .codes()
        .code_of("source_code:recursive\\factorial", "FuncResult")
        .unwrap();
    let call_at = module.find("function source_code:recursive/factorial\n").unwrap();
    let after_call = &module[call_at..];
    let copy_at = after_call
        .find(&format!("= {ret_code} FuncResult"))
        .expect("return value copied into the caller's result-temp");
    let reset_at = after_call
        .find(&format!("scoreboard players reset {ret_code} FuncResult"))
        .expect("return cell reset after consumption");
    assert!(copy_at < reset_at);
}

// === scenario: cross-module read ============================================

#[test]
fn import_lowers_the_module_and_reads_its_cells() {
    let sources = [("a.py", "x = 7\n"), ("b.py", "import a\ny = a.x\n")];
    let (out, compiler) = compile(&sources, "b");

    assert!(out.path().join("a/.__module.mcfunction").is_file());
    let module_b = read(out.path(), "b/.__module.mcfunction");
    assert!(module_b.contains("function source_code:a/.__module\n"));

    // y reads the exact cell a.x was assigned to
    let (x_cell, _) = compiler.symbols().get("x", "source_code:a").unwrap();
    assert_eq!(x_cell, "source_code:a.x");
    let x_code = compiler.codes().code_of(&x_cell, "Vars").unwrap();
    assert!(module_b.contains(&format!("= {x_code} Vars")));

    let (y_cell, _) = compiler.symbols().get("y", "source_code:b").unwrap();
    assert_eq!(y_cell, "source_code:b.y");
}

#[test]
fn cyclic_imports_terminate() {
    let sources = [("a.py", "import b\nx = 1\n"), ("b.py", "import a\ny = 2\n")];
    let (out, _) = compile(&sources, "a");
    assert!(out.path().join("a/.__module.mcfunction").is_file());
    assert!(out.path().join("b/.__module.mcfunction").is_file());
}

// === scenario: from-import aliasing =========================================

#[test]
fn from_import_alias_dereferences_to_the_target_function() {
    let sources = [
        ("m.py", "def f(a):\n    return a\n"),
        ("main.py", "from m import f as g\n\nx = g(2)\n"),
    ];
    let (out, compiler) = compile(&sources, "main");

    // the alias is an attribute node pointing into m
    let (node, _) = compiler.symbols().get_raw("g", "source_code:main").unwrap();
    assert_eq!(node.kind, ScopeKind::Attribute);
    assert_eq!(node.full_namespace, "source_code:m|f");

    // and the call site invokes m's function file
    let module = read(out.path(), "main/.__module.mcfunction");
    assert!(module.contains("function source_code:m/f\n"));
    assert!(out.path().join("m/f.mcfunction").is_file());
}

// === scenario: if/else ======================================================

#[test]
fn if_else_emits_two_branch_files_and_resets_the_condition() {
    let source = "a = 1\nb = 2\nif a > b:\n    x = 1\nelse:\n    x = 2\n";
    let (out, compiler) = compile(&[("cond.py", source)], "cond");

    let module = read(out.path(), "cond/.__module.mcfunction");
    let result_code = compiler.codes().code_of("source_code:cond.?Result", "Temp").unwrap();
    let false_code = compiler.codes().code_of("FALSE", "Flags").unwrap();
    assert!(module.contains(&format!(
        "execute unless score {result_code} Temp = {false_code} Flags run function source_code:cond/.if/1\n"
    )));
    assert!(module.contains(&format!(
        "execute if score {result_code} Temp = {false_code} Flags run function source_code:cond/.if/1-else\n"
    )));

    // both branches write the same x cell
    let x_code = compiler.codes().code_of("source_code:cond.x", "Vars").unwrap();
    let true_branch = read(out.path(), "cond/.if/1.mcfunction");
    let else_branch = read(out.path(), "cond/.if/1-else.mcfunction");
    assert!(true_branch.contains(&format!("scoreboard players operation {x_code} Vars =")));
    assert!(else_branch.contains(&format!("scoreboard players operation {x_code} Vars =")));

    // the condition's result-temp is reset after the dispatch pair
    let dispatch_at = module.find("run function source_code:cond/.if/1-else").unwrap();
    let reset = format!("scoreboard players reset {result_code} Temp");
    assert!(module[dispatch_at..].contains(&reset));
}

#[test]
fn elif_chains_nest_inside_the_else_branch() {
    let source = "a = 1\nif a == 1:\n    x = 1\nelif a == 2:\n    x = 2\nelse:\n    x = 3\n";
    let (out, _) = compile(&[("chain.py", source)], "chain");

    // the elif lowers to a second conditional pair inside 1-else
    let else_branch = read(out.path(), "chain/.if/1-else.mcfunction");
    assert!(else_branch.contains("run function source_code:chain/.if/2\n"));
    assert!(else_branch.contains("run function source_code:chain/.if/2-else\n"));
    assert!(out.path().join("chain/.if/2.mcfunction").is_file());
    assert!(out.path().join("chain/.if/2-else.mcfunction").is_file());
}

// === scenario: template calls ===============================================

#[test]
fn template_call_is_delegated_without_marshalling() {
    let source = "\
from template.MinecraftSupport.builtin import tprint

a = 1
b = 2
tprint(a, b)
";
    let (out, _) = compile(&[("tpl.py", source)], "tpl");
    let module = read(out.path(), "tpl/.__module.mcfunction");

    // the generator's tellraw appears verbatim; nothing is marshalled into
    // Args cells and no runtime print function is invoked
    let tellraw = module
        .lines()
        .find(|line| line.starts_with("tellraw @a "))
        .expect("tprint emits a tellraw line");
    assert!(tellraw.contains("\"score\""));
    assert!(tellraw.contains("\"objective\":\"Vars\""));
    assert!(!module.contains(" Args "));
    assert!(!module.contains("function python:built-in/print"));
}

#[test]
fn package_from_import_initialises_the_template_module() {
    let source = "\
from template.MinecraftSupport import scoreboard
from template.MinecraftSupport.EnvBuild import build_scoreboard

build_scoreboard(\"num\", {\"value\": 5})
num = scoreboard.get_score(\"value\", \"num\")
";
    let (out, compiler) = compile(&[("env.py", source)], "env");
    let module = read(out.path(), "env/.__module.mcfunction");

    assert!(module.contains("scoreboard objectives add num dummy\n"));
    assert!(module.contains("scoreboard players set value num 5\n"));

    // get_score reads the raw engine cell into the result-temp
    let result_code = compiler.codes().code_of("source_code:env.?Result", "Temp").unwrap();
    assert!(module.contains(&format!("scoreboard players operation {result_code} Temp = value num\n")));
}

// === scenario: unknown nodes ================================================

#[test]
fn unknown_nodes_degrade_and_compilation_continues() {
    let source = "x = 1\nwhile x:\n    x = 2\ny = 3\n";
    let (out, compiler) = compile(&[("deg.py", source)], "deg");
    let module = read(out.path(), "deg/.__module.mcfunction");

    let tellraw_at = module
        .find("tellraw @a [{\"text\":\"unparseable node: source_code:deg.While\",\"color\":\"red\"}]")
        .expect("diagnostic command for the while loop");
    assert!(module.contains("# unparseable node While:"));

    // the statement after the loop still compiled
    let y_code = compiler.codes().code_of("source_code:deg.y", "Vars").unwrap();
    let y_at = module
        .find(&format!("scoreboard players operation {y_code} Vars ="))
        .expect("assignment after the unknown node");
    assert!(tellraw_at < y_at);
}

// === argument policy ========================================================

#[test]
fn defaults_fill_the_trailing_slots() {
    let source = "\
def f(a, b=1, c=2):
    return a

f(4)
f(4, 5)
f(4, 5, 6)
";
    let (out, _) = compile(&[("defs.py", source)], "defs");
    let module = read(out.path(), "defs/.__module.mcfunction");
    assert_eq!(module.matches("function source_code:defs/f\n").count(), 3);
    // first call takes both defaults, second only c's
    assert_eq!(module.matches(" Temp 1\n").count(), 1);
    assert_eq!(module.matches(" Temp 2\n").count(), 2);
}

#[test]
fn missing_required_argument_fails() {
    let source = "def f(a, b=1):\n    return a\n\nf()\n";
    let err = try_compile(&[("bad.py", source)], "bad").unwrap_err();
    assert!(matches!(err, CompileError::MissingArgument { param, .. } if param == "a"));
}

#[test]
fn surplus_argument_fails() {
    let source = "def f(a):\n    return a\n\nf(1, 2)\n";
    let err = try_compile(&[("bad.py", source)], "bad").unwrap_err();
    assert!(matches!(err, CompileError::ExtraArgument { .. }));
}

#[test]
fn non_literal_defaults_are_rejected() {
    let source = "def f(a=[]):\n    return a\n";
    let err = try_compile(&[("bad.py", source)], "bad").unwrap_err();
    assert!(matches!(err, CompileError::UnsupportedDefault { param, .. } if param == "a"));
}

// === globals ================================================================

#[test]
fn global_rebinds_to_the_root_cell() {
    let source = "\
x = 1

def f():
    global x
    x = 5

f()
";
    let (out, compiler) = compile(&[("glob.py", source)], "glob");
    let x_code = compiler.codes().code_of("source_code:glob.x", "Vars").unwrap();
    let body = read(out.path(), "glob/f.mcfunction");
    assert!(body.contains(&format!("scoreboard players operation {x_code} Vars =")));
}

// === builtins ===============================================================

#[test]
fn builtin_print_marshals_into_the_runtime_pack() {
    let source = "a = 3\nprint(a)\n";
    let (out, _) = compile(&[("p.py", source)], "p");
    let module = read(out.path(), "p/.__module.mcfunction");
    assert!(module.contains("function python:built-in/print\n"));
    // one supplied slot marshalled, omitted slots emit nothing
    assert_eq!(module.matches(" Args =").count(), 1);
}

// === runtime init ===========================================================

#[test]
fn runtime_init_creates_objectives_and_flags() {
    let (out, compiler) = compile(&[("recursive.py", FACTORIAL)], "recursive");
    let init = read(out.path(), ".__init__.mcfunction");
    for objective in ["Args", "Vars", "Temp", "Flags", "FuncResult", "Input"] {
        assert!(init.contains(&format!("scoreboard objectives add {objective} dummy\n")));
    }
    for (flag, value) in [("FALSE", 0), ("TRUE", 1), ("NEG", -1), ("DECIMAL", 1000)] {
        let code = compiler.codes().code_of(flag, "Flags").unwrap();
        assert!(init.contains(&format!("scoreboard players set {code} Flags {value}\n")));
    }
    // every allocated cell is registered up front
    let result_code = compiler.codes().code_of("source_code:recursive.?Result", "Temp").unwrap();
    assert!(init.contains(&format!("scoreboard players add {result_code} Temp 0\n")));
}

// === errors =================================================================

#[test]
fn missing_modules_are_import_errors() {
    let err = try_compile(&[("main.py", "import nowhere\n")], "main").unwrap_err();
    assert!(matches!(err, CompileError::ImportNotFound { name } if name == "nowhere"));
}

#[test]
fn relative_imports_are_unsupported() {
    let err = try_compile(&[("main.py", "from . import x\n")], "main").unwrap_err();
    assert!(matches!(err, CompileError::UnsupportedImport { .. }));
}

#[test]
fn unresolved_names_fail() {
    let err = try_compile(&[("main.py", "x = missing\n")], "main").unwrap_err();
    assert!(matches!(err, CompileError::NameNotFound { name, .. } if name == "missing"));
}

#[test]
fn string_constants_are_unsupported() {
    let err = try_compile(&[("main.py", "x = \"hello\"\n")], "main").unwrap_err();
    assert!(matches!(err, CompileError::UnsupportedConstant { .. }));
}

// === determinism ============================================================

#[test]
fn identical_input_yields_byte_identical_output() {
    let sources = [
        ("m.py", "def f(a):\n    return a\n"),
        (
            "main.py",
            "from m import f as g\n\nx = g(2)\nif x > 1:\n    y = 1\nelse:\n    y = 2\n",
        ),
    ];
    let (out_a, _) = compile(&sources, "main");
    let (out_b, _) = compile(&sources, "main");
    assert_eq!(snapshot(out_a.path()), snapshot(out_b.path()));
}
