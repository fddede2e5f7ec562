//! Scoreboard name encoding.
//!
//! Cell names produced by lowering are full namespaces and easily exceed the
//! engine's identifier length limit, so every (name, objective) pair is
//! mapped to a short id generated from a per-objective counter. The reverse
//! table is kept so debug emission can show the original name next to the
//! live score.

use indexmap::IndexMap;

use crate::{
    commands,
    error::{CompileError, CompileResult},
};

#[derive(Debug, Default)]
struct ObjectiveCodes {
    name_to_code: IndexMap<String, String>,
    code_to_name: IndexMap<String, String>,
    next: u64,
}

/// Bidirectional name↔short-id tables, one pair per objective.
///
/// Encoding is deterministic: the first appearance of a name allocates the
/// next id of that objective's counter, later appearances return the same
/// id. Each allocation also records a one-line registration command so the
/// runtime init file can create every cell up front.
#[derive(Debug, Default)]
pub struct ScoreCodes {
    objectives: IndexMap<String, ObjectiveCodes>,
    registrations: Vec<String>,
}

impl ScoreCodes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the short id for `name` on `objective`, allocating one on
    /// first appearance.
    pub fn encode(&mut self, name: &str, objective: &str) -> String {
        let table = self.objectives.entry(objective.to_owned()).or_default();
        if let Some(code) = table.name_to_code.get(name) {
            return code.clone();
        }
        table.next += 1;
        let code = render_code(table.next);
        table.name_to_code.insert(name.to_owned(), code.clone());
        table.code_to_name.insert(code.clone(), name.to_owned());
        self.registrations.push(commands::sb_register(&code, objective));
        code
    }

    /// Returns the short id for an already-encoded name.
    ///
    /// Callers that are about to reset or read back a cell must have emitted
    /// it first; an unknown name here is a compiler bug surfaced as
    /// [`CompileError::UnknownCell`].
    pub fn code_of(&self, name: &str, objective: &str) -> CompileResult<String> {
        self.objectives
            .get(objective)
            .and_then(|table| table.name_to_code.get(name))
            .cloned()
            .ok_or_else(|| CompileError::UnknownCell {
                name: name.to_owned(),
                objective: objective.to_owned(),
            })
    }

    /// Reverse lookup used by debug emission.
    pub fn name_of(&self, code: &str, objective: &str) -> Option<&str> {
        self.objectives
            .get(objective)
            .and_then(|table| table.code_to_name.get(code))
            .map(String::as_str)
    }

    /// Registration commands for every cell allocated so far, in allocation
    /// order.
    pub fn registrations(&self) -> &[String] {
        &self.registrations
    }
}

/// Renders a counter value in bijective base-26: 1 → `a`, 26 → `z`,
/// 27 → `aa`.
fn render_code(mut n: u64) -> String {
    debug_assert!(n > 0);
    let mut out = Vec::new();
    while n > 0 {
        n -= 1;
        out.push(b'a' + (n % 26) as u8);
        n /= 26;
    }
    out.reverse();
    String::from_utf8(out).expect("ascii by construction")
}
