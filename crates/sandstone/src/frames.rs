//! Call-frame bookkeeping.
//!
//! The target engine has no call stack, so recursion is simulated by
//! spilling every live integer cell of the calling function to storage
//! stack lists around each outgoing call. This module tracks, per function
//! namespace, the expression temporaries that are currently live, and
//! builds the save/restore command pair: user variables go through the
//! `LocalVars` list, temporaries through `LocalTemp`, each value moved via
//! the transient storage slot. Restore pops both lists tail-first so
//! nested frames unwind in LIFO order.

use indexmap::IndexMap;

use crate::{
    commands::{comment, load_score, storage_pop, storage_push, store_score},
    config::GlobalConfig,
    encoder::ScoreCodes,
    error::{CompileError, CompileResult},
    namespace::{ScopeKind, SymbolTable},
};

#[derive(Debug, Default)]
pub struct CallFrames {
    live: IndexMap<String, Vec<String>>,
}

impl CallFrames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a function (or module) namespace with no live temporaries.
    pub fn init(&mut self, namespace: &str) {
        self.live.entry(namespace.to_owned()).or_default();
    }

    /// Marks a temporary cell as live in its owning namespace.
    pub fn push(&mut self, namespace: &str, cell: &str) {
        self.live.entry(namespace.to_owned()).or_default().push(cell.to_owned());
    }

    /// Drops a temporary after its reset command has been emitted.
    pub fn remove(&mut self, namespace: &str, cell: &str) {
        if let Some(cells) = self.live.get_mut(namespace)
            && let Some(index) = cells.iter().rposition(|c| c == cell)
        {
            cells.remove(index);
        }
    }

    /// Currently-live temporaries of a namespace, oldest first.
    pub fn live(&self, namespace: &str) -> &[String] {
        self.live.get(namespace).map_or(&[], Vec::as_slice)
    }

    /// Builds the (save, restore) command pair for an outgoing call from
    /// `namespace`.
    ///
    /// Save spills every `variable` child of the calling scope and then
    /// every live temporary; restore reloads them in reverse, temporaries
    /// first. Cells that were never written (e.g. a `global` binding that
    /// is only read) are registered on the fly so the round trip stays
    /// total.
    pub fn save_restore(
        &self,
        namespace: &str,
        symbols: &SymbolTable,
        codes: &mut ScoreCodes,
        gconf: &GlobalConfig,
        debug: bool,
    ) -> CompileResult<(String, String)> {
        let scope = symbols.node_at(namespace).ok_or_else(|| CompileError::NameNotFound {
            name: namespace.to_owned(),
            namespace: namespace.to_owned(),
        })?;
        let variables: Vec<String> = scope
            .children_of_kind(ScopeKind::Variable)
            .map(|(_, node)| node.full_namespace.clone())
            .collect();
        let temporaries = self.live(namespace).to_vec();

        let root = &gconf.storage_root;
        let mut save = String::new();
        save.push_str(&comment(debug, "LocalVars.Store", &[]));
        for cell in &variables {
            let code = codes.encode(cell, &gconf.sb_vars);
            save.push_str(&store_score(&code, &gconf.sb_vars, root, &gconf.ds_temp));
            save.push_str(&storage_push(root, &gconf.ds_local_vars, &gconf.ds_temp));
        }
        save.push_str(&comment(debug, "LocalTemp.Store", &[]));
        for cell in &temporaries {
            let code = codes.encode(cell, &gconf.sb_temp);
            save.push_str(&store_score(&code, &gconf.sb_temp, root, &gconf.ds_temp));
            save.push_str(&storage_push(root, &gconf.ds_local_temp, &gconf.ds_temp));
        }

        let mut restore = String::new();
        restore.push_str(&comment(debug, "LocalTemp.Load", &[]));
        for cell in temporaries.iter().rev() {
            let code = codes.encode(cell, &gconf.sb_temp);
            restore.push_str(&load_score(&code, &gconf.sb_temp, root, &gconf.ds_local_temp));
            restore.push_str(&storage_pop(root, &gconf.ds_local_temp));
        }
        restore.push_str(&comment(debug, "LocalVars.Load", &[]));
        for cell in variables.iter().rev() {
            let code = codes.encode(cell, &gconf.sb_vars);
            restore.push_str(&load_score(&code, &gconf.sb_vars, root, &gconf.ds_local_vars));
            restore.push_str(&storage_pop(root, &gconf.ds_local_vars));
        }

        Ok((save, restore))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn setup() -> (SymbolTable, CallFrames, ScoreCodes, GlobalConfig) {
        let mut symbols = SymbolTable::new();
        symbols.init_root("src:mod", ScopeKind::Module);
        symbols.set("f", "src:mod\\f", "src:mod", ScopeKind::Function).unwrap();
        symbols
            .set("n", "src:mod\\f.n", "src:mod\\f", ScopeKind::Variable)
            .unwrap();
        symbols
            .set("ret", "src:mod\\f.ret", "src:mod\\f", ScopeKind::Variable)
            .unwrap();
        let mut frames = CallFrames::new();
        frames.init("src:mod\\f");
        (symbols, frames, ScoreCodes::new(), GlobalConfig::default())
    }

    #[test]
    fn save_spills_variables_then_temporaries() {
        let (symbols, mut frames, mut codes, gconf) = setup();
        frames.push("src:mod\\f", "src:mod\\f.*BinOp1");
        let (save, _) = frames
            .save_restore("src:mod\\f", &symbols, &mut codes, &gconf, false)
            .unwrap();
        let lines: Vec<&str> = save.lines().collect();
        // two variables and one temporary, two commands each
        assert_eq!(lines.len(), 6);
        assert!(lines[0].contains("scoreboard players get a Vars"));
        assert!(lines[1].ends_with("LocalVars append from storage sandstone:runtime Temp"));
        assert!(lines[4].contains("scoreboard players get a Temp"));
        assert!(lines[5].ends_with("LocalTemp append from storage sandstone:runtime Temp"));
    }

    #[test]
    fn restore_pops_in_reverse_order() {
        let (symbols, mut frames, mut codes, gconf) = setup();
        let (save, restore) = frames
            .save_restore("src:mod\\f", &symbols, &mut codes, &gconf, false)
            .unwrap();
        // save writes n (code a) then ret (code b); restore must reload b then a
        assert!(save.find("players get a Vars").unwrap() < save.find("players get b Vars").unwrap());
        assert!(restore.find("score b Vars").unwrap() < restore.find("score a Vars").unwrap());
        assert_eq!(restore.matches("data remove storage").count(), 2);
    }

    #[test]
    fn temporaries_are_removed_after_reset() {
        let (_, mut frames, _, _) = setup();
        frames.push("src:mod\\f", "src:mod\\f.*BinOp1");
        frames.push("src:mod\\f", "src:mod\\f.*BinOp2");
        frames.remove("src:mod\\f", "src:mod\\f.*BinOp1");
        assert_eq!(frames.live("src:mod\\f"), ["src:mod\\f.*BinOp2"]);
        frames.remove("src:mod\\f", "src:mod\\f.*BinOp2");
        assert!(frames.live("src:mod\\f").is_empty());
    }

    #[test]
    fn unregistered_namespace_has_no_live_temporaries() {
        let frames = CallFrames::new();
        assert!(frames.live("src:other").is_empty());
    }
}
