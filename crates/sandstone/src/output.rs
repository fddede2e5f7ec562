//! Emission of the command-file tree.
//!
//! Every namespace maps to a directory under the output root (`\` becomes
//! `/`, the `root:` prefix is dropped); directories are created on demand
//! and each emitted file is recorded so callers can inspect what was
//! written. All files are UTF-8 `.mcfunction` text with `\n` line endings.

use std::{
    fs,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;

use crate::{error::CompileResult, namespace::strip_root};

/// Name of the per-module initialiser file.
pub const MODULE_FILE: &str = ".__module";
/// Name of the runtime-initialisation file written at the output root.
pub const INIT_FILE: &str = ".__init__";
/// Subdirectory holding a scope's conditional branch files.
pub const IF_DIR: &str = ".if";

const EXT: &str = "mcfunction";

/// The file namespace: where each emitted command file lives on disk.
#[derive(Debug)]
pub struct FileTree {
    output_root: PathBuf,
    files: IndexMap<String, PathBuf>,
}

impl FileTree {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            files: IndexMap::new(),
        }
    }

    /// The directory a namespace's files are written into.
    pub fn dir_of(&self, namespace: &str) -> PathBuf {
        let mut dir = self.output_root.clone();
        for part in strip_root(namespace).split('\\') {
            dir.push(part);
        }
        dir
    }

    /// Writes the `.__module` initialiser of a module namespace.
    pub fn write_module(&mut self, namespace: &str, text: &str) -> CompileResult<()> {
        let path = self.dir_of(namespace).join(format!("{MODULE_FILE}.{EXT}"));
        self.write(format!("{namespace}\\{MODULE_FILE}"), &path, text)
    }

    /// Writes a function body file under its enclosing namespace.
    pub fn write_function(&mut self, parent_namespace: &str, name: &str, text: &str) -> CompileResult<()> {
        let path = self.dir_of(parent_namespace).join(format!("{name}.{EXT}"));
        self.write(format!("{parent_namespace}\\{name}"), &path, text)
    }

    /// Writes one branch file of a conditional, `<uid>` or `<uid>-else`.
    pub fn write_branch(&mut self, namespace: &str, uid: &str, is_else: bool, text: &str) -> CompileResult<()> {
        let suffix = if is_else { "-else" } else { "" };
        let file = format!("{uid}{suffix}");
        let path = self.dir_of(namespace).join(IF_DIR).join(format!("{file}.{EXT}"));
        self.write(format!("{namespace}\\{IF_DIR}\\{file}"), &path, text)
    }

    /// Writes the runtime-initialisation file at the output root.
    pub fn write_runtime_init(&mut self, text: &str) -> CompileResult<()> {
        let path = self.output_root.join(format!("{INIT_FILE}.{EXT}"));
        self.write(INIT_FILE.to_owned(), &path, text)
    }

    fn write(&mut self, file_namespace: String, path: &Path, text: &str) -> CompileResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, text)?;
        self.files.insert(file_namespace, path.to_owned());
        Ok(())
    }

    /// Emitted files: file namespace → on-disk path, in emission order.
    pub fn files(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.files.iter().map(|(ns, path)| (ns.as_str(), path.as_path()))
    }

    /// Looks up where a file namespace was written.
    pub fn path_of(&self, file_namespace: &str) -> Option<&Path> {
        self.files.get(file_namespace).map(PathBuf::as_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespaces_map_to_slash_paths() {
        let dir = tempfile::tempdir().unwrap();
        let tree = FileTree::new(dir.path());
        assert_eq!(tree.dir_of("src:mod\\f"), dir.path().join("mod").join("f"));
    }

    #[test]
    fn writes_create_directories_and_record_paths() {
        let dir = tempfile::tempdir().unwrap();
        let mut tree = FileTree::new(dir.path());
        tree.write_module("src:mod", "# hi\n").unwrap();
        tree.write_function("src:mod", "f", "say f\n").unwrap();
        tree.write_branch("src:mod\\f", "1", false, "").unwrap();
        tree.write_branch("src:mod\\f", "1", true, "").unwrap();

        assert!(dir.path().join("mod/.__module.mcfunction").is_file());
        assert!(dir.path().join("mod/f.mcfunction").is_file());
        assert!(dir.path().join("mod/f/.if/1.mcfunction").is_file());
        assert!(dir.path().join("mod/f/.if/1-else.mcfunction").is_file());
        assert_eq!(
            tree.path_of("src:mod\\f").unwrap(),
            dir.path().join("mod/f.mcfunction")
        );
        assert_eq!(tree.files().count(), 4);
    }
}
