//! Configuration directory discovery
//!
//! Resolves where the definitions of a resource kind live across an ordered
//! set of configuration directories:
//!
//! ```text
//! <root>/<kind dir>/*.json|*.xml                      global definitions
//! <root>/databases/<database>/<kind dir>/*            scoped to <database>
//! <root>/flexrep/configs/<config>-targets/*           targets of <config>
//! ```
//!
//! Order is configuration-directory order, then the global directory before
//! database directories (sorted by database name), then lexical file order.
//! Absent directories contribute nothing and are never an error.

use crate::resource::Scope;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// One configuration root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDir {
    root: PathBuf,
}

impl ConfigDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn databases_dir(&self) -> PathBuf {
        self.root.join("databases")
    }

    /// `databases/<name>/` subdirectories, sorted by name
    pub fn database_resource_dirs(&self) -> Result<Vec<(String, PathBuf)>> {
        let dir = self.databases_dir();
        let mut found = Vec::new();
        for path in subdirectories(&dir)? {
            let name = path.file_name().and_then(|n| n.to_str()).map(str::to_string);
            if let Some(name) = name {
                found.push((name, path));
            }
        }
        Ok(found)
    }
}

/// A directory of definitions plus the scope it implies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUnit {
    pub path: PathBuf,
    pub scope: Scope,
}

/// Directories holding definitions under `kind_dir`.
///
/// Global directories get an empty scope; the caller supplies its default.
pub fn resolve(
    dirs: &[ConfigDir],
    kind_dir: &str,
    include_database_dirs: bool,
) -> Result<Vec<ResolvedUnit>> {
    let mut units = Vec::new();
    for dir in dirs {
        let global = dir.root().join(kind_dir);
        if global.is_dir() {
            units.push(ResolvedUnit {
                path: global,
                scope: Scope::global(),
            });
        }

        if include_database_dirs {
            for (database, db_dir) in dir.database_resource_dirs()? {
                let path = db_dir.join(kind_dir);
                if path.is_dir() {
                    units.push(ResolvedUnit {
                        path,
                        scope: Scope::database(database),
                    });
                }
            }
        }
    }
    Ok(units)
}

/// Directories named `<parent>/<name><suffix>`, scoped to `<name>` as parent.
pub fn resolve_suffixed(
    dirs: &[ConfigDir],
    parent_dir: &str,
    suffix: &str,
) -> Result<Vec<ResolvedUnit>> {
    let mut units = Vec::new();
    for dir in dirs {
        for path in subdirectories(&dir.root().join(parent_dir))? {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Some(parent) = name.strip_suffix(suffix)
                && !parent.is_empty()
            {
                let scope = Scope::global().with_parent(parent);
                units.push(ResolvedUnit { path, scope });
            }
        }
    }
    Ok(units)
}

/// `*.json` and `*.xml` files directly in `dir`, in lexical order
pub fn list_resource_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = read_dir_sorted(dir)?
        .into_iter()
        .filter(|path| path.is_file() && !is_hidden(path))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json") || ext.eq_ignore_ascii_case("xml"))
        })
        .collect();
    files.sort();
    Ok(files)
}

fn subdirectories(dir: &Path) -> Result<Vec<PathBuf>> {
    Ok(read_dir_sorted(dir)?
        .into_iter()
        .filter(|path| path.is_dir() && !is_hidden(path))
        .collect())
}

fn read_dir_sorted(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut entries = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("Could not list {}", dir.display()))?
    {
        let entry = entry.with_context(|| format!("Could not list {}", dir.display()))?;
        entries.push(entry.path());
    }
    entries.sort();
    Ok(entries)
}

pub(crate) fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}
