use ignore::{DirEntry, WalkBuilder};
use log::{debug, warn};
use std::path::{Component, Path, PathBuf};

/// Directory names whose whole subtree is left out.
pub const EXCLUDED_FOLDERS: &[&str] = &["node_modules"];

/// Lowercased file name suffixes that are never exported. Checked before
/// [`ALLOWED_SUFFIXES`].
pub const EXCLUDED_SUFFIXES: &[&str] = &[".ds_store", ".git", ".pdf", ".svg"];

/// Lowercased file name suffixes that are exported.
pub const ALLOWED_SUFFIXES: &[&str] = &[
    ".rs", ".py", ".ts", ".tsx", ".js", ".json", ".yaml", ".toml", ".lock", ".md",
];

/// Files found under a root, plus the entries the walk could not read.
#[derive(Debug)]
pub struct Collection {
    pub root: PathBuf,
    pub paths: Vec<PathBuf>,
    pub errors: Vec<ignore::Error>,
}

impl Collection {
    /// A collection counts as successful when it found at least one file.
    pub fn succeeded(&self) -> bool {
        !self.paths.is_empty()
    }

    pub fn message(&self) -> String {
        let found = format!(
            "Found {} exportable files under {}",
            self.paths.len(),
            self.root.display()
        );

        match self.errors.as_slice() {
            [] => found,
            errors => {
                let details: Vec<_> = errors.iter().map(|e| e.to_string()).collect();
                format!(
                    "{found}; skipped {} unreadable entries: {}",
                    errors.len(),
                    details.join("; ")
                )
            }
        }
    }
}

/// Recursively collects exportable files under `root`.
///
/// Hidden files and `.gitignore` rules are not applied and symlinked
/// directories are not followed. Paths keep `root` as their prefix and come
/// back in walk order. Entries the walk cannot read (an unreadable directory,
/// a missing root) are skipped and kept in [`Collection::errors`].
pub fn collect_files(root: &Path) -> Collection {
    let mut builder = WalkBuilder::new(root);
    builder.standard_filters(false).follow_links(false);
    builder.filter_entry(|e| !is_excluded_folder(e));

    let mut paths = Vec::new();
    let mut errors = Vec::new();

    for result in builder.build() {
        match result {
            Ok(entry) => {
                let path = entry.path();

                if path.is_dir() || in_excluded_folder(path) {
                    continue;
                }

                let exported = path
                    .file_name()
                    .map(|name| is_exported_name(&name.to_string_lossy()))
                    .unwrap_or(false);

                if exported {
                    debug!("Collected {}", path.display());
                    paths.push(path.to_path_buf());
                }
            }
            Err(err) => {
                warn!("Skipping unreadable entry under {}: {err}", root.display());
                errors.push(err);
            }
        }
    }

    Collection {
        root: root.to_path_buf(),
        paths,
        errors,
    }
}

/// Decides on a bare file name: excluded suffixes win over allowed ones.
pub fn is_exported_name(file_name: &str) -> bool {
    let name = file_name.to_lowercase();

    if EXCLUDED_SUFFIXES.iter().any(|s| name.ends_with(s)) {
        return false;
    }
    ALLOWED_SUFFIXES.iter().any(|s| name.ends_with(s))
}

fn is_excluded_folder(entry: &DirEntry) -> bool {
    entry.file_type().is_some_and(|t| t.is_dir())
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| EXCLUDED_FOLDERS.contains(&name))
}

/// True when any directory above `path` is an excluded folder. This also
/// catches a root that itself lies inside one.
fn in_excluded_folder(path: &Path) -> bool {
    path.parent().is_some_and(|parent| {
        parent.components().any(|c| match c {
            Component::Normal(name) => name
                .to_str()
                .is_some_and(|name| EXCLUDED_FOLDERS.contains(&name)),
            _ => false,
        })
    })
}
