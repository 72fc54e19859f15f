//! Original-file lookup in a Lightroom catalog (`.lrcat`).
//!
//! A catalog is a SQLite database. The resolver only needs three tables:
//!
//! | Table | Columns used |
//! |---|---|
//! | `AgLibraryFile` | `id_global` (UUID), `folder`, `baseName` |
//! | `AgLibraryFolder` | `id_local`, `rootFolder`, `pathFromRoot` |
//! | `AgLibraryRootFolder` | `id_local`, `absolutePath` |
//!
//! The connection is opened read-only for every lookup and dropped right
//! after, so parallel workers never share a handle and the catalog is never
//! modified (Lightroom may have it open at the same time).

use rusqlite::{Connection, OpenFlags, params};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

const LOOKUP_SQL: &str = "
    SELECT file.id_global, root.absolutePath, folder.pathFromRoot, file.baseName
    FROM AgLibraryFile file
    INNER JOIN AgLibraryFolder folder ON folder.id_local = file.folder
    INNER JOIN AgLibraryRootFolder root ON root.id_local = folder.rootFolder
    WHERE file.id_global = ?1
    LIMIT 2";

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("catalog not found: {0}")]
    Missing(PathBuf),
    #[error("catalog unavailable ({path}): {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("no catalog entry for {0}")]
    NotFound(String),
    #[error("{identifier} matches more than one catalog entry")]
    Ambiguous { identifier: String },
}

impl CatalogError {
    /// True for failures not worth a warning on every file: no match, or a
    /// catalog file that does not exist (reported once per run).
    pub fn is_routine(&self) -> bool {
        matches!(self, CatalogError::NotFound(_) | CatalogError::Missing(_))
    }

    /// Short label used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            CatalogError::Missing(_) | CatalogError::Unavailable { .. } => "catalog_unavailable",
            CatalogError::NotFound(_) => "catalog_not_found",
            CatalogError::Ambiguous { .. } => "catalog_ambiguous",
        }
    }
}

/// One resolved catalog row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub identifier: String,
    /// `AgLibraryRootFolder.absolutePath`, e.g. `/Users/me/Pictures/`.
    pub root_path: String,
    /// `AgLibraryFolder.pathFromRoot`, e.g. `2024/06-june/`.
    pub path_from_root: String,
    /// File name without extension, e.g. `IMG_0421`.
    pub base_name: String,
}

impl CatalogEntry {
    /// Folder of the original file: root (leading separator stripped) joined
    /// with the path from root. No filesystem access.
    pub fn absolute_path(&self) -> PathBuf {
        let root = self
            .root_path
            .strip_prefix(['/', '\\'])
            .unwrap_or(&self.root_path);
        Path::new(root).join(&self.path_from_root)
    }
}

/// Look up `identifier` in the catalog at `catalog_path`.
pub fn resolve(catalog_path: &Path, identifier: &str) -> Result<CatalogEntry, CatalogError> {
    if !catalog_path.is_file() {
        return Err(CatalogError::Missing(catalog_path.to_path_buf()));
    }
    let unavailable = |source| CatalogError::Unavailable {
        path: catalog_path.to_path_buf(),
        source,
    };

    let conn = Connection::open_with_flags(
        catalog_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(unavailable)?;

    let mut stmt = conn.prepare(LOOKUP_SQL).map_err(unavailable)?;
    let rows = stmt
        .query_map(params![identifier], |row| {
            Ok(CatalogEntry {
                identifier: row.get(0)?,
                root_path: row.get(1)?,
                path_from_root: row.get(2)?,
                base_name: row.get(3)?,
            })
        })
        .map_err(unavailable)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(unavailable)?;

    debug!(identifier, matches = rows.len(), "catalog lookup");

    let mut rows = rows.into_iter();
    match (rows.next(), rows.next()) {
        (Some(entry), None) => Ok(entry),
        (None, _) => Err(CatalogError::NotFound(identifier.to_string())),
        (Some(_), Some(_)) => Err(CatalogError::Ambiguous {
            identifier: identifier.to_string(),
        }),
    }
}
