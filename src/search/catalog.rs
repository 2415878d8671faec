//! Lookup list selection and loading
//!
//! Lists are plain JSON arrays of strings. They are read from disk on every
//! search so edits to the files show up without a restart.

use std::path::{Path, PathBuf};
use tokio::fs;

use super::SearchError;

/// Which static list a search runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Authors,
    Contexts,
}

impl Category {
    /// Map the form's `category` field; anything but `author` is the context list
    pub fn from_form(value: &str) -> Self {
        if value == "author" {
            Self::Authors
        } else {
            Self::Contexts
        }
    }

    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Authors => "author_names.json",
            Self::Contexts => "context_clean.json",
        }
    }

    pub fn path_in(self, dir: &Path) -> PathBuf {
        dir.join(self.file_name())
    }
}

/// Read the list for a category from `dir`
pub async fn load_entries(dir: &Path, category: Category) -> Result<Vec<String>, SearchError> {
    let path = category.path_in(dir);
    let raw = fs::read(&path).await.map_err(|source| SearchError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_slice(&raw).map_err(|source| SearchError::Parse {
        path: path.display().to_string(),
        source,
    })
}
