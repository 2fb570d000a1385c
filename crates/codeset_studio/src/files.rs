//! Generated file sets.
//!
//! A [`FileSet`] is the ordered, name-unique collection of editable source
//! files of one build. The rendered preview document travels alongside it
//! (see [`GeneratedSite`]) and is never part of the editable set.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::{StudioError, StudioResult};

/// File name the generator uses for the standalone preview document.
pub const PREVIEW_FILE_NAME: &str = "preview.html";

/// A single generated source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub name: String,
    pub content: String,
    pub language: String,
}

impl FileRecord {
    /// Create a record, inferring the language from the file extension.
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        let name = name.into();
        let language = language_for(&name).to_string();
        Self {
            name,
            content: content.into(),
            language,
        }
    }
}

/// Editor language for a file name.
pub fn language_for(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "tsx" | "ts" => "typescript",
        "jsx" | "js" | "mjs" => "javascript",
        "css" => "css",
        "html" | "htm" => "html",
        "json" => "json",
        "md" => "markdown",
        _ => "plaintext",
    }
}

/// Ordered collection of files with unique names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FileRecord>", into = "Vec<FileRecord>")]
pub struct FileSet {
    files: Vec<FileRecord>,
}

impl FileSet {
    /// Build a file set, rejecting duplicate names and names that would
    /// land outside an output directory.
    pub fn new(files: Vec<FileRecord>) -> StudioResult<Self> {
        let mut seen = HashSet::new();
        for file in &files {
            check_name(&file.name)?;
            if !seen.insert(file.name.as_str()) {
                return Err(StudioError::malformed(format!(
                    "duplicate file name: {}",
                    file.name
                )));
            }
        }
        Ok(Self { files })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&FileRecord> {
        self.files.get(index)
    }

    pub fn by_name(&self, name: &str) -> Option<&FileRecord> {
        self.files.iter().find(|f| f.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileRecord> {
        self.files.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.name.as_str()).collect()
    }

    /// Replace the content of the file at `index`.
    pub fn edit(&mut self, index: usize, content: impl Into<String>) -> StudioResult<()> {
        let len = self.files.len();
        let file = self
            .files
            .get_mut(index)
            .ok_or(StudioError::FileIndexOutOfRange { index, len })?;
        file.content = content.into();
        Ok(())
    }

    /// Remove and return the file named `name`, preserving the order of the rest.
    pub fn take(&mut self, name: &str) -> Option<FileRecord> {
        let pos = self.files.iter().position(|f| f.name == name)?;
        Some(self.files.remove(pos))
    }

    pub fn into_records(self) -> Vec<FileRecord> {
        self.files
    }

    /// Write every file under `dir`, creating parent directories as needed.
    ///
    /// All target paths are resolved before the first write.
    pub fn write_to_dir(&self, dir: &Path) -> StudioResult<()> {
        let targets = self
            .files
            .iter()
            .map(|file| safe_join(dir, &file.name).map(|target| (target, file)))
            .collect::<StudioResult<Vec<_>>>()?;
        for (target, file) in targets {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(target, &file.content)?;
        }
        Ok(())
    }

    /// Read every regular file under `dir` into a file set, ordered by path.
    ///
    /// Hidden entries (dot-files and dot-directories) are skipped.
    pub fn read_from_dir(dir: &Path) -> StudioResult<Self> {
        let mut files = Vec::new();
        let walker = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));

        for entry in walker {
            let entry = entry.map_err(|e| StudioError::Io(std::io::Error::other(e.to_string())))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(dir)
                .map_err(|e| StudioError::Io(std::io::Error::other(e.to_string())))?;
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            let content = fs::read_to_string(entry.path())?;
            files.push(FileRecord::new(name, content));
        }

        Self::new(files)
    }
}

impl TryFrom<Vec<FileRecord>> for FileSet {
    type Error = StudioError;

    fn try_from(files: Vec<FileRecord>) -> Result<Self, Self::Error> {
        Self::new(files)
    }
}

impl From<FileSet> for Vec<FileRecord> {
    fn from(set: FileSet) -> Self {
        set.files
    }
}

/// Output of the initial generation: editable sources plus the rendered preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSite {
    pub source_files: FileSet,
    pub preview_document: String,
}

/// A file name must be a non-empty relative path without `..` components.
fn check_name(name: &str) -> StudioResult<()> {
    let relative = Path::new(name);
    let escapes = relative.is_absolute()
        || relative.has_root()
        || relative
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir));
    if escapes || name.trim().is_empty() {
        return Err(StudioError::malformed(format!("unsafe file name: {:?}", name)));
    }
    Ok(())
}

fn safe_join(dir: &Path, name: &str) -> StudioResult<std::path::PathBuf> {
    check_name(name)?;
    Ok(dir.join(name))
}
