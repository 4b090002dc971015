//! Position tracking for parsed Go files.
//!
//! Every parse and print call receives a `&FileSet` owned by the caller
//! (normally the splitter). There is no process-wide file registry: two
//! splitters in the same process never share positions.

use std::sync::RwLock;

/// Handle to a file registered in a [`FileSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId(u32);

impl FileId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Human readable source position (1-based line and column).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub filename: String,
    pub line: usize,
    pub column: usize,
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.filename, self.line, self.column)
    }
}

#[derive(Debug)]
struct FileEntry {
    name: String,
    size: usize,
    /// Byte offsets at which each line starts
    line_starts: Vec<usize>,
}

/// Registry of source files and their line tables.
///
/// Internally synchronised so the shading walk can register files from
/// several worker threads through a shared reference.
#[derive(Debug, Default)]
pub struct FileSet {
    files: RwLock<Vec<FileEntry>>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file and compute its line table
    pub fn add_file(&self, name: &str, src: &str) -> FileId {
        let mut line_starts = vec![0];
        line_starts.extend(
            src.bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(i, _)| i + 1),
        );

        let entry = FileEntry {
            name: name.to_string(),
            size: src.len(),
            line_starts,
        };

        let mut files = match self.files.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        files.push(entry);
        FileId((files.len() - 1) as u32)
    }

    /// Resolve a byte offset inside `file` to a line/column position.
    /// Offsets past the end of the file clamp to the last position.
    pub fn position(&self, file: FileId, offset: usize) -> Position {
        let files = match self.files.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let Some(entry) = files.get(file.index()) else {
            return Position {
                filename: "<unknown>".to_string(),
                line: 0,
                column: 0,
            };
        };

        let offset = offset.min(entry.size);
        let line_idx = match entry.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };

        Position {
            filename: entry.name.clone(),
            line: line_idx + 1,
            column: offset - entry.line_starts[line_idx] + 1,
        }
    }

    /// Name a file was registered under
    pub fn file_name(&self, file: FileId) -> Option<String> {
        let files = self.files.read().ok()?;
        files.get(file.index()).map(|e| e.name.clone())
    }

    /// Number of registered files
    pub fn len(&self) -> usize {
        self.files.read().map(|f| f.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_lines_and_columns() {
        let fset = FileSet::new();
        let id = fset.add_file("a.go", "package a\n\nfunc F() {}\n");

        let pos = fset.position(id, 0);
        assert_eq!((pos.line, pos.column), (1, 1));

        // "func" starts at offset 11
        let pos = fset.position(id, 11);
        assert_eq!((pos.line, pos.column), (3, 1));
        assert_eq!(pos.to_string(), "a.go:3:1");

        let pos = fset.position(id, 16);
        assert_eq!((pos.line, pos.column), (3, 6));
    }

    #[test]
    fn test_files_are_independent() {
        let fset = FileSet::new();
        let a = fset.add_file("a.go", "package a\n");
        let b = fset.add_file("b.go", "\n\npackage b\n");

        assert_ne!(a, b);
        assert_eq!(fset.len(), 2);
        assert_eq!(fset.position(b, 2).line, 3);
        assert_eq!(fset.file_name(a).as_deref(), Some("a.go"));
    }

    #[test]
    fn test_offset_past_end_clamps() {
        let fset = FileSet::new();
        let id = fset.add_file("a.go", "package a");
        let pos = fset.position(id, 1000);
        assert_eq!(pos.line, 1);
        assert_eq!(pos.column, 10);
    }
}
