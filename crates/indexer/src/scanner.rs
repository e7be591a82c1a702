use std::path::{Path, PathBuf};

use context_code_chunker::Language;
use ignore::WalkBuilder;

/// Walks a project root honoring `.gitignore`/`.ignore` files, the way the
/// teacher's file-watching layer discovers candidate source files. Symlinks
/// are never followed, so a link pointing outside the root can't pull
/// external files into an index.
pub struct FileScanner {
    root: PathBuf,
}

impl FileScanner {
    #[must_use]
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Every regular file under the root whose language is in the supported
    /// set and that isn't excluded by ignore rules. Binary files (detected
    /// by a NUL byte or invalid UTF-8 in the first 4 KiB) are dropped
    /// silently, matching the data-corruption guard named in the spec.
    #[must_use]
    pub fn scan(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();

        let walker = WalkBuilder::new(&self.root)
            .follow_links(false)
            .hidden(false)
            .git_ignore(true)
            .git_exclude(true)
            .build();

        for entry in walker.flatten() {
            let Some(file_type) = entry.file_type() else {
                continue;
            };
            if !file_type.is_file() {
                continue;
            }

            let path = entry.path();
            if Language::from_path(path) == Language::Unknown {
                continue;
            }
            if is_probably_binary(path) {
                continue;
            }

            files.push(path.to_path_buf());
        }

        files
    }
}

pub(crate) fn is_probably_binary(path: &Path) -> bool {
    let Ok(bytes) = std::fs::read(path) else {
        return true;
    };
    let head = &bytes[..bytes.len().min(4096)];
    if head.contains(&0u8) {
        return true;
    }
    std::str::from_utf8(head).is_err()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn scan_finds_supported_files_and_skips_binary() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.rs"), "fn main() {}").unwrap();
        fs::write(dir.path().join("b.bin"), [0u8, 159, 146, 150]).unwrap();
        fs::write(dir.path().join("readme.unknownext"), "hello").unwrap();

        let files = FileScanner::new(dir.path()).scan();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();

        assert!(names.contains(&"a.rs".to_string()));
        assert!(!names.contains(&"b.bin".to_string()));
    }

    #[test]
    fn scan_respects_gitignore() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".gitignore"), "ignored.rs\n").unwrap();
        fs::write(dir.path().join("ignored.rs"), "fn x() {}").unwrap();
        fs::write(dir.path().join("kept.rs"), "fn y() {}").unwrap();

        let files = FileScanner::new(dir.path()).scan();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();

        assert!(names.contains(&"kept.rs".to_string()));
        assert!(!names.contains(&"ignored.rs".to_string()));
    }
}
