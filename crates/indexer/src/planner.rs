use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::index_state::StateFile;
use crate::scanner::FileScanner;
use crate::Result;

/// A file the planner has decided belongs in `files_to_index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub relative_path: String,
    pub absolute_path: PathBuf,
}

/// Per-file BLAKE3 hashes, persisted alongside `state.json` so the planner
/// can fall back to hash-diffing when source control is unavailable.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FileHashes {
    pub hashes: HashMap<String, String>,
}

impl FileHashes {
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[derive(Debug, Clone)]
pub struct Plan {
    pub files_to_index: Vec<FileRef>,
    pub files_to_remove: Vec<String>,
    pub is_full: bool,
    pub reason: String,
}

pub struct ProjectConfig {
    pub root: PathBuf,
    pub include_uncommitted: bool,
    pub embedding_model_id: String,
    pub embedding_dimensions: usize,
}

pub struct ChangePlanner;

impl ChangePlanner {
    /// Branch 1: no prior state, or the model/dimension config changed, is a
    /// full reindex. Branch 2: git diff from the last indexed commit to
    /// HEAD. Branch 3 (no source control, or git failed): per-file BLAKE3
    /// hash diff against `file_hashes.json`. First succeeding branch wins.
    pub async fn plan(
        config: &ProjectConfig,
        prior_state: Option<&StateFile>,
        file_hashes_path: &Path,
    ) -> Result<Plan> {
        let needs_full = prior_state.map_or(true, |state| {
            state.embedding_model_id != config.embedding_model_id
                || state.embedding_dimensions != config.embedding_dimensions
        });

        if needs_full {
            let reason = if prior_state.is_none() {
                "no prior index state".to_string()
            } else {
                "embedding model or dimensions changed".to_string()
            };
            return Ok(Self::full_plan(config, reason));
        }

        let state = prior_state.expect("needs_full is false implies prior_state is Some");

        if let Some(commit) = &state.last_indexed_commit {
            match Self::git_diff_plan(config, commit).await {
                Ok(plan) => return Ok(plan),
                Err(err) => {
                    log::warn!("git diff planning failed, falling back to file-hash mode: {err}");
                }
            }
        }

        Self::hash_diff_plan(config, file_hashes_path)
    }

    fn full_plan(config: &ProjectConfig, reason: String) -> Plan {
        let files = FileScanner::new(&config.root).scan();
        let files_to_index = files
            .into_iter()
            .map(|absolute_path| {
                let relative_path = relative_path_of(&config.root, &absolute_path);
                FileRef { relative_path, absolute_path }
            })
            .collect();

        Plan {
            files_to_index,
            files_to_remove: Vec::new(),
            is_full: true,
            reason,
        }
    }

    async fn git_diff_plan(config: &ProjectConfig, from_commit: &str) -> std::result::Result<Plan, String> {
        let mut added_or_modified = Vec::new();
        let mut removed = Vec::new();

        let diff = tokio::process::Command::new("git")
            .arg("-C")
            .arg(&config.root)
            .arg("diff")
            .arg("--name-status")
            .arg("-M")
            .arg(from_commit)
            .arg("HEAD")
            .output()
            .await
            .map_err(|e| e.to_string())?;
        if !diff.status.success() {
            return Err(String::from_utf8_lossy(&diff.stderr).to_string());
        }

        for line in String::from_utf8_lossy(&diff.stdout).lines() {
            let mut fields = line.split('\t');
            let Some(status) = fields.next() else { continue };
            match status.chars().next() {
                Some('A' | 'M') => {
                    if let Some(path) = fields.next() {
                        added_or_modified.push(path.to_string());
                    }
                }
                Some('D') => {
                    if let Some(path) = fields.next() {
                        removed.push(path.to_string());
                    }
                }
                Some('R') => {
                    let old = fields.next();
                    let new = fields.next();
                    if let Some(old) = old {
                        removed.push(old.to_string());
                    }
                    if let Some(new) = new {
                        added_or_modified.push(new.to_string());
                    }
                }
                _ => {}
            }
        }

        if config.include_uncommitted {
            let status = tokio::process::Command::new("git")
                .arg("-C")
                .arg(&config.root)
                .arg("status")
                .arg("--porcelain")
                .output()
                .await
                .map_err(|e| e.to_string())?;
            if !status.status.success() {
                return Err(String::from_utf8_lossy(&status.stderr).to_string());
            }
            for line in String::from_utf8_lossy(&status.stdout).lines() {
                let Some(rest) = line.get(3..) else { continue };
                let code = &line[..2];
                if code.contains('D') {
                    removed.push(rest.to_string());
                } else {
                    added_or_modified.push(rest.to_string());
                }
            }
        }

        let files_to_index = added_or_modified
            .into_iter()
            .filter(|relative_path| !removed.contains(relative_path))
            .map(|relative_path| {
                let absolute_path = config.root.join(&relative_path);
                FileRef { relative_path, absolute_path }
            })
            .filter(|file_ref| is_supported_and_not_binary(&file_ref.absolute_path))
            .collect();

        Ok(Plan {
            files_to_index,
            files_to_remove: removed,
            is_full: false,
            reason: format!("git diff from {from_commit}"),
        })
    }

    fn hash_diff_plan(config: &ProjectConfig, file_hashes_path: &Path) -> Result<Plan> {
        let prior = FileHashes::load_from_file(file_hashes_path)?;
        let scanned = FileScanner::new(&config.root).scan();

        let mut seen = std::collections::HashSet::new();
        let mut files_to_index = Vec::new();

        for absolute_path in scanned {
            let relative_path = relative_path_of(&config.root, &absolute_path);
            seen.insert(relative_path.clone());

            let Ok(bytes) = std::fs::read(&absolute_path) else {
                log::warn!("skipping unreadable file during hash diff: {}", absolute_path.display());
                continue;
            };
            let hash = blake3::hash(&bytes).to_hex().to_string();

            if prior.hashes.get(&relative_path) != Some(&hash) {
                files_to_index.push(FileRef { relative_path, absolute_path });
            }
        }

        let files_to_remove = prior
            .hashes
            .keys()
            .filter(|path| !seen.contains(*path))
            .cloned()
            .collect();

        Ok(Plan {
            files_to_index,
            files_to_remove,
            is_full: false,
            reason: "file-hash diff (no source control)".to_string(),
        })
    }
}

fn relative_path_of(root: &Path, absolute: &Path) -> String {
    let relative = absolute.strip_prefix(root).unwrap_or(absolute);
    relative.to_string_lossy().replace('\\', "/")
}

fn is_supported_and_not_binary(path: &Path) -> bool {
    use context_code_chunker::Language;
    if Language::from_path(path) == Language::Unknown {
        return false;
    }
    path.exists() && !crate::scanner::is_probably_binary(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_plan_triggers_when_no_prior_state() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn main() {}").unwrap();

        let config = ProjectConfig {
            root: dir.path().to_path_buf(),
            include_uncommitted: false,
            embedding_model_id: "bge-small-en-v1.5".to_string(),
            embedding_dimensions: 384,
        };

        let plan = ChangePlanner::full_plan(&config, "no prior index state".to_string());
        assert!(plan.is_full);
        assert_eq!(plan.files_to_index.len(), 1);
    }

    #[test]
    fn hash_diff_plan_finds_new_and_changed_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn a() {}").unwrap();
        let hashes_path = dir.path().join("file_hashes.json");

        let config = ProjectConfig {
            root: dir.path().to_path_buf(),
            include_uncommitted: false,
            embedding_model_id: "bge-small-en-v1.5".to_string(),
            embedding_dimensions: 384,
        };

        let plan = ChangePlanner::hash_diff_plan(&config, &hashes_path).unwrap();
        assert_eq!(plan.files_to_index.len(), 1);
        assert!(plan.files_to_remove.is_empty());
    }

    #[test]
    fn hash_diff_plan_removes_deleted_files() {
        let dir = tempfile::tempdir().unwrap();
        let hashes_path = dir.path().join("file_hashes.json");
        let mut prior = FileHashes::default();
        prior.hashes.insert("gone.rs".to_string(), "deadbeef".to_string());
        prior.save_to_file(&hashes_path).unwrap();

        let config = ProjectConfig {
            root: dir.path().to_path_buf(),
            include_uncommitted: false,
            embedding_model_id: "bge-small-en-v1.5".to_string(),
            embedding_dimensions: 384,
        };

        let plan = ChangePlanner::hash_diff_plan(&config, &hashes_path).unwrap();
        assert_eq!(plan.files_to_remove, vec!["gone.rs".to_string()]);
    }
}
