//! Environment-derived configuration (read once at startup, per §7 of the
//! expanded spec). Every field has a default so the server runs with zero
//! configuration against the current directory.

use std::path::PathBuf;

const DEFAULT_EMBEDDING_MODEL: &str = "bge-small-en-v1.5";
const DEFAULT_EMBEDDING_DIMENSIONS: usize = 384;

#[derive(Debug, Clone)]
pub struct Config {
    /// Project directory to index and search. Defaults to the current
    /// working directory.
    pub project_root: PathBuf,
    /// Directory holding downloaded embedding models. Defaults to
    /// `~/.context-finder/`.
    pub data_dir: PathBuf,
    pub embedding_model: String,
    pub embedding_dimensions: usize,
    pub log_level: String,
}

impl Config {
    /// Reads `PROJECT_ROOT`, `DATA_DIR`, `EMBEDDING_MODEL`,
    /// `EMBEDDING_DIMENSIONS`, and `LOG_LEVEL` from the process environment,
    /// falling back to their documented defaults when unset or unparsable.
    pub fn from_env() -> Self {
        let project_root = std::env::var("PROJECT_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

        let data_dir = std::env::var("DATA_DIR").map(PathBuf::from).unwrap_or_else(|_| default_data_dir());

        let embedding_model =
            std::env::var("EMBEDDING_MODEL").unwrap_or_else(|_| DEFAULT_EMBEDDING_MODEL.to_string());

        let embedding_dimensions = std::env::var("EMBEDDING_DIMENSIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_EMBEDDING_DIMENSIONS);

        let log_level = std::env::var("LOG_LEVEL")
            .ok()
            .filter(|v| matches!(v.as_str(), "debug" | "info" | "warn" | "error"))
            .unwrap_or_else(|| "warn".to_string());

        Self { project_root, data_dir, embedding_model, embedding_dimensions, log_level }
    }

    /// Directory the current `embedding_model` is expected to live in:
    /// `<data_dir>/models/<model_id>/`, containing `model.onnx` and
    /// `tokenizer.json`.
    #[must_use]
    pub fn model_dir(&self) -> PathBuf {
        self.data_dir.join("models").join(&self.embedding_model)
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir().map(|home| home.join(".context-finder")).unwrap_or_else(|| PathBuf::from(".context-finder"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_dir_nests_under_data_dir_by_model_id() {
        let cfg = Config {
            project_root: PathBuf::from("."),
            data_dir: PathBuf::from("/data"),
            embedding_model: "bge-small-en-v1.5".to_string(),
            embedding_dimensions: 384,
            log_level: "warn".to_string(),
        };
        assert_eq!(cfg.model_dir(), PathBuf::from("/data/models/bge-small-en-v1.5"));
    }
}
