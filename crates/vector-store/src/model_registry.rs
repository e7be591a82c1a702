use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Per-model `(doc_prefix, query_prefix)` pair. Asymmetric models (BGE-
/// style) need different prefixes for indexing vs. query text so the two
/// share an embedding space; symmetric models use empty prefixes for both.
///
/// Resolves Open Question 3 (`spec.md` §9): the contract requires only that
/// the prefix choice be consistent per-model, so it's carried here rather
/// than hard-coded into the embedder.
#[derive(Debug, Clone, Default)]
pub struct ModelPrefixes {
    pub doc_prefix: &'static str,
    pub query_prefix: &'static str,
}

/// Built once per process the first time any caller asks for a model's
/// prefixes without constructing its own `ModelRegistry`.
static DEFAULT_REGISTRY: Lazy<ModelRegistry> = Lazy::new(ModelRegistry::new);

pub struct ModelRegistry {
    entries: HashMap<String, ModelPrefixes>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelRegistry {
    #[must_use]
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            "bge-small-en-v1.5".to_string(),
            ModelPrefixes {
                doc_prefix: "",
                query_prefix: "search_query: ",
            },
        );
        entries.insert(
            "bge-base-en-v1.5".to_string(),
            ModelPrefixes {
                doc_prefix: "",
                query_prefix: "search_query: ",
            },
        );
        entries.insert(
            "bge-m3".to_string(),
            ModelPrefixes {
                doc_prefix: "",
                query_prefix: "search_query: ",
            },
        );
        entries.insert(
            "nomic-embed-text-v1.5".to_string(),
            ModelPrefixes {
                doc_prefix: "search_document: ",
                query_prefix: "search_query: ",
            },
        );
        Self { entries }
    }

    pub fn register(&mut self, model_id: impl Into<String>, prefixes: ModelPrefixes) {
        self.entries.insert(model_id.into(), prefixes);
    }

    /// Symmetric models (most sentence-transformers checkpoints) get empty
    /// prefixes for both document and query text.
    #[must_use]
    pub fn prefixes_for(&self, model_id: &str) -> ModelPrefixes {
        self.entries.get(model_id).cloned().unwrap_or_default()
    }
}

/// Prefixes for `model_id` from the built-in default registry, for callers
/// that don't maintain their own `ModelRegistry` instance.
#[must_use]
pub fn default_prefixes_for(model_id: &str) -> ModelPrefixes {
    DEFAULT_REGISTRY.prefixes_for(model_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_bge_model_gets_asymmetric_prefixes() {
        let registry = ModelRegistry::new();
        let prefixes = registry.prefixes_for("bge-small-en-v1.5");
        assert_eq!(prefixes.doc_prefix, "");
        assert_eq!(prefixes.query_prefix, "search_query: ");
    }

    #[test]
    fn unknown_model_gets_symmetric_empty_prefixes() {
        let registry = ModelRegistry::new();
        let prefixes = registry.prefixes_for("some-other-model");
        assert_eq!(prefixes.doc_prefix, "");
        assert_eq!(prefixes.query_prefix, "");
    }

    #[test]
    fn default_prefixes_for_matches_builtin_registry() {
        let prefixes = default_prefixes_for("bge-small-en-v1.5");
        assert_eq!(prefixes.query_prefix, "search_query: ");
    }
}
