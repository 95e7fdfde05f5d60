//! Model catalog: the list of model identifiers offered by the server,
//! fetched once at startup, with substring filtering for the selector UI.

/// Display name for a model id: the last `/` path segment
/// (e.g. "openai/gpt-4.1-mini" -> "gpt-4.1-mini").
pub fn short_model_name(model: &str) -> &str {
    model.rsplit('/').next().unwrap_or(model)
}

/// Available model identifiers. Falls back to a single default when the
/// server's list could not be fetched or came back empty.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    models: Vec<String>,
}

impl ModelCatalog {
    pub fn new(models: Vec<String>, fallback: &str) -> Self {
        let models = if models.is_empty() {
            vec![fallback.to_string()]
        } else {
            models
        };
        Self { models }
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn contains(&self, model: &str) -> bool {
        self.models.iter().any(|m| m == model)
    }

    /// Case-insensitive substring filter. An empty filter matches everything.
    pub fn filter<'a>(&'a self, needle: &str) -> Vec<&'a str> {
        let needle = needle.to_lowercase();
        self.models
            .iter()
            .filter(|m| m.to_lowercase().contains(&needle))
            .map(|m| m.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> ModelCatalog {
        ModelCatalog::new(
            vec![
                "openai/gpt-4.1-mini".to_string(),
                "anthropic/claude-sonnet".to_string(),
                "meta/Llama-3-70B".to_string(),
            ],
            "openai/gpt-4.1-mini",
        )
    }

    #[test]
    fn filter_is_case_insensitive() {
        let c = catalog();
        assert_eq!(c.filter("LLAMA"), vec!["meta/Llama-3-70B"]);
        assert_eq!(c.filter("an"), vec!["anthropic/claude-sonnet"]);
        assert_eq!(c.filter(""), c.models().iter().map(|m| m.as_str()).collect::<Vec<_>>());
        assert!(c.filter("mistral").is_empty());
    }

    #[test]
    fn empty_list_falls_back_to_default() {
        let c = ModelCatalog::new(Vec::new(), "openai/gpt-4.1-mini");
        assert_eq!(c.models(), ["openai/gpt-4.1-mini".to_string()]);
    }

    #[test]
    fn short_name_is_last_segment() {
        assert_eq!(short_model_name("openai/gpt-4.1-mini"), "gpt-4.1-mini");
        assert_eq!(short_model_name("plain-model"), "plain-model");
        assert_eq!(short_model_name("a/b/c"), "c");
    }
}
