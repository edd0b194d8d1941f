use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tree-sitter node kinds that make up exception handling in one language.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageSyntaxConfig {
    /// File extensions (without the dot) of documents in this language.
    #[serde(default)]
    pub extensions: Vec<String>,
    pub try_statement: String,
    pub catch_clause: String,
    pub finally_clause: String,
    /// Kinds where the ancestor walk stops (type declarations).
    #[serde(default)]
    pub boundaries: Vec<String>,
    /// Kinds that start a new method body (lambdas, local functions).
    #[serde(default)]
    pub lambdas: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct EncSettings {
    #[serde(default)]
    pub languages: HashMap<String, LanguageSyntaxConfig>,
}

impl EncSettings {
    /// Language whose configured extensions match the path's extension.
    pub fn language_for_path(&self, path: &str) -> Option<&str> {
        let extension = std::path::Path::new(path).extension()?.to_str()?;
        let mut matches: Vec<&str> = self
            .languages
            .iter()
            .filter(|(_, config)| config.extensions.iter().any(|e| e == extension))
            .map(|(name, _)| name.as_str())
            .collect();
        // HashMap order is arbitrary; keep the choice stable
        matches.sort_unstable();
        matches.first().copied()
    }
}
