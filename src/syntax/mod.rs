//! Language syntax used to find exception-handling regions.
//!
//! Each configured language binds a compiled tree-sitter grammar to the node
//! kinds of its try/catch/finally constructs.

pub mod exception_handling;

use log::warn;
use std::collections::HashMap;
use std::sync::Arc;
use tree_sitter::{Language, Parser, Tree};

use crate::config::{EncSettings, LanguageSyntaxConfig, default_settings};
use crate::workspace::{DocumentId, WorkspaceService};

/// A grammar plus the exception-handling node kinds of its language.
pub struct LanguageSyntax {
    name: String,
    language: Language,
    config: LanguageSyntaxConfig,
}

impl std::fmt::Debug for LanguageSyntax {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageSyntax")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish()
    }
}

impl LanguageSyntax {
    pub fn new(name: impl Into<String>, language: Language, config: LanguageSyntaxConfig) -> Self {
        Self {
            name: name.into(),
            language,
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &LanguageSyntaxConfig {
        &self.config
    }

    /// Parse a full document.
    ///
    /// Parsers are not shared between threads, so each call creates one.
    pub fn parse(&self, text: &str) -> Option<Tree> {
        let mut parser = Parser::new();
        if let Err(e) = parser.set_language(&self.language) {
            warn!(
                target: "enc_remap::syntax",
                "Grammar for {} is incompatible with the parser: {}",
                self.name,
                e
            );
            return None;
        }
        parser.parse(text, None)
    }

    /// True when the text fails to parse cleanly.
    pub fn has_syntax_errors(&self, text: &str) -> bool {
        self.parse(text)
            .is_none_or(|tree| tree.root_node().has_error())
    }
}

/// Languages known to the engine, keyed by language name.
#[derive(Debug)]
pub struct SyntaxRegistry {
    languages: HashMap<String, Arc<LanguageSyntax>>,
    settings: EncSettings,
}

impl Default for SyntaxRegistry {
    fn default() -> Self {
        Self::from_settings(&default_settings())
    }
}

impl SyntaxRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind each configured language to its compiled grammar.
    ///
    /// Languages without a built-in grammar are skipped.
    pub fn from_settings(settings: &EncSettings) -> Self {
        let mut languages = HashMap::new();
        for (name, config) in &settings.languages {
            match builtin_grammar(name) {
                Some(language) => {
                    languages.insert(
                        name.clone(),
                        Arc::new(LanguageSyntax::new(name.clone(), language, config.clone())),
                    );
                }
                None => warn!(
                    target: "enc_remap::syntax",
                    "No grammar available for configured language '{}'; skipping",
                    name
                ),
            }
        }
        Self {
            languages,
            settings: settings.clone(),
        }
    }

    /// Register a language with a caller-provided grammar.
    pub fn register(&mut self, syntax: LanguageSyntax) {
        self.languages
            .insert(syntax.name().to_string(), Arc::new(syntax));
    }

    pub fn get(&self, language: &str) -> Option<&Arc<LanguageSyntax>> {
        self.languages.get(language)
    }

    pub fn language_for_path(&self, path: &str) -> Option<&str> {
        self.settings.language_for_path(path)
    }

    /// Syntax of a workspace document: its declared language, or the
    /// language configured for its file extension.
    pub fn for_document<W>(&self, workspace: &W, document: DocumentId) -> Option<&Arc<LanguageSyntax>>
    where
        W: WorkspaceService + ?Sized,
    {
        match workspace.language(document) {
            Some(language) => self.get(&language),
            None => {
                let path = workspace.document_path(document)?;
                self.get(self.language_for_path(&path)?)
            }
        }
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.languages.keys().map(String::as_str)
    }
}

fn builtin_grammar(name: &str) -> Option<Language> {
    match name {
        "csharp" | "c_sharp" | "cs" => Some(tree_sitter_c_sharp::LANGUAGE.into()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::csharp_syntax;

    #[test]
    fn test_default_registry_has_csharp() {
        let registry = SyntaxRegistry::new();
        assert!(registry.get("csharp").is_some());
        assert_eq!(registry.language_for_path("Program.cs"), Some("csharp"));
    }

    #[test]
    fn test_languages_without_grammar_are_skipped() {
        let mut settings = default_settings();
        settings
            .languages
            .insert("cobol".to_string(), csharp_syntax());

        let registry = SyntaxRegistry::from_settings(&settings);
        assert!(registry.get("cobol").is_none());
        assert!(registry.get("csharp").is_some());
    }

    #[test]
    fn test_syntax_errors_are_detected() {
        let registry = SyntaxRegistry::new();
        let csharp = registry.get("csharp").unwrap();
        assert!(!csharp.has_syntax_errors("class C { void F() { G(); } }"));
        assert!(csharp.has_syntax_errors("class C { void F() { G( } }"));
    }
}
