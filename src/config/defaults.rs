//! Built-in language settings.

use super::settings::{EncSettings, LanguageSyntaxConfig};
use std::collections::HashMap;

pub const CSHARP: &str = "csharp";

/// Returns the default settings: C# exception handling syntax.
pub fn default_settings() -> EncSettings {
    let mut languages = HashMap::new();
    languages.insert(CSHARP.to_string(), csharp_syntax());
    EncSettings { languages }
}

/// Node kinds of the tree-sitter C# grammar.
pub fn csharp_syntax() -> LanguageSyntaxConfig {
    LanguageSyntaxConfig {
        extensions: strings(&["cs", "csx"]),
        try_statement: "try_statement".to_string(),
        catch_clause: "catch_clause".to_string(),
        finally_clause: "finally_clause".to_string(),
        boundaries: strings(&[
            "class_declaration",
            "struct_declaration",
            "record_declaration",
            "interface_declaration",
        ]),
        lambdas: strings(&[
            "lambda_expression",
            "anonymous_method_expression",
            "local_function_statement",
        ]),
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
