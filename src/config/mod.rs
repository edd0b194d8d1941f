pub mod defaults;
pub mod settings;
pub mod user;

pub use defaults::default_settings;
pub use settings::{EncSettings, LanguageSyntaxConfig};

use crate::error::EncResult;
use log::debug;
use std::collections::HashMap;
use std::path::Path;

/// Merge two EncSettings, preferring values from `primary` over `fallback`
pub fn merge_settings(fallback: Option<EncSettings>, primary: Option<EncSettings>) -> Option<EncSettings> {
    match (fallback, primary) {
        (None, None) => None,
        (Some(settings), None) => Some(settings),
        (None, Some(settings)) => Some(settings),
        (Some(fallback), Some(primary)) => Some(EncSettings {
            languages: merge_languages(fallback.languages, primary.languages),
        }),
    }
}

fn merge_languages(
    mut fallback: HashMap<String, LanguageSyntaxConfig>,
    primary: HashMap<String, LanguageSyntaxConfig>,
) -> HashMap<String, LanguageSyntaxConfig> {
    // Override fallback entries with primary entries
    for (key, value) in primary {
        fallback.insert(key, value);
    }
    fallback
}

/// Parse settings from TOML text.
pub fn parse_settings(text: &str) -> EncResult<EncSettings> {
    Ok(toml::from_str(text)?)
}

/// Load a settings file and merge it over the defaults.
pub fn load_settings(path: &Path) -> EncResult<EncSettings> {
    let text = std::fs::read_to_string(path)?;
    let user = parse_settings(&text)?;
    debug!(
        target: "enc_remap::config",
        "Loaded {} language(s) from {}",
        user.languages.len(),
        path.display()
    );
    Ok(merge_settings(Some(default_settings()), Some(user)).unwrap_or_default())
}
