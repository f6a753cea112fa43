//! Locale catalogs and translated string lookup.
//!
//! - `catalog` - Qt Linguist `.ts` parsing and per-message lookup
//! - `plural` - plural form rules keyed by locale id

pub mod catalog;
pub mod plural;

use std::borrow::Cow;
use std::path::{Path, PathBuf};

pub use catalog::{LocaleCatalog, Message, TranslationState};
pub use plural::{PluralRule, PluralRules};

use crate::error::CtxMenuError;

/// Catalog file name prefix.
pub const CATALOG_PREFIX: &str = "transmission_";

/// Translates `(context, source, count)` keys for one active locale.
#[derive(Debug, Clone)]
pub struct Translator {
    locale: String,
    catalog: LocaleCatalog,
    rule: PluralRule,
}

impl Translator {
    /// A translator that returns every source string unchanged.
    pub fn passthrough(locale: impl Into<String>) -> Self {
        let locale = locale.into();
        let rule = PluralRules::builtin().rule_for(&locale);
        Self { catalog: LocaleCatalog::empty(locale.clone()), locale, rule }
    }

    /// Create a translator from an already parsed catalog.
    pub fn new(locale: impl Into<String>, catalog: LocaleCatalog, rules: &PluralRules) -> Self {
        let locale = locale.into();
        let rule = rules.rule_for(&locale);
        Self { locale, catalog, rule }
    }

    /// Load `transmission_<locale>.ts` from `dir`.
    ///
    /// Tries the full locale id, then its language part. When neither file
    /// exists the translator passes source strings through; a file that
    /// exists but does not parse is an error.
    pub fn load_dir(dir: &Path, locale: &str, rules: &PluralRules) -> Result<Self, CtxMenuError> {
        for candidate in catalog_candidates(dir, locale) {
            if !candidate.exists() {
                continue;
            }
            let xml = std::fs::read_to_string(&candidate)?;
            let catalog = LocaleCatalog::parse(&xml)
                .map_err(|e| CtxMenuError::locale_in_file(candidate.display().to_string(), e))?;
            tracing::info!(path = %candidate.display(), locale, "Loaded locale catalog");
            return Ok(Self::new(locale, catalog, rules));
        }

        tracing::debug!(dir = %dir.display(), locale, "No catalog found, using source strings");
        let mut translator = Self::passthrough(locale);
        translator.rule = rules.rule_for(locale);
        Ok(translator)
    }

    /// Active locale id.
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// The loaded catalog.
    pub fn catalog(&self) -> &LocaleCatalog {
        &self.catalog
    }

    /// Translate a plain message.
    pub fn tr<'a>(&'a self, context: &str, source: &'a str) -> Cow<'a, str> {
        self.catalog.translate(context, source, None, self.rule)
    }

    /// Translate a numerus message for `count`.
    pub fn tr_n<'a>(&'a self, context: &str, source: &'a str, count: u64) -> Cow<'a, str> {
        self.catalog.translate(context, source, Some(count), self.rule)
    }
}

fn catalog_candidates(dir: &Path, locale: &str) -> Vec<PathBuf> {
    let normalized = locale.replace('-', "_");
    let mut candidates = vec![dir.join(format!("{CATALOG_PREFIX}{normalized}.ts"))];
    if let Some((language, _)) = normalized.split_once('_') {
        candidates.push(dir.join(format!("{CATALOG_PREFIX}{language}.ts")));
    }
    candidates
}
