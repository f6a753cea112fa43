//! Plural form selection per locale.
//!
//! A catalog stores one `numerusform` per plural category of its language.
//! Which form a count maps to is language data, so rules are plain function
//! pointers registered by locale id.

use std::collections::HashMap;

/// Maps a count to the index of the `numerusform` to use.
pub type PluralRule = fn(u64) -> usize;

/// Languages without grammatical number.
pub fn one_form(_n: u64) -> usize {
    0
}

/// English-like: singular for exactly one.
pub fn singular_one(n: u64) -> usize {
    usize::from(n != 1)
}

/// French-like: zero is singular too.
pub fn singular_zero_one(n: u64) -> usize {
    usize::from(n > 1)
}

/// Russian, Ukrainian, Belarusian, Serbian, Croatian, Bosnian.
pub fn east_slavic(n: u64) -> usize {
    let (m10, m100) = (n % 10, n % 100);
    if m10 == 1 && m100 != 11 {
        0
    } else if (2..=4).contains(&m10) && !(12..=14).contains(&m100) {
        1
    } else {
        2
    }
}

/// Polish.
pub fn polish(n: u64) -> usize {
    let (m10, m100) = (n % 10, n % 100);
    if n == 1 {
        0
    } else if (2..=4).contains(&m10) && !(12..=14).contains(&m100) {
        1
    } else {
        2
    }
}

/// Czech and Slovak.
pub fn czech(n: u64) -> usize {
    match n {
        1 => 0,
        2..=4 => 1,
        _ => 2,
    }
}

/// Arabic: zero, one, two, few, many, other.
pub fn arabic(n: u64) -> usize {
    let m100 = n % 100;
    match n {
        0 => 0,
        1 => 1,
        2 => 2,
        _ if (3..=10).contains(&m100) => 3,
        _ if m100 >= 11 => 4,
        _ => 5,
    }
}

/// Lithuanian.
pub fn lithuanian(n: u64) -> usize {
    let (m10, m100) = (n % 10, n % 100);
    if m10 == 1 && m100 != 11 {
        0
    } else if m10 >= 2 && !(10..=19).contains(&m100) {
        1
    } else {
        2
    }
}

/// Latvian: singular, plural, nullar.
pub fn latvian(n: u64) -> usize {
    if n % 10 == 1 && n % 100 != 11 {
        0
    } else if n != 0 {
        1
    } else {
        2
    }
}

/// Romanian.
pub fn romanian(n: u64) -> usize {
    if n == 1 {
        0
    } else if n == 0 || (1..=19).contains(&(n % 100)) {
        1
    } else {
        2
    }
}

/// Slovenian.
pub fn slovenian(n: u64) -> usize {
    match n % 100 {
        1 => 0,
        2 => 1,
        3 | 4 => 2,
        _ => 3,
    }
}

/// Irish.
pub fn irish(n: u64) -> usize {
    match n {
        1 => 0,
        2 => 1,
        _ => 2,
    }
}

/// Registry of plural rules keyed by locale id (`de`, `pt_BR`, ...).
#[derive(Debug, Clone)]
pub struct PluralRules {
    rules: HashMap<String, PluralRule>,
}

impl Default for PluralRules {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PluralRules {
    /// An empty registry; every lookup falls back to [`singular_one`].
    pub fn empty() -> Self {
        Self { rules: HashMap::new() }
    }

    /// Rules for the languages shipped with the client catalogs.
    pub fn builtin() -> Self {
        let table: &[(&[&str], PluralRule)] = &[
            (&["ja", "ko", "zh", "zh_CN", "zh_TW", "vi", "th", "id", "ms", "ka", "kk"], one_form),
            (
                &[
                    "en", "de", "nl", "sv", "da", "nb", "nn", "no", "fi", "et", "es", "it",
                    "pt", "ca", "eu", "el", "hu", "bg", "af", "eo", "gl", "he", "tr", "ast",
                    "fa", "hi", "mk", "sq", "az",
                ],
                singular_one,
            ),
            (&["fr", "pt_BR", "oc", "hy"], singular_zero_one),
            (&["ru", "uk", "be", "sr", "hr", "bs"], east_slavic),
            (&["pl"], polish),
            (&["cs", "sk"], czech),
            (&["ar"], arabic),
            (&["lt"], lithuanian),
            (&["lv"], latvian),
            (&["ro"], romanian),
            (&["sl"], slovenian),
            (&["ga"], irish),
        ];

        let mut rules = HashMap::new();
        for (locales, rule) in table {
            for locale in *locales {
                rules.insert((*locale).to_string(), *rule);
            }
        }
        Self { rules }
    }

    /// Register or override the rule for a locale.
    pub fn register(&mut self, locale: impl Into<String>, rule: PluralRule) {
        self.rules.insert(locale.into(), rule);
    }

    /// Find the rule for a locale id.
    ///
    /// Tries the exact id, then the language part (`pt_BR` -> `pt`), then
    /// falls back to the English rule.
    pub fn rule_for(&self, locale: &str) -> PluralRule {
        let normalized = locale.replace('-', "_");
        if let Some(rule) = self.rules.get(&normalized) {
            return *rule;
        }
        let language = normalized.split('_').next().unwrap_or_default();
        if let Some(rule) = self.rules.get(language) {
            return *rule;
        }
        tracing::debug!(locale, "No plural rule registered, using singular/plural");
        singular_one
    }
}
