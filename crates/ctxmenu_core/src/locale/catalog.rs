//! Qt Linguist `.ts` catalog parser.
//!
//! Parses the XML translation catalogs used by the desktop and web clients.

use std::borrow::Cow;
use std::collections::HashMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::plural::PluralRule;
use crate::error::CtxMenuError;

/// State of a `<translation>` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranslationState {
    /// Reviewed and usable.
    #[default]
    Finished,
    /// `type="unfinished"`: present in the file but not released.
    Unfinished,
    /// `type="vanished"` or `type="obsolete"`: the source string is gone.
    Obsolete,
}

impl TranslationState {
    fn parse(value: &str) -> Self {
        match value {
            "unfinished" => Self::Unfinished,
            "vanished" | "obsolete" => Self::Obsolete,
            _ => Self::Finished,
        }
    }
}

/// One `<message>` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// English source text.
    pub source: String,
    /// Disambiguation comment.
    pub comment: Option<String>,
    /// Whether the message has plural forms.
    pub numerus: bool,
    /// Translations; one entry, or one per plural form for numerus messages.
    pub forms: Vec<String>,
    /// Translation state.
    pub state: TranslationState,
}

impl Message {
    /// Whether this message may be shown instead of its source.
    pub fn is_usable(&self) -> bool {
        self.state == TranslationState::Finished && self.forms.iter().any(|f| !f.is_empty())
    }
}

/// A parsed catalog for a single language.
#[derive(Debug, Clone, Default)]
pub struct LocaleCatalog {
    language: String,
    messages: HashMap<(String, String), Message>,
}

#[derive(Debug, Default)]
struct ParserState {
    context: Option<String>,
    message: Option<Message>,
    in_translation: bool,
    text: String,
}

impl LocaleCatalog {
    /// An empty catalog: every lookup returns its source text.
    pub fn empty(language: impl Into<String>) -> Self {
        Self { language: language.into(), messages: HashMap::new() }
    }

    /// Parse a catalog from `.ts` XML text.
    pub fn parse(xml: &str) -> Result<Self, CtxMenuError> {
        // Untrimmed: sources such as " minute(s)" keep their edge spaces.
        // Whitespace between elements is discarded when the next tag starts.
        let mut reader = Reader::from_str(xml);

        let mut catalog = Self::default();
        let mut state = ParserState::default();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    handle_start(&mut catalog, &mut state, e)?;
                    state.text.clear();
                }
                Ok(Event::Empty(ref e)) => {
                    // `<translation type="unfinished"/>` and friends
                    handle_start(&mut catalog, &mut state, e)?;
                    state.text.clear();
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    handle_end(&mut catalog, &mut state, &name);
                }
                Ok(Event::End(ref e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    handle_end(&mut catalog, &mut state, &name);
                    state.text.clear();
                }
                Ok(Event::Text(ref e)) => {
                    let text = e.unescape().map_err(CtxMenuError::from)?;
                    state.text.push_str(&text);
                }
                Ok(Event::CData(ref e)) => {
                    state.text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(e.into()),
                _ => {}
            }
            buf.clear();
        }

        tracing::debug!(
            language = %catalog.language,
            messages = catalog.messages.len(),
            "Parsed locale catalog"
        );
        Ok(catalog)
    }

    /// Language declared by the `<TS language="..">` root.
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the catalog has no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Raw message lookup.
    pub fn message(&self, context: &str, source: &str) -> Option<&Message> {
        self.messages.get(&(context.to_string(), source.to_string()))
    }

    /// Translate `source` in `context`.
    ///
    /// Missing, empty, unfinished and obsolete translations fall back to the
    /// source text. For numerus messages `count` picks the form through
    /// `rule`; `%n` is replaced by the count and `%Ln` by the count with the
    /// catalog language's digit grouping.
    pub fn translate<'a>(
        &'a self,
        context: &str,
        source: &'a str,
        count: Option<u64>,
        rule: PluralRule,
    ) -> Cow<'a, str> {
        let text: &str = match self.message(context, source) {
            Some(message) if message.is_usable() => {
                let index = match (message.numerus, count) {
                    (true, Some(n)) => rule(n).min(message.forms.len().saturating_sub(1)),
                    _ => 0,
                };
                match message.forms.get(index).map(String::as_str) {
                    Some(form) if !form.is_empty() => form,
                    _ => source,
                }
            }
            _ => source,
        };

        match count {
            Some(n) if text.contains("%n") || text.contains("%Ln") => Cow::Owned(
                text.replace("%Ln", &group_digits(n, digit_group_separator(&self.language)))
                    .replace("%n", &n.to_string()),
            ),
            _ => Cow::Borrowed(text),
        }
    }
}

/// Thousands separator used for `%Ln` in `language`.
fn digit_group_separator(language: &str) -> char {
    let language = language.split(['_', '-']).next().unwrap_or_default();
    match language {
        "de" | "es" | "it" | "nl" | "pt" | "da" | "id" | "tr" | "el" => '.',
        "fr" | "ru" | "uk" | "pl" | "cs" | "sk" | "sv" | "nb" | "fi" | "hu" | "be" => '\u{a0}',
        _ => ',',
    }
}

fn group_digits(n: u64, separator: char) -> String {
    let digits = n.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(separator);
        }
        grouped.push(digit);
    }
    grouped
}

fn attribute(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

fn handle_start(
    catalog: &mut LocaleCatalog,
    state: &mut ParserState,
    e: &BytesStart,
) -> Result<(), CtxMenuError> {
    match e.name().as_ref() {
        b"TS" => {
            catalog.language = attribute(e, b"language").unwrap_or_default();
        }
        b"message" => {
            state.message = Some(Message {
                numerus: attribute(e, b"numerus").as_deref() == Some("yes"),
                ..Default::default()
            });
        }
        b"translation" => {
            let Some(message) = state.message.as_mut() else {
                return Err(CtxMenuError::locale("<translation> outside of <message>"));
            };
            message.state = attribute(e, b"type")
                .map(|t| TranslationState::parse(&t))
                .unwrap_or_default();
            state.in_translation = true;
        }
        _ => {}
    }
    Ok(())
}

fn handle_end(catalog: &mut LocaleCatalog, state: &mut ParserState, name: &str) {
    match name {
        "name" if state.message.is_none() => {
            state.context = Some(state.text.clone());
        }
        "source" => {
            if let Some(message) = state.message.as_mut() {
                message.source = state.text.clone();
            }
        }
        "comment" => {
            if let Some(message) = state.message.as_mut() {
                message.comment = Some(state.text.clone());
            }
        }
        "numerusform" if state.in_translation => {
            if let Some(message) = state.message.as_mut() {
                message.forms.push(state.text.clone());
            }
        }
        "translation" => {
            if let Some(message) = state.message.as_mut() {
                if !message.numerus {
                    message.forms = vec![state.text.clone()];
                }
            }
            state.in_translation = false;
        }
        "message" => {
            if let Some(message) = state.message.take() {
                let context = state.context.clone().unwrap_or_default();
                catalog.messages.insert((context, message.source.clone()), message);
            }
        }
        "context" => {
            state.context = None;
        }
        _ => {}
    }
}
