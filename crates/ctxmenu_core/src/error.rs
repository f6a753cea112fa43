//! Error types for ctxmenu.
//!
//! Vetoes from host hooks are ordinary control flow and never show up here.
//! Everything in this module is either a caller mistake detected up front
//! (bad options, selectors, anchors, definitions) or an I/O-ish failure of an
//! external collaborator (locale catalogs, notification backends).

use thiserror::Error;

/// Main error type for ctxmenu.
#[derive(Debug, Error)]
pub enum CtxMenuError {
    /// Invalid controller configuration (missing root scope, bad option value).
    #[error("Config error: {message}")]
    Config {
        /// Human-readable error message.
        message: String,
        /// Actionable hint for the caller.
        hint: Option<String>,
    },

    /// A CSS-like selector could not be parsed.
    #[error("Selector error: {message} in '{input}'")]
    Selector {
        /// Human-readable error message.
        message: String,
        /// The selector text that failed to parse.
        input: String,
    },

    /// A position anchor such as `"left+5 top"` could not be parsed.
    #[error("Position error: {message}")]
    Position {
        /// Human-readable error message.
        message: String,
    },

    /// A menu definition was malformed.
    #[error("Definition error: {message}")]
    Definition {
        /// Human-readable error message.
        message: String,
        /// Optional underlying error source.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A locale catalog could not be read or parsed.
    #[error("Locale error: {message}")]
    Locale {
        /// Human-readable error message.
        message: String,
        /// Optional path to the catalog that caused the error.
        path: Option<String>,
        /// Optional underlying error source.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The desktop notification backend failed.
    #[error("Notification error: {message}")]
    Notification {
        /// Human-readable error message.
        message: String,
    },

    /// File system error.
    #[error("IO error: {message}")]
    Io {
        /// Human-readable error message.
        message: String,
        /// Optional underlying error source.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Unexpected internal error.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
    },
}

impl CtxMenuError {
    // ========== Constructors ==========

    /// Create a new config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into(), hint: None }
    }

    /// Create a new config error with a custom hint.
    pub fn config_with_hint(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::Config { message: message.into(), hint: Some(hint.into()) }
    }

    /// Create a new selector error.
    pub fn selector(message: impl Into<String>, input: impl Into<String>) -> Self {
        Self::Selector { message: message.into(), input: input.into() }
    }

    /// Create a new position error.
    pub fn position(message: impl Into<String>) -> Self {
        Self::Position { message: message.into() }
    }

    /// Create a new definition error.
    pub fn definition(message: impl Into<String>) -> Self {
        Self::Definition { message: message.into(), source: None }
    }

    /// Create a new locale error.
    pub fn locale(message: impl Into<String>) -> Self {
        Self::Locale { message: message.into(), path: None, source: None }
    }

    /// Wrap a parse failure of the catalog at `path`.
    pub fn locale_in_file(path: impl Into<String>, source: CtxMenuError) -> Self {
        Self::Locale { message: source.to_string(), path: Some(path.into()), source: Some(Box::new(source)) }
    }

    /// Create a new notification error.
    pub fn notification(message: impl Into<String>) -> Self {
        Self::Notification { message: message.into() }
    }

    /// Create a new internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    // ========== Methods ==========

    /// Get the error category name.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config { .. } => "Config",
            Self::Selector { .. } => "Selector",
            Self::Position { .. } => "Position",
            Self::Definition { .. } => "Definition",
            Self::Locale { .. } => "Locale",
            Self::Notification { .. } => "Notification",
            Self::Io { .. } => "IO",
            Self::Internal { .. } => "Internal",
        }
    }

    /// Get actionable hint for the caller.
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::Config { hint, .. } => hint.as_deref(),
            Self::Selector { .. } => {
                Some("Use tag, #id, .class and descendant combinators only")
            }
            Self::Position { .. } => Some("Use anchors like \"left top\" or \"right+5 bottom\""),
            Self::Definition { .. } => Some("Check the menu definition JSON"),
            Self::Locale { .. } => Some("The catalog may be missing or malformed"),
            Self::Notification { .. } => None,
            Self::Io { .. } => Some("Check file permissions and paths"),
            Self::Internal { .. } => Some("Please report this issue"),
        }
    }

    /// Check if this error was caused by bad caller configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::Selector { .. } | Self::Position { .. })
    }

    /// Convert to user-displayable error info.
    pub fn to_error_info(&self) -> ErrorInfo {
        let error_type = format!("{} Error", self.category());
        let message = self.to_string();
        let hint = self.hint().map(String::from);

        let technical_detail = match self {
            Self::Locale { path: Some(path), .. } => Some(format!("Catalog: {path}")),
            Self::Selector { input, .. } => Some(format!("Selector: {input}")),
            _ => None,
        };

        ErrorInfo { error_type, message, hint, technical_detail }
    }
}

/// User-displayable error information.
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    /// Category name (e.g., "Config Error").
    pub error_type: String,
    /// User-friendly message.
    pub message: String,
    /// Actionable suggestion.
    pub hint: Option<String>,
    /// Technical detail for "Show Details" expansion.
    pub technical_detail: Option<String>,
}

// ========== Error Conversions ==========

/// Convert from std::io::Error to CtxMenuError.
impl From<std::io::Error> for CtxMenuError {
    fn from(err: std::io::Error) -> Self {
        CtxMenuError::Io { message: err.to_string(), source: Some(Box::new(err)) }
    }
}

/// Convert from serde_json::Error to CtxMenuError.
impl From<serde_json::Error> for CtxMenuError {
    fn from(err: serde_json::Error) -> Self {
        CtxMenuError::Definition {
            message: format!("JSON error: {err}"),
            source: Some(Box::new(err)),
        }
    }
}

/// Convert from quick_xml::Error to CtxMenuError.
impl From<quick_xml::Error> for CtxMenuError {
    fn from(err: quick_xml::Error) -> Self {
        CtxMenuError::Locale {
            message: format!("XML error: {err}"),
            path: None,
            source: Some(Box::new(err)),
        }
    }
}
