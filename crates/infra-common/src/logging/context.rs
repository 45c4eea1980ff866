use std::collections::BTreeMap;
use std::fmt;
use tracing::{Level, Span};

/// Context information for logging
///
/// A `LogContext` names the component doing the work, optionally the
/// operation, and any number of key/value pairs. [`LogContext::span`] turns it
/// into a `tracing` span so every event emitted inside inherits the context.
///
/// ```rust
/// use rmms_infra_common::LogContext;
/// use tracing::Level;
///
/// let ctx = LogContext::with_operation("transaction", "send")
///     .with_field("location", "content://mms/7")
///     .with_field("attempt", 1);
/// assert_eq!(ctx.to_string(), "[transaction][send][attempt=1][location=content://mms/7]");
///
/// let span = ctx.span(Level::INFO);
/// let _entered = span.enter();
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogContext {
    /// Component that is generating the log
    pub component: String,
    /// Operation or action being performed
    pub operation: Option<String>,
    /// Additional contextual fields, kept sorted for stable output
    pub fields: BTreeMap<String, String>,
}

impl LogContext {
    /// Create a new log context with just the component name
    pub fn new<S: Into<String>>(component: S) -> Self {
        LogContext {
            component: component.into(),
            operation: None,
            fields: BTreeMap::new(),
        }
    }

    /// Create a new log context with component and operation
    pub fn with_operation<S: Into<String>, T: Into<String>>(component: S, operation: T) -> Self {
        LogContext {
            component: component.into(),
            operation: Some(operation.into()),
            fields: BTreeMap::new(),
        }
    }

    /// Add a field to the context
    pub fn with_field<S: Into<String>, T: ToString>(mut self, key: S, value: T) -> Self {
        self.fields.insert(key.into(), value.to_string());
        self
    }

    /// Look up a field value
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Create a span with this context's information.
    ///
    /// Span macros need a constant level, hence the match.
    pub fn span(&self, level: Level) -> Span {
        let operation = self.operation.as_deref().unwrap_or("-");
        let fields = self.fields_string();
        match level {
            Level::TRACE => tracing::trace_span!("rmms", component = %self.component, operation = %operation, context = %fields),
            Level::DEBUG => tracing::debug_span!("rmms", component = %self.component, operation = %operation, context = %fields),
            Level::INFO => tracing::info_span!("rmms", component = %self.component, operation = %operation, context = %fields),
            Level::WARN => tracing::warn_span!("rmms", component = %self.component, operation = %operation, context = %fields),
            Level::ERROR => tracing::error_span!("rmms", component = %self.component, operation = %operation, context = %fields),
        }
    }

    fn fields_string(&self) -> String {
        self.fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.component)?;

        if let Some(op) = &self.operation {
            write!(f, "[{}]", op)?;
        }

        for (key, value) in &self.fields {
            write!(f, "[{}={}]", key, value)?;
        }

        Ok(())
    }
}

/// Enter a logging context for the duration of a closure
pub fn with_context<F, R>(context: &LogContext, level: Level, f: F) -> R
where
    F: FnOnce() -> R,
{
    let span = context.span(level);
    let _guard = span.enter();
    f()
}
