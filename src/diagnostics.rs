//! # Per-session logging and type-name registry
//!
//! Every [`IoBuffer`](crate::IoBuffer) owns a [`Diagnostics`] value. Warnings about
//! resynchronisation, malformed items or clipped values go through it in
//! addition to the `Result` the operation returns. By default messages become
//! [`tracing`] events with target `eventio`; a host can install its own sink or
//! silence a session without touching any other session.
//!
//! ```
//! use eventio::diagnostics::{Diagnostics, Registry, Severity};
//! use std::sync::{Arc, Mutex};
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let log = seen.clone();
//!
//! let mut registry = Registry::new();
//! registry.register(1200, "MCRunHeader", "Run-level simulation parameters");
//!
//! let diag = Diagnostics::new()
//!     .with_threshold(Severity::Info)
//!     .with_sink(move |sev, msg| log.lock().unwrap().push((sev, msg.to_string())))
//!     .with_registry(registry);
//!
//! diag.warn(format_args!("{} bytes skipped", 3));
//! assert_eq!(seen.lock().unwrap()[0], (Severity::Warning, "3 bytes skipped".to_string()));
//! assert_eq!(diag.type_name(1200), Some("MCRunHeader"));
//! ```

use std::{collections::HashMap, fmt, sync::Arc};

/// How serious a message is.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A host-supplied message sink.
pub type LogSink = Arc<dyn Fn(Severity, &str) + Send + Sync>;

/// Name and description of a well-known item type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeInfo {
    pub name: String,
    pub description: String,
}

/// Looks up names for item type numbers, used when listing items.
pub trait TypeRegistry: Send + Sync {
    fn lookup(&self, item_type: u16) -> Option<&TypeInfo>;
}

/// A [`TypeRegistry`] backed by a hash map.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    entries: HashMap<u16, TypeInfo>,
}

impl Registry {
    pub fn new() -> Self { Self::default() }

    /// Adds or replaces the entry for `item_type`.
    pub fn register(&mut self, item_type: u16, name: &str, description: &str) -> &mut Self {
        self.entries.insert(
            item_type,
            TypeInfo {
                name: name.to_string(),
                description: description.to_string(),
            },
        );
        self
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

impl TypeRegistry for Registry {
    fn lookup(&self, item_type: u16) -> Option<&TypeInfo> { self.entries.get(&item_type) }
}

/// Logging threshold, optional sink and optional type registry of one session.
#[derive(Clone)]
pub struct Diagnostics {
    threshold: Option<Severity>,
    sink: Option<LogSink>,
    registry: Option<Arc<dyn TypeRegistry>>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Diagnostics {
            threshold: Some(Severity::Warning),
            sink: None,
            registry: None,
        }
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("threshold", &self.threshold)
            .field("sink", &self.sink.is_some())
            .field("registry", &self.registry.is_some())
            .finish()
    }
}

impl Diagnostics {
    /// Warnings and errors to `tracing`, no registry.
    pub fn new() -> Self { Self::default() }

    /// Drops every message.
    pub fn silent() -> Self {
        Diagnostics {
            threshold: None,
            ..Self::default()
        }
    }

    pub fn with_threshold(mut self, threshold: Severity) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_sink<F>(mut self, sink: F) -> Self
    where
        F: Fn(Severity, &str) + Send + Sync + 'static,
    {
        self.sink = Some(Arc::new(sink));
        self
    }

    pub fn with_registry<R: TypeRegistry + 'static>(mut self, registry: R) -> Self {
        self.registry = Some(Arc::new(registry));
        self
    }

    pub fn threshold(&self) -> Option<Severity> { self.threshold }

    /// Would a message of this severity be emitted?
    pub fn enabled(&self, severity: Severity) -> bool {
        self.threshold.map_or(false, |t| severity >= t)
    }

    pub fn emit<D: fmt::Display>(&self, severity: Severity, msg: D) {
        if !self.enabled(severity) {
            return;
        }
        match &self.sink {
            Some(sink) => sink(severity, &msg.to_string()),
            None => match severity {
                Severity::Info => tracing::info!(target: "eventio", "{}", msg),
                Severity::Warning => tracing::warn!(target: "eventio", "{}", msg),
                Severity::Error => tracing::error!(target: "eventio", "{}", msg),
            },
        }
    }

    pub fn info<D: fmt::Display>(&self, msg: D) { self.emit(Severity::Info, msg) }

    pub fn warn<D: fmt::Display>(&self, msg: D) { self.emit(Severity::Warning, msg) }

    pub fn error<D: fmt::Display>(&self, msg: D) { self.emit(Severity::Error, msg) }

    pub fn type_info(&self, item_type: u16) -> Option<&TypeInfo> {
        self.registry.as_ref().and_then(|r| r.lookup(item_type))
    }

    pub fn type_name(&self, item_type: u16) -> Option<&str> {
        self.type_info(item_type).map(|info| info.name.as_str())
    }

    /// The `"\t[name] description"` suffix used by the listings, empty when
    /// `verbosity` is 0 or the type is unknown.
    pub(crate) fn type_label(&self, item_type: u16, verbosity: u32) -> String {
        if verbosity == 0 {
            return String::new();
        }
        match self.type_info(item_type) {
            Some(info) if !info.name.is_empty() => {
                if verbosity >= 2 {
                    format!("\t[{}] {}", info.name, info.description)
                } else {
                    format!("\t[{}] ", info.name)
                }
            }
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn capture(threshold: Severity) -> (Diagnostics, Arc<Mutex<Vec<(Severity, String)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        let diag = Diagnostics::new()
            .with_threshold(threshold)
            .with_sink(move |sev, msg| log.lock().unwrap().push((sev, msg.to_string())));
        (diag, seen)
    }

    #[test]
    fn threshold_filters() {
        let (diag, seen) = capture(Severity::Warning);
        diag.info("extended");
        diag.warn("skipped");
        diag.error("broken");
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, Severity::Warning);
        assert_eq!(seen[1], (Severity::Error, "broken".to_string()));
    }

    #[test]
    fn silent_drops_everything() {
        let diag = Diagnostics::silent();
        assert!(!diag.enabled(Severity::Error));
        diag.error("nobody hears this");
    }

    #[test]
    fn sessions_do_not_share_state() {
        let (loud, seen) = capture(Severity::Info);
        let quiet = loud.clone().with_threshold(Severity::Error);
        quiet.warn("quiet");
        loud.warn("loud");
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn labels() {
        let mut registry = Registry::new();
        registry.register(2000, "TelEvent", "Telescope event data");
        assert_eq!(registry.lookup(2000).map(|info| info.name.as_str()), Some("TelEvent"));
        assert!(registry.lookup(2001).is_none());
        let diag = Diagnostics::silent().with_registry(registry);

        assert_eq!(diag.type_label(2000, 0), "");
        assert_eq!(diag.type_label(2000, 1), "\t[TelEvent] ");
        assert_eq!(diag.type_label(2000, 2), "\t[TelEvent] Telescope event data");
        assert_eq!(diag.type_label(17, 2), "");
    }
}
