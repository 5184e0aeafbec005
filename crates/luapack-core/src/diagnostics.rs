use crate::span::Span;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Warning,
    Info,
}

/// A non-fatal message about one module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub path: PathBuf,
    pub span: Span,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(path: impl Into<PathBuf>, span: Span, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            path: path.into(),
            span,
            message: message.into(),
        }
    }

    pub fn info(path: impl Into<PathBuf>, span: Span, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Info,
            path: path.into(),
            span,
            message: message.into(),
        }
    }
}

/// Trait for handling diagnostics
/// This allows for dependency injection and testing with mock handlers
pub trait DiagnosticHandler: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);

    fn warning(&self, path: &Path, span: Span, message: &str) {
        self.report(Diagnostic::warning(path, span, message));
    }

    fn info(&self, path: &Path, span: Span, message: &str) {
        self.report(Diagnostic::info(path, span, message));
    }
}

/// Forwards diagnostics to `tracing`. Keeps nothing, so a long-lived
/// bundler (watch mode) does not accumulate them.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnosticHandler;

impl TracingDiagnosticHandler {
    pub fn new() -> Self {
        Self
    }
}

impl DiagnosticHandler for TracingDiagnosticHandler {
    fn report(&self, diagnostic: Diagnostic) {
        match diagnostic.level {
            DiagnosticLevel::Warning => tracing::warn!(
                "{}:{}: {}",
                diagnostic.path.display(),
                diagnostic.span,
                diagnostic.message
            ),
            DiagnosticLevel::Info => tracing::info!(
                "{}:{}: {}",
                diagnostic.path.display(),
                diagnostic.span,
                diagnostic.message
            ),
        }
    }
}

/// Collecting diagnostic handler for testing
/// Collects all diagnostics without printing
#[derive(Default)]
pub struct CollectingDiagnosticHandler {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl CollectingDiagnosticHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warning_count(&self) -> usize {
        self.get_diagnostics()
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Warning)
            .count()
    }

    pub fn get_diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .map(|diagnostics| diagnostics.clone())
            .unwrap_or_default()
    }
}

impl DiagnosticHandler for CollectingDiagnosticHandler {
    fn report(&self, diagnostic: Diagnostic) {
        if let Ok(mut diagnostics) = self.diagnostics.lock() {
            diagnostics.push(diagnostic);
        }
    }
}
