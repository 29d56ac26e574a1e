//! Compile-time diagnostics.
//!
//! Passes report through a sink rather than returning errors, so one
//! compile surfaces every problem it can find. Codes are stable and part
//! of the public contract; severity depends on the compilation mode.

use std::fmt;

use cadence_ir::Mode;
use serde::{Deserialize, Serialize};

/// Stable diagnostic codes
pub mod codes {
    pub const STRUCT001: &str = "STRUCT001";
    pub const STRUCT002: &str = "STRUCT002";
    pub const TYPE001: &str = "TYPE001";
    pub const WRITE001: &str = "WRITE001";
    pub const WRITE002: &str = "WRITE002";
    pub const CAUS001: &str = "CAUS001";
    pub const CAUS002: &str = "CAUS002";
    pub const CAUS003: &str = "CAUS003";
    pub const CAUS004: &str = "CAUS004";
    pub const INIT001: &str = "INIT001";
    pub const INIT002: &str = "INIT002";
    pub const INIT003: &str = "INIT003";
    pub const ZEN001: &str = "ZEN001";
    pub const SDF001: &str = "SDF001";
    pub const CT001: &str = "CT001";
    pub const CT002: &str = "CT002";
    pub const CT003: &str = "CT003";
}

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A single diagnostic with a stable code
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub code: &'static str,
    pub severity: Severity,
    pub message: String,
    /// Offending node/reaction/variable, if one can be named
    pub location: Option<String>,
    /// Suggested fix
    pub hint: Option<String>,
}

impl Diagnostic {
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(loc) = &self.location {
            write!(f, " @ {loc}")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " (hint: {hint})")?;
        }
        Ok(())
    }
}

/// Collects diagnostics across passes.
///
/// In `BestEffort` mode warnings are demoted to info on entry; strict-mode
/// promotions are decided by the passes that own the code.
#[derive(Debug)]
pub struct DiagnosticSink {
    mode: Mode,
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            diagnostics: Vec::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn error(
        &mut self,
        code: &'static str,
        message: impl Into<String>,
        location: Option<String>,
    ) -> &mut Diagnostic {
        self.push(code, Severity::Error, message.into(), location)
    }

    pub fn warning(
        &mut self,
        code: &'static str,
        message: impl Into<String>,
        location: Option<String>,
    ) -> &mut Diagnostic {
        let severity = match self.mode {
            Mode::BestEffort => Severity::Info,
            _ => Severity::Warning,
        };
        self.push(code, severity, message.into(), location)
    }

    fn push(
        &mut self,
        code: &'static str,
        severity: Severity,
        message: String,
        location: Option<String>,
    ) -> &mut Diagnostic {
        self.diagnostics.push(Diagnostic {
            code,
            severity,
            message,
            location,
            hint: None,
        });
        self.diagnostics.last_mut().unwrap()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_report(self) -> Report {
        Report {
            diagnostics: self.diagnostics,
        }
    }
}

/// Aggregated result of an analysis run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    pub diagnostics: Vec<Diagnostic>,
}

impl Report {
    pub fn success(&self) -> bool {
        !self
            .diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    /// Whether any diagnostic carries the given code
    pub fn has_code(&self, code: &str) -> bool {
        self.diagnostics.iter().any(|d| d.code == code)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cadence compile report")?;
        writeln!(f, "======================")?;
        writeln!(f, "Errors: {}", self.errors().count())?;
        writeln!(f, "Warnings: {}", self.warnings().count())?;
        let errors: Vec<_> = self.errors().collect();
        if !errors.is_empty() {
            writeln!(f, "\nErrors:")?;
            for d in errors {
                writeln!(f, "  {d}")?;
            }
        }
        let warnings: Vec<_> = self.warnings().collect();
        if !warnings.is_empty() {
            writeln!(f, "\nWarnings:")?;
            for d in warnings {
                writeln!(f, "  {d}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_accumulates() {
        let mut sink = DiagnosticSink::new(Mode::Pragmatic);
        sink.error(codes::STRUCT001, "unconnected input", Some("a.x".into()));
        sink.warning(codes::TYPE001, "widening", None);
        assert!(sink.has_errors());
        let report = sink.into_report();
        assert_eq!(report.errors().count(), 1);
        assert_eq!(report.warnings().count(), 1);
        assert!(report.has_code(codes::STRUCT001));
    }

    #[test]
    fn test_best_effort_demotes_warnings() {
        let mut sink = DiagnosticSink::new(Mode::BestEffort);
        sink.warning(codes::TYPE001, "widening", None);
        let report = sink.into_report();
        assert_eq!(report.warnings().count(), 0);
        assert_eq!(report.diagnostics[0].severity, Severity::Info);
    }

    #[test]
    fn test_hint_rendering() {
        let mut sink = DiagnosticSink::new(Mode::Pragmatic);
        sink.error(codes::CAUS003, "non-constructive cycle", Some("scc".into()))
            .hint = Some("insert Delay".to_string());
        let text = sink.into_report().to_string();
        assert!(text.contains("insert Delay"));
    }
}
