//! Usage-extraction interface
//!
//! Turning component source into raw class-site candidates is the job of an
//! external syntax collaborator (an AST or pattern matcher). The index
//! builder consumes it through this trait and treats its output as untrusted:
//! every resolved token is re-validated against the token set built in the
//! same pass.

use std::path::Path;

/// One raw class-site candidate reported by an extractor.
#[derive(Debug, Clone)]
pub struct RawUsage {
    /// 1-based line
    pub line: u32,
    /// 1-based column of the class within the line
    pub column: u32,
    /// The utility class as written
    pub class_name: String,
    /// Component the site belongs to, when the extractor can attribute one
    pub component: Option<String>,
}

/// Produces raw class-site candidates from component source.
pub trait UsageExtractor {
    fn extract(&self, file: &Path, source: &str) -> Vec<RawUsage>;
}
