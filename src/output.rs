//! Result record returned by every conversion.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The outcome of one conversion call.
///
/// `html` is always populated, even when `success` is false: images that
/// failed to embed keep their original `src`, so callers may still use the
/// partial output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    /// Final inline-styled HTML.
    pub html: String,
    /// Rendered HTML of each code block, keyed by its placeholder token.
    pub code_blocks: HashMap<String, String>,
    /// `true` iff `errors` is empty.
    pub success: bool,
    /// Non-fatal notices in document order (e.g. oversized images).
    pub warnings: Vec<String>,
    /// Item-scoped failures in document order (e.g. missing images).
    pub errors: Vec<String>,
}

impl ConversionResult {
    /// Assemble a result; `success` is derived from `errors`.
    pub fn new(
        html: String,
        code_blocks: HashMap<String, String>,
        warnings: Vec<String>,
        errors: Vec<String>,
    ) -> Self {
        Self {
            success: errors.is_empty(),
            html,
            code_blocks,
            warnings,
            errors,
        }
    }

    /// True when there is anything to report to the user.
    pub fn has_diagnostics(&self) -> bool {
        !self.warnings.is_empty() || !self.errors.is_empty()
    }
}
