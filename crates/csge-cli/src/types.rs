use csge_core::{CreatedProduct, ProductOutcome};
use csge_model::ProductReport;

use crate::cli::Request;

/// Everything one invocation did, for the summary.
#[derive(Debug)]
pub struct RunResult {
    pub request: Request,
    pub dry_run: bool,
    /// Set when `-i` created the product rows.
    pub created: Option<CreatedProduct>,
    pub outcomes: Vec<ProductOutcome>,
}

impl RunResult {
    pub fn new(request: Request, dry_run: bool) -> Self {
        Self {
            request,
            dry_run,
            created: None,
            outcomes: Vec::new(),
        }
    }

    pub fn reports(&self) -> impl Iterator<Item = &ProductReport> {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().ok())
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_ok()).count()
    }

    pub fn has_errors(&self) -> bool {
        self.failure_count() > 0
    }
}
