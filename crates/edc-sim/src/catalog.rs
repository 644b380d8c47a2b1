//! ---
//! edc_section: "07-simulation-workflow"
//! edc_subsection: "module"
//! edc_type: "source"
//! edc_scope: "code"
//! edc_description: "Session-scoped catalog of optimization actions."
//! edc_version: "v0.0.0-prealpha"
//! edc_owner: "tbd"
//! ---
use edc_model::Suggestion;
use tracing::{info, warn};

use crate::backend::CatalogSource;

/// Immutable ordered set of optimization actions, fetched at most once per
/// session.
///
/// A failed fetch or parse marks the catalog loaded-empty: the workflow
/// degrades to "no actions available" rather than an error state.
#[derive(Debug, Default)]
pub struct SuggestionCatalog {
    entries: Option<Vec<Suggestion>>,
}

impl SuggestionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the catalog once; later calls return the cached entries.
    pub async fn load<S: CatalogSource>(&mut self, source: &S) -> &[Suggestion] {
        if self.entries.is_none() {
            let fetched = source.fetch_suggestions().await;
            self.install(fetched);
        }
        self.entries()
    }

    /// Store the result of a fetch performed elsewhere, under the same
    /// once-per-session rule: a second install is ignored until [`reset`]
    /// and a failed fetch marks the catalog loaded-empty.
    ///
    /// [`reset`]: Self::reset
    pub fn install(&mut self, fetched: anyhow::Result<Vec<Suggestion>>) -> &[Suggestion] {
        if self.entries.is_none() {
            let entries = match fetched {
                Ok(entries) => {
                    info!(count = entries.len(), "suggestion catalog loaded");
                    entries
                }
                Err(err) => {
                    warn!(error = %err, "suggestion fetch failed; catalog is empty");
                    Vec::new()
                }
            };
            self.entries = Some(entries);
        }
        self.entries()
    }

    /// True once a load attempt (successful or degraded) has happened.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.entries.is_some()
    }

    /// Current entries; empty before the first load and after a failed one.
    #[must_use]
    pub fn entries(&self) -> &[Suggestion] {
        self.entries.as_deref().unwrap_or(&[])
    }

    /// Find a suggestion by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Suggestion> {
        self.entries().iter().find(|s| s.id == id)
    }

    /// Forget the cached entries so the next view activation refetches.
    pub fn reset(&mut self) {
        self.entries = None;
    }
}
