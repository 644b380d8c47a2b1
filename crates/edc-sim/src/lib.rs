//! ---
//! edc_section: "07-simulation-workflow"
//! edc_subsection: "module"
//! edc_type: "source"
//! edc_scope: "code"
//! edc_description: "Suggestion catalog and simulate/compare/commit workflow."
//! edc_version: "v0.0.0-prealpha"
//! edc_owner: "tbd"
//! ---
pub mod backend;
pub mod catalog;
pub mod commit;
pub mod controller;
pub mod errors;

pub use backend::{CatalogSource, CommitSink, ForecastSource, SimulationBackend};
pub use catalog::SuggestionCatalog;
pub use commit::{CommitCoordinator, CommitOutcome};
pub use controller::{
    ResolveOutcome, SelectOutcome, SelectionTicket, SimulationController,
};
pub use errors::{Result, SimError};
