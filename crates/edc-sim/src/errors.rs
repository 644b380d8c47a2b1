//! ---
//! edc_section: "07-simulation-workflow"
//! edc_subsection: "module"
//! edc_type: "source"
//! edc_scope: "code"
//! edc_description: "Error taxonomy for the simulation workflow."
//! edc_version: "v0.0.0-prealpha"
//! edc_owner: "tbd"
//! ---
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("commit requested while no simulation is active")]
    NotSimulating,
}
