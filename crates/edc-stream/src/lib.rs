//! ---
//! edc_section: "06-live-stream"
//! edc_subsection: "module"
//! edc_type: "source"
//! edc_scope: "code"
//! edc_description: "Live meter stream session and rolling history buffer."
//! edc_version: "v0.0.0-prealpha"
//! edc_owner: "tbd"
//! ---
pub mod history;
pub mod session;

pub use history::{HistoryBuffer, HISTORY_CAPACITY};
pub use session::{StreamSession, EVENT_CHANNEL_CAPACITY};
