//! CLI command handlers.

mod prune;
mod scrape;
mod serve;
mod session;

pub use prune::run_prune_command;
pub use scrape::{run_company_command, run_jobs_command, run_profiles_command};
pub use serve::run_serve_command;
pub use session::{
    run_session_clear_command, run_session_import_command, run_session_status_command,
};
