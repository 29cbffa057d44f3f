//! Binary-side wiring: building the runtime from settings and rendering
//! batch progress.

pub(crate) mod progress_manager;
pub(crate) mod runtime;
