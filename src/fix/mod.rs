//! Issue-to-pull-request fix generation.
//!
//! See [`FixPipeline`] for the stages. File selection and generation are
//! usable on their own.

pub mod generation;
pub mod pipeline;
pub mod selection;


pub use generation::{GenerationError, MAX_GENERATION_ATTEMPTS, fix_schema, generate_fix};
pub use pipeline::{FixError, FixOutcome, FixPipeline};
pub use selection::{MAX_SELECTED_FILES, SelectionError, select_files};
