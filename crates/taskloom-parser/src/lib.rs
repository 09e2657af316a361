//! Request-payload parsing: metadata directives, tabular and JSON task
//! grammars, and the input-level verifier that runs before graph
//! construction.

pub mod json;
pub mod metadata;
pub mod payload;
pub mod rows;
pub mod tabular;
pub mod verify;

pub use json::parse_json_tasks;
pub use metadata::extract_metadata;
pub use payload::{parse_payload, ParsedInput};
pub use rows::rows_from_text;
pub use tabular::parse_tasks;
pub use verify::verify_inputs;
