//! Validation of model replies
//!
//! - `response`: repair + parse + shape checks for raw model text
//! - `schema`: the response schemas the model is asked to follow

mod response;
mod schema;

pub use response::{
    Shape, Validated, Violation, inspect, inspect_reviewer, inspect_writer, sanitize, validate, validate_reviewer,
    validate_writer,
};
pub use schema::{reviewer_schema, schema_for, writer_schema};
