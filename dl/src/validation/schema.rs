//! Response schemas sent to the model
//!
//! These describe the writer and reviewer shapes in the model API's
//! OpenAPI-subset schema format. The field descriptions are read by the
//! model, so they double as instructions.

use serde_json::{Value, json};
use tracing::debug;

use super::Shape;

/// Schema for the writer's reply
pub fn writer_schema(draft_count: u8) -> Value {
    debug!(draft_count, "writer_schema: called");
    json!({
        "type": "OBJECT",
        "properties": {
            "overallResponseToReview": {
                "type": "STRING",
                "description": "Detailed response to the consolidated feedback from the previous review. If this is the first round, state 'Initial draft generation attempt.'."
            },
            "drafts": {
                "type": "ARRAY",
                "description": format!("Exactly {} distinct drafts, as requested.", draft_count),
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "content": {
                            "type": "STRING",
                            "description": "The full text of this draft."
                        },
                        "revisionSummary": {
                            "type": "STRING",
                            "description": "Summary of the changes made in this draft. For a first draft, state 'Generated from the initial brief for this draft variant.'."
                        }
                    },
                    "required": ["content", "revisionSummary"]
                }
            }
        },
        "required": ["overallResponseToReview", "drafts"]
    })
}

/// Schema for the reviewer's reply
pub fn reviewer_schema(draft_count: u8) -> Value {
    debug!(draft_count, "reviewer_schema: called");
    json!({
        "type": "OBJECT",
        "properties": {
            "draftReviews": {
                "type": "ARRAY",
                "description": format!("Exactly {} review objects, one per draft, in the order the drafts were given.", draft_count),
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "reviewText": {
                            "type": "STRING",
                            "description": "Comprehensive review comments for this draft."
                        },
                        "score": {
                            "type": "INTEGER",
                            "description": "An integer score from 0 to 100 for this draft."
                        }
                    },
                    "required": ["reviewText", "score"]
                }
            },
            "selectedIndex": {
                "type": "INTEGER",
                "description": "The 0-based index of the best draft among the drafts provided."
            },
            "consolidatedFeedback": {
                "type": "STRING",
                "description": "Key overall feedback, reasons for the selection, and actionable suggestions that guide the writer's next revision of the selected draft."
            }
        },
        "required": ["draftReviews", "selectedIndex", "consolidatedFeedback"]
    })
}

/// Schema matching a validation shape
pub fn schema_for(shape: Shape) -> Value {
    match shape {
        Shape::Writer { draft_count } => writer_schema(draft_count),
        Shape::Reviewer { draft_count } => reviewer_schema(draft_count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required(schema: &Value) -> Vec<&str> {
        schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect()
    }

    #[test]
    fn test_writer_schema_fields() {
        let schema = writer_schema(2);
        assert_eq!(schema["type"], "OBJECT");
        assert_eq!(required(&schema), vec!["overallResponseToReview", "drafts"]);

        let items = &schema["properties"]["drafts"]["items"];
        assert_eq!(required(items), vec!["content", "revisionSummary"]);
        assert!(
            schema["properties"]["drafts"]["description"]
                .as_str()
                .unwrap()
                .contains("Exactly 2")
        );
    }

    #[test]
    fn test_reviewer_schema_fields() {
        let schema = reviewer_schema(3);
        assert_eq!(
            required(&schema),
            vec!["draftReviews", "selectedIndex", "consolidatedFeedback"]
        );
        assert_eq!(schema["properties"]["selectedIndex"]["type"], "INTEGER");
        assert_eq!(
            schema["properties"]["draftReviews"]["items"]["properties"]["score"]["type"],
            "INTEGER"
        );
    }

    #[test]
    fn test_schema_for_shape() {
        assert_eq!(schema_for(Shape::Writer { draft_count: 1 }), writer_schema(1));
        assert_eq!(schema_for(Shape::Reviewer { draft_count: 1 }), reviewer_schema(1));
    }
}
