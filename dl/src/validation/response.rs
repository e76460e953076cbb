//! Model response validation
//!
//! Turns untrusted model text into typed writer/reviewer values. The repair
//! step tolerates the cosmetic noise models commonly add (code fences, stray
//! control bytes); everything else about the shape must hold exactly.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{DraftCandidate, DraftReview, ReviewerOutput, WriterOutput};

/// Expected shape of a reply, with the draft count it must agree with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Writer { draft_count: u8 },
    Reviewer { draft_count: u8 },
}

impl Shape {
    pub fn name(&self) -> &'static str {
        match self {
            Shape::Writer { .. } => "writer",
            Shape::Reviewer { .. } => "reviewer",
        }
    }
}

/// A reply that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validated {
    Writer(WriterOutput),
    Reviewer(ReviewerOutput),
}

/// Why a reply was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("not valid JSON: {0}")]
    Syntax(String),

    #[error("unexpected structure: {0}")]
    Shape(String),

    #[error("value out of range: {0}")]
    Range(String),

    #[error("expected {expected} {field}, got {actual}")]
    Count {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("selected index {index} is not valid for {len} reviews")]
    Selection { index: i64, len: usize },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWriter {
    overall_response_to_review: String,
    drafts: Vec<RawDraft>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDraft {
    content: String,
    revision_summary: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReviewer {
    draft_reviews: Vec<RawReview>,
    selected_index: f64,
    consolidated_feedback: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReview {
    review_text: String,
    score: f64,
}

/// Characters that may not appear raw inside JSON text (tab, LF and CR are kept)
fn is_illegal_control(c: char) -> bool {
    matches!(c, '\u{0000}'..='\u{0008}' | '\u{000B}' | '\u{000C}' | '\u{000E}'..='\u{001F}')
}

/// Strip a surrounding code fence, with an optional language tag on the opening line
fn strip_fence(text: &str) -> &str {
    let Some(inner) = text.strip_prefix("```").and_then(|rest| rest.strip_suffix("```")) else {
        return text;
    };

    let tag_len = inner
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        .unwrap_or(inner.len());
    let (tag, rest) = inner.split_at(tag_len);

    if tag.is_empty() || rest.starts_with(|c: char| c.is_whitespace() || c == '{' || c == '[') {
        debug!(tag, "strip_fence: removed code fence");
        rest.trim()
    } else {
        inner.trim()
    }
}

/// Repair known cosmetic deviations so the remaining text can be parsed
pub fn sanitize(raw: &str) -> String {
    let cleaned: String = raw.chars().filter(|c| !is_illegal_control(*c)).collect();
    if cleaned.len() != raw.len() {
        debug!(removed = raw.len() - cleaned.len(), "sanitize: removed control characters");
    }
    strip_fence(cleaned.trim()).to_string()
}

fn integral(value: f64, what: impl FnOnce() -> String) -> Result<i64, Violation> {
    if !value.is_finite() || value.fract() != 0.0 || value.abs() > i64::MAX as f64 {
        return Err(Violation::Range(format!("{} must be an integer, got {}", what(), value)));
    }
    Ok(value as i64)
}

fn check_count(field: &'static str, expected: u8, actual: usize) -> Result<(), Violation> {
    if actual != usize::from(expected) {
        return Err(Violation::Count {
            field,
            expected: usize::from(expected),
            actual,
        });
    }
    Ok(())
}

fn writer_from(value: Value, draft_count: u8) -> Result<WriterOutput, Violation> {
    let raw: RawWriter = serde_json::from_value(value).map_err(|e| Violation::Shape(e.to_string()))?;
    check_count("drafts", draft_count, raw.drafts.len())?;

    Ok(WriterOutput {
        overall_response_to_review: raw.overall_response_to_review,
        drafts: raw
            .drafts
            .into_iter()
            .map(|d| DraftCandidate::new(d.content, d.revision_summary))
            .collect(),
    })
}

fn reviewer_from(value: Value, draft_count: u8) -> Result<ReviewerOutput, Violation> {
    let raw: RawReviewer = serde_json::from_value(value).map_err(|e| Violation::Shape(e.to_string()))?;
    check_count("draftReviews", draft_count, raw.draft_reviews.len())?;

    let mut reviews = Vec::with_capacity(raw.draft_reviews.len());
    for (i, review) in raw.draft_reviews.into_iter().enumerate() {
        let score = integral(review.score, || format!("draftReviews[{}].score", i))?;
        let score = u8::try_from(score)
            .ok()
            .filter(|s| *s <= 100)
            .ok_or_else(|| Violation::Range(format!("draftReviews[{}].score {} is outside 0..=100", i, score)))?;
        reviews.push(DraftReview::new(review.review_text, score));
    }

    let index = integral(raw.selected_index, || "selectedIndex".to_string())?;
    let selection_ok = if reviews.is_empty() {
        index == -1
    } else {
        usize::try_from(index).is_ok_and(|i| i < reviews.len())
    };
    if !selection_ok {
        return Err(Violation::Selection {
            index,
            len: reviews.len(),
        });
    }

    Ok(ReviewerOutput {
        draft_reviews: reviews,
        selected_index: index,
        consolidated_feedback: raw.consolidated_feedback,
    })
}

/// Validate raw model text against a shape, reporting why it was rejected
pub fn inspect(raw: &str, shape: Shape) -> Result<Validated, Violation> {
    debug!(shape = shape.name(), len = raw.len(), "inspect: called");
    let cleaned = sanitize(raw);
    let value: Value = serde_json::from_str(&cleaned).map_err(|e| Violation::Syntax(e.to_string()))?;

    match shape {
        Shape::Writer { draft_count } => writer_from(value, draft_count).map(Validated::Writer),
        Shape::Reviewer { draft_count } => reviewer_from(value, draft_count).map(Validated::Reviewer),
    }
}

/// Validate raw model text; `None` is the only failure signal
pub fn validate(raw: &str, shape: Shape) -> Option<Validated> {
    match inspect(raw, shape) {
        Ok(v) => Some(v),
        Err(violation) => {
            warn!(shape = shape.name(), %violation, "validate: response rejected");
            None
        }
    }
}

pub fn inspect_writer(raw: &str, draft_count: u8) -> Result<WriterOutput, Violation> {
    match inspect(raw, Shape::Writer { draft_count })? {
        Validated::Writer(w) => Ok(w),
        Validated::Reviewer(_) => Err(Violation::Shape("expected writer output".to_string())),
    }
}

pub fn inspect_reviewer(raw: &str, draft_count: u8) -> Result<ReviewerOutput, Violation> {
    match inspect(raw, Shape::Reviewer { draft_count })? {
        Validated::Reviewer(r) => Ok(r),
        Validated::Writer(_) => Err(Violation::Shape("expected reviewer output".to_string())),
    }
}

pub fn validate_writer(raw: &str, draft_count: u8) -> Option<WriterOutput> {
    match validate(raw, Shape::Writer { draft_count })? {
        Validated::Writer(w) => Some(w),
        Validated::Reviewer(_) => None,
    }
}

pub fn validate_reviewer(raw: &str, draft_count: u8) -> Option<ReviewerOutput> {
    match validate(raw, Shape::Reviewer { draft_count })? {
        Validated::Reviewer(r) => Some(r),
        Validated::Writer(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WRITER: &str = r#"{
        "overallResponseToReview": "Initial draft generation attempt.",
        "drafts": [
            {"content": "First draft", "revisionSummary": "Generated from the brief"},
            {"content": "Second draft", "revisionSummary": "Alternative angle"}
        ]
    }"#;

    fn reviewer_json(scores: &[&str], selected: &str) -> String {
        let reviews: Vec<String> = scores
            .iter()
            .map(|s| format!(r#"{{"reviewText": "review", "score": {}}}"#, s))
            .collect();
        format!(
            r#"{{"draftReviews": [{}], "selectedIndex": {}, "consolidatedFeedback": "Add examples"}}"#,
            reviews.join(","),
            selected
        )
    }

    #[test]
    fn test_writer_accepts_plain_json() {
        let w = validate_writer(WRITER, 2).unwrap();
        assert_eq!(w.overall_response_to_review, "Initial draft generation attempt.");
        assert_eq!(w.drafts.len(), 2);
        assert_eq!(w.drafts[1].content, "Second draft");
    }

    #[test]
    fn test_writer_accepts_fenced_json() {
        let fenced = format!("```json\n{}\n```", WRITER);
        assert!(validate_writer(&fenced, 2).is_some());

        let bare_fence = format!("  ```\n{}```\n", WRITER);
        assert!(validate_writer(&bare_fence, 2).is_some());
    }

    #[test]
    fn test_writer_accepts_control_bytes() {
        let noisy = format!("\u{0002}{}\u{001F}", WRITER.replace("First draft", "First\u{0007} draft"));
        let w = validate_writer(&noisy, 2).unwrap();
        assert_eq!(w.drafts[0].content, "First draft");
    }

    #[test]
    fn test_writer_rejects_wrong_draft_count() {
        assert_eq!(
            inspect_writer(WRITER, 3),
            Err(Violation::Count {
                field: "drafts",
                expected: 3,
                actual: 2
            })
        );
        assert!(validate_writer(WRITER, 1).is_none());
    }

    #[test]
    fn test_writer_rejects_missing_field() {
        let raw = r#"{"drafts": [{"content": "x", "revisionSummary": "y"}]}"#;
        assert!(matches!(inspect_writer(raw, 1), Err(Violation::Shape(_))));

        let raw = r#"{"overallResponseToReview": "ok", "drafts": [{"content": 5, "revisionSummary": "y"}]}"#;
        assert!(matches!(inspect_writer(raw, 1), Err(Violation::Shape(_))));
    }

    #[test]
    fn test_rejects_syntax_errors() {
        assert!(matches!(inspect_writer("not json at all", 2), Err(Violation::Syntax(_))));
        assert!(matches!(inspect_writer("", 2), Err(Violation::Syntax(_))));
        assert!(matches!(inspect_reviewer("```json\n{\"draftReviews\": [\n```", 2), Err(Violation::Syntax(_))));
    }

    #[test]
    fn test_reviewer_accepts_valid() {
        let r = validate_reviewer(&reviewer_json(&["70", "60"], "0"), 2).unwrap();
        assert_eq!(r.selected_index, 0);
        assert_eq!(r.selected_score(), Some(70));
        assert_eq!(r.consolidated_feedback, "Add examples");
    }

    #[test]
    fn test_reviewer_accepts_integral_float_score() {
        let r = validate_reviewer(&reviewer_json(&["85.0"], "0.0"), 1).unwrap();
        assert_eq!(r.draft_reviews[0].score, 85);
    }

    #[test]
    fn test_reviewer_rejects_score_out_of_range() {
        assert!(matches!(
            inspect_reviewer(&reviewer_json(&["101", "60"], "0"), 2),
            Err(Violation::Range(_))
        ));
        assert!(matches!(
            inspect_reviewer(&reviewer_json(&["-1", "60"], "0"), 2),
            Err(Violation::Range(_))
        ));
        assert!(matches!(
            inspect_reviewer(&reviewer_json(&["85.5"], "0"), 1),
            Err(Violation::Range(_))
        ));
    }

    #[test]
    fn test_reviewer_rejects_bad_selection() {
        assert_eq!(
            inspect_reviewer(&reviewer_json(&["70", "60"], "5"), 2),
            Err(Violation::Selection { index: 5, len: 2 })
        );
        assert_eq!(
            inspect_reviewer(&reviewer_json(&["70", "60"], "-1"), 2),
            Err(Violation::Selection { index: -1, len: 2 })
        );
    }

    #[test]
    fn test_reviewer_rejects_review_count_mismatch() {
        assert_eq!(
            inspect_reviewer(&reviewer_json(&["70"], "0"), 2),
            Err(Violation::Count {
                field: "draftReviews",
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_empty_reviews_require_minus_one() {
        assert!(inspect(&reviewer_json(&[], "-1"), Shape::Reviewer { draft_count: 0 }).is_ok());
        assert!(inspect(&reviewer_json(&[], "0"), Shape::Reviewer { draft_count: 0 }).is_err());
    }

    #[test]
    fn test_unknown_fields_tolerated() {
        let raw = r#"{"overallResponseToReview": "ok", "extra": true,
            "drafts": [{"content": "x", "revisionSummary": "y", "notes": []}]}"#;
        assert!(validate_writer(raw, 1).is_some());
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("  {\"a\":1}  "), "{\"a\":1}");
        assert_eq!(sanitize("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(sanitize("```{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(sanitize("{\"a\":\t1}\r\n"), "{\"a\":\t1}");
        assert_eq!(sanitize("\u{0000}{}\u{000B}"), "{}");
        assert_eq!(sanitize("```json{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(sanitize("```json[1]```"), "[1]");
    }

    #[test]
    fn test_fence_tag_run_into_body() {
        let raw = "```json{\"overallResponseToReview\":\"ok\",\"drafts\":[{\"content\":\"a\",\"revisionSummary\":\"b\"}]}```";
        let writer = inspect_writer(raw, 1).unwrap();
        assert_eq!(writer.drafts[0].content, "a");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn draft_strategy() -> impl Strategy<Value = DraftCandidate> {
            ("[ -~\n]{0,80}", "[ -~]{0,40}").prop_map(|(c, s)| DraftCandidate::new(c, s))
        }

        fn writer_strategy() -> impl Strategy<Value = WriterOutput> {
            ("[ -~]{0,60}", proptest::collection::vec(draft_strategy(), 1..=3)).prop_map(|(overall, drafts)| {
                WriterOutput {
                    overall_response_to_review: overall,
                    drafts,
                }
            })
        }

        fn reviewer_strategy() -> impl Strategy<Value = ReviewerOutput> {
            proptest::collection::vec(("[ -~]{0,60}", 0u8..=100), 1..=3)
                .prop_flat_map(|reviews| {
                    let len = reviews.len() as i64;
                    (Just(reviews), 0..len, "[ -~]{0,60}")
                })
                .prop_map(|(reviews, selected_index, feedback)| ReviewerOutput {
                    draft_reviews: reviews.into_iter().map(|(t, s)| DraftReview::new(t, s)).collect(),
                    selected_index,
                    consolidated_feedback: feedback,
                })
        }

        proptest! {
            #[test]
            fn writer_round_trips(writer in writer_strategy(), fenced in any::<bool>(), noise in any::<bool>()) {
                let mut raw = serde_json::to_string_pretty(&writer).unwrap();
                if noise {
                    raw = format!("\u{0001}{}\u{0008}", raw);
                }
                if fenced {
                    raw = format!("```json\n{}\n```", raw);
                }
                let count = writer.drafts.len() as u8;
                prop_assert_eq!(validate_writer(&raw, count), Some(writer));
            }

            #[test]
            fn reviewer_round_trips(reviewer in reviewer_strategy(), fenced in any::<bool>(), noise in any::<bool>()) {
                let mut raw = serde_json::to_string(&reviewer).unwrap();
                if noise {
                    raw = format!("\u{0002}{}\u{001F}", raw);
                }
                if fenced {
                    raw = format!("```\n{}\n```", raw);
                }
                let count = reviewer.draft_reviews.len() as u8;
                prop_assert_eq!(validate_reviewer(&raw, count), Some(reviewer));
            }

            #[test]
            fn sanitize_removes_control_bytes(raw in "[\\x00-\\x7F]{0,120}") {
                let cleaned = sanitize(&raw);
                prop_assert!(!cleaned.chars().any(is_illegal_control));
                prop_assert_eq!(cleaned.trim(), cleaned.as_str());
            }

            #[test]
            fn fence_repair_matches_bare(writer in writer_strategy(), tag in "(json|JSON|)") {
                let bare = serde_json::to_string_pretty(&writer).unwrap();
                let fenced = format!("```{}\n{}\n```", tag, bare);
                prop_assert_eq!(sanitize(&fenced), sanitize(&bare));
            }

            #[test]
            fn validate_never_panics(raw in "\\PC{0,200}", count in 0u8..=3) {
                let _ = validate(&raw, Shape::Writer { draft_count: count });
                let _ = validate(&raw, Shape::Reviewer { draft_count: count });
            }
        }
    }
}
