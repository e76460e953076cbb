//! Writer and reviewer output types
//!
//! These are the typed forms of the two roles' structured replies. Values of
//! these types only come out of the response validator (or tests); they are
//! never mutated after construction.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// One candidate draft produced by the writer role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftCandidate {
    /// Full text of the draft
    pub content: String,

    /// What changed in this draft relative to the previous round
    pub revision_summary: String,
}

impl DraftCandidate {
    pub fn new(content: impl Into<String>, revision_summary: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            revision_summary: revision_summary.into(),
        }
    }
}

/// The writer role's reply for one round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriterOutput {
    /// Writer's answer to the previous consolidated feedback
    pub overall_response_to_review: String,

    /// Candidate drafts, in the order the writer produced them
    pub drafts: Vec<DraftCandidate>,
}

/// The reviewer's assessment of a single draft
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftReview {
    pub review_text: String,

    /// Score in 0..=100
    pub score: u8,
}

impl DraftReview {
    pub fn new(review_text: impl Into<String>, score: u8) -> Self {
        Self {
            review_text: review_text.into(),
            score,
        }
    }
}

/// The reviewer role's reply for one round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewerOutput {
    /// One review per draft, same order as the drafts
    pub draft_reviews: Vec<DraftReview>,

    /// 0-based index of the best draft; -1 only when there are no reviews
    pub selected_index: i64,

    /// Feedback that seeds the next writer round
    pub consolidated_feedback: String,
}

impl ReviewerOutput {
    /// The selected index, if it points at an existing review
    pub fn selected(&self) -> Option<usize> {
        let idx = usize::try_from(self.selected_index).ok()?;
        if idx < self.draft_reviews.len() {
            Some(idx)
        } else {
            debug!(
                selected_index = self.selected_index,
                review_count = self.draft_reviews.len(),
                "ReviewerOutput::selected: index out of range"
            );
            None
        }
    }

    /// Score of the reviewer-selected draft, if the selection is in range
    pub fn selected_score(&self) -> Option<u8> {
        self.selected().map(|idx| self.draft_reviews[idx].score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reviewer(scores: &[u8], selected_index: i64) -> ReviewerOutput {
        ReviewerOutput {
            draft_reviews: scores.iter().map(|s| DraftReview::new("ok", *s)).collect(),
            selected_index,
            consolidated_feedback: "tighten the intro".to_string(),
        }
    }

    #[test]
    fn test_selected_score_in_range() {
        let r = reviewer(&[70, 60], 0);
        assert_eq!(r.selected(), Some(0));
        assert_eq!(r.selected_score(), Some(70));

        let r = reviewer(&[70, 88], 1);
        assert_eq!(r.selected_score(), Some(88));
    }

    #[test]
    fn test_selected_score_out_of_range() {
        assert_eq!(reviewer(&[70, 60], 2).selected_score(), None);
        assert_eq!(reviewer(&[70, 60], 9).selected_score(), None);
        assert_eq!(reviewer(&[70, 60], -1).selected_score(), None);
        assert_eq!(reviewer(&[], -1).selected(), None);
    }

    #[test]
    fn test_wire_field_names() {
        let writer = WriterOutput {
            overall_response_to_review: "Initial draft generation attempt.".to_string(),
            drafts: vec![DraftCandidate::new("body", "first version")],
        };
        let json = serde_json::to_value(&writer).unwrap();
        assert!(json.get("overallResponseToReview").is_some());
        assert_eq!(json["drafts"][0]["content"], "body");
        assert_eq!(json["drafts"][0]["revisionSummary"], "first version");

        let json = serde_json::to_value(reviewer(&[50], 0)).unwrap();
        assert_eq!(json["draftReviews"][0]["reviewText"], "ok");
        assert_eq!(json["draftReviews"][0]["score"], 50);
        assert_eq!(json["selectedIndex"], 0);
        assert_eq!(json["consolidatedFeedback"], "tighten the intro");
    }
}
