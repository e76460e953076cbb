//! Token accounting
//!
//! Running input/output token totals for a run. Display only; nothing in the
//! loop makes decisions from these numbers.

use serde::Serialize;
use tracing::debug;

use crate::domain::RoleTokens;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenAccountant {
    input_tokens: u64,
    output_tokens: u64,
}

impl TokenAccountant {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one successful call's usage
    pub fn record(&mut self, tokens: &RoleTokens) {
        self.input_tokens = self.input_tokens.saturating_add(tokens.input);
        self.output_tokens = self.output_tokens.saturating_add(tokens.output);
        debug!(
            input = tokens.input,
            output = tokens.output,
            total_input = self.input_tokens,
            total_output = self.output_tokens,
            "TokenAccountant::record"
        );
    }

    pub fn reset(&mut self) {
        debug!("TokenAccountant::reset: called");
        *self = Self::default();
    }

    pub fn input_tokens(&self) -> u64 {
        self.input_tokens
    }

    pub fn output_tokens(&self) -> u64 {
        self.output_tokens
    }

    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}
