//! Prompt Loader
//!
//! Loads prompt templates from an override directory or falls back to the
//! embedded defaults, and renders them with handlebars.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::{debug, info};

use super::embedded;
use crate::error::Role;

/// Context for the writer instruction templates
#[derive(Debug, Clone, Serialize)]
pub struct WriterPromptContext {
    /// The writer brief
    pub brief: String,
    /// Drafts to produce this round
    pub draft_count: u8,
    /// Excerpt of the previously selected draft (revision rounds only)
    pub excerpt: Option<String>,
    /// Feedback to apply (revision rounds only)
    pub feedback: Option<String>,
    pub is_first_round: bool,
}

impl WriterPromptContext {
    /// Context for the first round of a run
    pub fn initial(brief: impl Into<String>, draft_count: u8) -> Self {
        debug!(draft_count, "WriterPromptContext::initial: called");
        Self {
            brief: brief.into(),
            draft_count,
            excerpt: None,
            feedback: None,
            is_first_round: true,
        }
    }

    /// Context for a revision round
    pub fn revision(
        brief: impl Into<String>,
        draft_count: u8,
        excerpt: impl Into<String>,
        feedback: impl Into<String>,
    ) -> Self {
        debug!(draft_count, "WriterPromptContext::revision: called");
        Self {
            brief: brief.into(),
            draft_count,
            excerpt: Some(excerpt.into()),
            feedback: Some(feedback.into()),
            is_first_round: false,
        }
    }

    fn template_name(&self) -> &'static str {
        if self.is_first_round { "writer-initial" } else { "writer-revision" }
    }
}

/// One draft as shown to the reviewer
#[derive(Debug, Clone, Serialize)]
pub struct NumberedDraft {
    /// 1-based draft number
    pub number: usize,
    pub content: String,
}

/// Context for the reviewer instruction template
#[derive(Debug, Clone, Serialize)]
pub struct ReviewerPromptContext {
    pub criteria: String,
    pub draft_count: usize,
    pub drafts: Vec<NumberedDraft>,
    /// All drafts, each wrapped in numbered delimiters, separated by blank lines
    pub drafts_block: String,
}

impl ReviewerPromptContext {
    pub fn new<'a>(criteria: impl Into<String>, drafts: impl IntoIterator<Item = &'a str>) -> Self {
        let drafts: Vec<NumberedDraft> = drafts
            .into_iter()
            .enumerate()
            .map(|(i, content)| NumberedDraft {
                number: i + 1,
                content: content.to_string(),
            })
            .collect();
        debug!(draft_count = drafts.len(), "ReviewerPromptContext::new: called");

        let drafts_block = drafts
            .iter()
            .map(|d| format!("--- Draft {n} ---\n{}\n--- END Draft {n} ---", d.content, n = d.number))
            .collect::<Vec<_>>()
            .join("\n\n");

        Self {
            criteria: criteria.into(),
            draft_count: drafts.len(),
            drafts,
            drafts_block,
        }
    }
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars template engine
    hbs: Handlebars<'static>,
    /// User override directory (`prompts.dir` in the config)
    user_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a loader that checks `user_dir` before the embedded templates
    pub fn new(user_dir: Option<&Path>) -> Self {
        debug!(?user_dir, "PromptLoader::new: called");
        let user_dir = user_dir.and_then(|dir| {
            if dir.is_dir() {
                debug!("PromptLoader::new: user override directory found");
                Some(dir.to_path_buf())
            } else {
                info!("Prompt directory {} not found, using embedded prompts", dir.display());
                None
            }
        });

        Self {
            hbs: Self::engine(),
            user_dir,
        }
    }

    /// Create a loader that only uses embedded prompts
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self {
            hbs: Self::engine(),
            user_dir: None,
        }
    }

    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        // Prompts are plain text; HTML escaping would mangle drafts and feedback
        hbs.register_escape_fn(handlebars::no_escape);
        hbs
    }

    /// Load a template by name
    ///
    /// Checks the user override `{dir}/{name}.pmt` first, then the embedded copy.
    pub fn load_template(&self, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");
        if let Some(ref user_dir) = self.user_dir {
            let path = user_dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found in user override");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read user prompt {}: {}", path.display(), e));
            }
            debug!(?path, "PromptLoader::load_template: not found in user override");
        }

        if let Some(content) = embedded::get_embedded(name) {
            debug!(%name, "PromptLoader::load_template: found in embedded");
            return Ok(content.to_string());
        }

        debug!(%name, "PromptLoader::load_template: not found anywhere");
        Err(eyre!("Prompt template not found: {}", name))
    }

    /// Render a template with the given context
    pub fn render<T: Serialize>(&self, template_name: &str, context: &T) -> Result<String> {
        debug!(%template_name, "PromptLoader::render: called");
        let template = self.load_template(template_name)?;
        let rendered = self
            .hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))?;
        Ok(rendered.trim_end().to_string())
    }

    /// System instruction for a role
    pub fn system_prompt(&self, role: Role) -> Result<String> {
        debug!(%role, "PromptLoader::system_prompt: called");
        let name = match role {
            Role::Writer => "writer-system",
            Role::Reviewer => "reviewer-system",
        };
        Ok(self.load_template(name)?.trim_end().to_string())
    }

    /// Writer instruction for one round
    pub fn writer_instruction(&self, context: &WriterPromptContext) -> Result<String> {
        self.render(context.template_name(), context)
    }

    /// Reviewer instruction for one round
    pub fn reviewer_instruction(&self, context: &ReviewerPromptContext) -> Result<String> {
        self.render("reviewer", context)
    }

    /// Check that every template loads and parses, before a run makes any call
    pub fn preflight(&self) -> Result<()> {
        debug!("PromptLoader::preflight: called");
        for name in embedded::TEMPLATE_NAMES {
            let template = self.load_template(name)?;
            handlebars::Template::compile(&template).map_err(|e| eyre!("Template {} does not parse: {}", name, e))?;
        }
        Ok(())
    }
}
