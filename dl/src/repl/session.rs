//! Interactive pause session
//!
//! When a run pauses (or fails), the operator can read and edit the
//! consolidated feedback, force more rounds, restart or reset.

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;

use crate::domain::{RunConfiguration, RunState};
use crate::error::{ErrorKind, RunError};
use crate::events::RunEvent;
use crate::r#loop::{BatchOutcome, RunController};

/// Line that ends multi-line feedback entry
const END_OF_EDIT: &str = ".";

/// Operator command parsed from one input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Show,
    Edit,
    Continue(u32),
    Restart,
    Reset,
    History,
    Draft,
    Tokens,
    Help,
    Quit,
    Unknown(String),
}

impl SessionCommand {
    pub fn parse(input: &str) -> Self {
        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("").to_lowercase();
        match cmd.as_str() {
            "show" | "s" => Self::Show,
            "edit" | "e" => Self::Edit,
            "continue" | "c" => match parts.next() {
                None => Self::Continue(1),
                Some(n) => n.parse().map(Self::Continue).unwrap_or_else(|_| Self::Unknown(input.to_string())),
            },
            "restart" => Self::Restart,
            "reset" => Self::Reset,
            "history" | "h" => Self::History,
            "draft" | "d" => Self::Draft,
            "tokens" | "t" => Self::Tokens,
            "help" | "?" => Self::Help,
            "quit" | "q" | "exit" => Self::Quit,
            _ => Self::Unknown(input.to_string()),
        }
    }
}

/// Interactive loop over a paused or failed run
pub struct PauseSession<'a> {
    controller: &'a mut RunController,
    base_config: RunConfiguration,
    feedback: String,
}

impl<'a> PauseSession<'a> {
    pub fn new(controller: &'a mut RunController, base_config: RunConfiguration) -> Self {
        let feedback = controller.pending_feedback().unwrap_or_default().to_string();
        Self {
            controller,
            base_config,
            feedback,
        }
    }

    /// Run until the operator quits
    pub async fn run(&mut self) -> Result<()> {
        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;
        self.print_hint();

        loop {
            let prompt = format!("{} ", format!("[{}]>", self.controller.state()).bright_green());
            match rl.readline(&prompt) {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(input);

                    let command = SessionCommand::parse(input);
                    debug!(?command, "PauseSession::run: command");
                    if command == SessionCommand::Quit {
                        break;
                    }
                    self.handle(command, &mut rl).await?;
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(err) => return Err(eyre::eyre!("Readline error: {}", err)),
            }
        }
        Ok(())
    }

    async fn handle(&mut self, command: SessionCommand, rl: &mut DefaultEditor) -> Result<()> {
        match command {
            SessionCommand::Show => {
                if self.feedback.is_empty() {
                    println!("{}", "No feedback yet.".dimmed());
                } else {
                    println!("{}", "Feedback for the next round:".bright_cyan());
                    println!("{}", self.feedback);
                }
            }
            SessionCommand::Edit => {
                if self.controller.state() != RunState::Paused {
                    println!("{} Feedback can only be edited while the run is paused", "!".yellow());
                    return Ok(());
                }
                if let Some(text) = read_multiline(rl)? {
                    self.feedback = text;
                    println!("{}", "Feedback updated.".dimmed());
                }
            }
            SessionCommand::Continue(rounds) => {
                let result = self.controller.continue_manually(rounds, &self.feedback).await;
                self.after_batch(result);
            }
            SessionCommand::Restart => {
                let result = self.controller.start(self.base_config.clone()).await;
                self.after_batch(result);
            }
            SessionCommand::Reset => {
                self.controller.reset();
                self.feedback.clear();
                println!("{}", "Run reset. Use 'restart' to start over or 'quit' to exit.".dimmed());
            }
            SessionCommand::History => print_history(self.controller),
            SessionCommand::Draft => match self.controller.final_selected_draft() {
                Some(draft) => {
                    println!("{}", "Selected draft:".bright_cyan());
                    println!("{}", draft);
                }
                None => println!("{}", "No selected draft.".dimmed()),
            },
            SessionCommand::Tokens => print_tokens(self.controller),
            SessionCommand::Help => print_help(),
            SessionCommand::Quit => {}
            SessionCommand::Unknown(input) => {
                println!("{} Unknown command: {}", "?".yellow(), input);
                println!("Type {} for available commands", "help".yellow());
            }
        }
        Ok(())
    }

    fn after_batch(&mut self, result: Result<BatchOutcome, RunError>) {
        print_batch_result(self.controller, &result);
        if let Some(feedback) = self.controller.pending_feedback() {
            self.feedback = feedback.to_string();
        }
        self.print_hint();
    }

    fn print_hint(&self) {
        let hint = match self.controller.state() {
            RunState::Paused => "show, edit, continue [N], restart, reset, quit",
            RunState::Failed => "restart, reset, history, quit",
            RunState::Idle => "restart, quit",
            RunState::Running => "",
        };
        if !hint.is_empty() {
            println!("{} {}", "Commands:".dimmed(), hint.yellow());
        }
    }
}

/// Read lines until a line holding only ".", `None` if entry was aborted
fn read_multiline(rl: &mut DefaultEditor) -> Result<Option<String>> {
    println!(
        "{}",
        format!("Enter feedback; finish with a line containing only '{}'", END_OF_EDIT).dimmed()
    );
    let mut lines = Vec::new();
    loop {
        match rl.readline("| ") {
            Ok(line) if line.trim() == END_OF_EDIT => break,
            Ok(line) => lines.push(line),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("{}", "Edit cancelled.".dimmed());
                return Ok(None);
            }
            Err(err) => return Err(eyre::eyre!("Readline error: {}", err)),
        }
    }
    Ok(Some(lines.join("\n")))
}

fn print_help() {
    println!();
    println!("{}", "Available Commands:".bright_cyan());
    println!("  {:14} Show the feedback for the next round", "show".yellow());
    println!("  {:14} Edit the feedback (end with a '.' line)", "edit".yellow());
    println!("  {:14} Run N more rounds with the current feedback", "continue [N]".yellow());
    println!("  {:14} Start the run over from round 1", "restart".yellow());
    println!("  {:14} Discard the run", "reset".yellow());
    println!("  {:14} List completed rounds", "history".yellow());
    println!("  {:14} Show the selected draft", "draft".yellow());
    println!("  {:14} Show token totals", "tokens".yellow());
    println!("  {:14} Exit", "quit".yellow());
    println!();
}

/// One status line per progress event
pub fn print_event(event: &RunEvent) {
    match event {
        RunEvent::RunStarted {
            model,
            draft_count,
            max_iterations,
            ..
        } => println!(
            "{} model {} ({} drafts, up to {} rounds)",
            "Starting run:".bright_cyan(),
            model,
            draft_count,
            max_iterations
        ),
        RunEvent::BatchStarted {
            start_round,
            count,
            manual: true,
            ..
        } => println!(
            "{} {} rounds from round {}",
            "Manual continuation:".bright_cyan(),
            count,
            start_round
        ),
        RunEvent::WriterStarted { round, draft_count, .. } => {
            println!("Round {}: writer generating {} drafts...", round, draft_count)
        }
        RunEvent::ReviewerStarted { round, .. } => println!("Round {}: reviewer reviewing...", round),
        RunEvent::RoundRecorded { round, score, .. } => {
            println!("Round {}: selected draft scored {}", round, score.to_string().bold())
        }
        _ => {}
    }
}

/// Summary after a batch ends
pub fn print_batch_result(controller: &RunController, result: &Result<BatchOutcome, RunError>) {
    match result {
        Ok(outcome) => {
            println!(
                "{} {} after round {}",
                "Paused:".bright_green(),
                outcome.reason,
                outcome.last_round.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string())
            );
            print_tokens(controller);
        }
        Err(err) if matches!(err.kind(), ErrorKind::ConfigurationInvalid | ErrorKind::InvalidState) => {
            println!("{} {}", "!".yellow(), err.user_message());
        }
        Err(err) => {
            println!("{} {}", "Failed:".bright_red(), err.user_message());
            if let RunError::ResponseMalformed { raw, .. } = err {
                let preview: String = raw.chars().take(500).collect();
                println!("{}", "Raw response:".dimmed());
                println!("{}", preview.dimmed());
            }
        }
    }
}

pub fn print_tokens(controller: &RunController) {
    let tokens = controller.tokens();
    println!(
        "{} {} input, {} output",
        "Tokens:".dimmed(),
        tokens.input_tokens(),
        tokens.output_tokens()
    );
}

pub fn print_history(controller: &RunController) {
    let history = controller.history();
    if history.is_empty() {
        println!("{}", "No completed rounds.".dimmed());
        return;
    }

    println!();
    println!("{}", "Rounds:".bright_cyan());
    for record in history.iter() {
        let score = record
            .selected_score()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        let selected = record
            .reviewer_output
            .as_ref()
            .map(|r| (r.selected_index + 1).to_string())
            .unwrap_or_else(|| "-".to_string());
        let tokens = record.total_tokens();
        println!(
            "  {:>3}  {}  draft {} scored {:>3}  ({} in / {} out)",
            record.id,
            record.created_at.format("%H:%M:%S"),
            selected,
            score,
            tokens.input,
            tokens.output
        );
    }
    println!();
}
