//! Interactive question session.

use clap::Args;
use std::io::Write;
use tif_core::{config::AppConfig, AppResult};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Interactive question session
#[derive(Args, Debug)]
pub struct ChatCommand {}

/// What to do with one line read from the session input.
#[derive(Debug, PartialEq, Eq)]
pub enum SessionLine<'a> {
    Exit,
    Skip,
    Question(&'a str),
}

impl<'a> SessionLine<'a> {
    pub fn classify(line: &'a str) -> Self {
        let trimmed = line.trim();
        if trimmed.eq_ignore_ascii_case("exit") {
            SessionLine::Exit
        } else if trimmed.is_empty() {
            SessionLine::Skip
        } else {
            SessionLine::Question(trimmed)
        }
    }
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Starting chat session");

        let mut agent = super::build_agent(config)?;

        eprintln!("Ask a question (e.g., 'How much did Kinzie spend in 2023?')");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut answered = 0usize;

        loop {
            eprint!("\nQuestion (or type 'exit'): ");
            std::io::stderr().flush().ok();

            let Some(line) = lines.next_line().await? else {
                break;
            };

            match SessionLine::classify(&line) {
                SessionLine::Exit => break,
                SessionLine::Skip => continue,
                SessionLine::Question(question) => {
                    let answer = agent.process_query(question).await;
                    println!("{}", answer);
                    answered += 1;
                }
            }
        }

        tracing::info!(
            questions = answered,
            turns = agent.conversation().len(),
            "Chat session ended"
        );
        Ok(())
    }
}
