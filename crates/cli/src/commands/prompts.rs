//! Prompt listing command.

use clap::Args;
use tif_core::{config::AppConfig, AppResult};
use tif_prompt::{list_prompts, PromptOrigin};

/// List prompt definitions and where each one is loaded from
#[derive(Args, Debug)]
pub struct PromptsCommand {}

impl PromptsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        for (id, origin) in list_prompts(&config.workspace)? {
            let origin = match origin {
                PromptOrigin::Builtin => "built-in",
                PromptOrigin::Workspace => "workspace",
            };
            println!("{:<16} {}", id, origin);
        }
        Ok(())
    }
}
