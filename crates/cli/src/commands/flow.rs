//! Flow command handler.

use clap::Args;
use ragline_core::{config::AppConfig, AppResult};
use ragline_knowledge::rag::FLOW;
use ragline_prompt::{list_prompts, prompts_dir};

/// Print the pipeline stages and their routing
#[derive(Args, Debug)]
pub struct FlowCommand {
    /// Also list the prompt templates the stages render
    #[arg(long)]
    pub prompts: bool,
}

impl FlowCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let width = FLOW.iter().map(|(stage, _)| stage.len()).max().unwrap_or(0);
        for (stage, routing) in FLOW {
            println!("{:<width$}  {}", stage, routing, width = width);
        }

        if self.prompts {
            let overrides = prompts_dir(&config.workspace);
            println!();
            println!("Prompts (overrides in {}):", overrides.display());
            for id in list_prompts(&config.workspace)? {
                let marker = if overrides.join(format!("{}.yml", id)).exists() {
                    " (workspace)"
                } else {
                    ""
                };
                println!("  {}{}", id, marker);
            }
        }

        Ok(())
    }
}
