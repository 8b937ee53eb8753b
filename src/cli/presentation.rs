//! Presentation: text and JSON formatters for command results.

use owo_colors::OwoColorize;
use serde_json::json;
use std::path::Path;

use crate::error::ReziError;
use crate::exporter::ShareOutcome;

pub fn format_credits(balance: u32, cost: u32, format: &str) -> Result<String, ReziError> {
    match format {
        "json" => {
            let out = json!({
                "credits": balance,
                "generation_cost": cost,
                "generations_left": balance / cost.max(1),
            });
            serde_json::to_string_pretty(&out)
                .map_err(|e| ReziError::Config(format!("Failed to render JSON: {}", e)))
        }
        "text" => Ok(format!(
            "{} Credits\nGenerate Image ({} Credits)",
            balance.bold(),
            cost
        )),
        other => Err(ReziError::Config(format!(
            "Invalid output format: {} (must be 'text' or 'json')",
            other
        ))),
    }
}

pub fn format_facts(facts: &[String]) -> String {
    facts
        .iter()
        .enumerate()
        .map(|(i, fact)| format!("  {}. {}", i + 1, fact))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_generation_summary(saved_to: &Path, saved: bool, credits: u32) -> String {
    let save_line = if saved {
        format!("Saved: {}", saved_to.display())
    } else {
        format!("{} {}", "Could not save to".red(), saved_to.display())
    };
    format!(
        "{}\n  {}\n  Credits remaining: {}",
        "Your Memory, Reimagined".bold(),
        save_line,
        credits
    )
}

pub fn format_share_outcome(outcome: ShareOutcome) -> Option<String> {
    match outcome {
        ShareOutcome::Shared => Some("Shared.".to_string()),
        ShareOutcome::Copied => Some(format!("{}", "Copied!".green())),
        ShareOutcome::Cancelled => None,
    }
}
