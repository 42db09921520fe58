use clap::ValueEnum;
use colored::Colorize;
use serde_json::json;

use crate::error::Result;
use crate::git::PoolCommit;
use crate::model::{Response, Version};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Pretty,
    Minimal,
}

/// Print the version + metadata pair produced by `in` and `out`.
pub fn print_response(response: &Response, format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(response)?),
        Format::Pretty => {
            println!("{} {}", "version:".bold(), response.version.reference);
            for pair in &response.metadata {
                println!("  {}: {}", pair.name, pair.value.cyan());
            }
        }
        Format::Minimal => println!("{}", response.version.reference),
    }
    Ok(())
}

/// Print the versions found by `check`, oldest first.
pub fn print_versions(commits: &[PoolCommit], format: Format) -> Result<()> {
    match format {
        Format::Json => {
            let versions: Vec<Version> = commits
                .iter()
                .map(|c| Version {
                    reference: c.revision.clone(),
                })
                .collect();
            println!("{}", serde_json::to_string(&versions)?);
        }
        Format::Pretty => {
            for commit in commits {
                println!(
                    "{} {} {}",
                    short(commit.revision.as_str()).yellow(),
                    commit.summary,
                    commit.committed_at.to_rfc3339().dimmed()
                );
            }
        }
        Format::Minimal => {
            for commit in commits {
                println!("{}", commit.revision);
            }
        }
    }
    Ok(())
}

/// Render an error for stderr in the selected format.
pub fn error_message(code: &str, message: &str, format: Format) -> String {
    match format {
        Format::Json => json!({ "error": code, "message": message }).to_string(),
        _ => format!("error: {message}"),
    }
}

fn short(revision: &str) -> &str {
    revision.get(..7).unwrap_or(revision)
}
