use super::{collect_inputs, display_path};
use crate::config::Config;
use anyhow::Result;
use berry_document::{parse_html, BlockNode, EditorDocument};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// File or directory to inspect (defaults to the configured source directory)
    pub path: Option<String>,

    /// Print the full document model as JSON
    #[arg(long, conflicts_with = "text")]
    pub json: bool,

    /// Print the plain text content
    #[arg(long)]
    pub text: bool,
}

/// Counts shown by the default view
#[derive(Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub blocks: usize,
    pub tables: usize,
    pub characters: usize,
    pub images: usize,
    pub files: usize,
    pub pending: usize,
    pub failed: usize,
}

impl DocumentSummary {
    pub fn of(doc: &EditorDocument) -> Self {
        let mut summary = DocumentSummary {
            blocks: doc.blocks.len(),
            characters: doc.plain_text().chars().filter(|c| *c != '\n').count(),
            ..Default::default()
        };
        summary.tables = doc
            .blocks
            .iter()
            .filter(|block| matches!(block, BlockNode::Table(_)))
            .count();
        for attachment in doc.attachments() {
            if attachment.is_image() {
                summary.images += 1;
            } else {
                summary.files += 1;
            }
            if attachment.pending {
                summary.pending += 1;
            }
            if attachment.failed {
                summary.failed += 1;
            }
        }
        summary
    }
}

pub fn inspect(args: InspectArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let files = collect_inputs(args.path.as_deref(), &config, cwd)?;

    for file in &files {
        let name = display_path(file, cwd);
        let source = fs::read_to_string(file)?;
        let doc = parse_html(&source);

        if args.json {
            println!("{}", doc.to_json()?);
            continue;
        }
        if args.text {
            println!("{}", doc.plain_text());
            continue;
        }

        let summary = DocumentSummary::of(&doc);
        println!("{}", name.bright_white().bold());
        println!(
            "  {} blocks, {} tables, {} characters",
            summary.blocks, summary.tables, summary.characters
        );
        if summary.images + summary.files == 0 {
            continue;
        }
        println!("  {} images, {} files", summary.images, summary.files);
        for attachment in doc.attachments() {
            let status = if attachment.failed {
                "failed".red()
            } else if attachment.pending {
                "pending".yellow()
            } else {
                "ready".green()
            };
            let label = if attachment.url.is_empty() {
                attachment.filename.as_str()
            } else {
                attachment.url.as_str()
            };
            println!("    {} [{}] {}", attachment.id.dimmed(), status, label);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let doc = parse_html(
            "<h1>Hi</h1><p>there</p>\
             <figure data-berry-attachment-id=\"a1\"><img src=\"https://cdn.test/a.png\"></figure>\
             <table><tbody><tr><td>x</td></tr></tbody></table>",
        );
        let summary = DocumentSummary::of(&doc);
        assert_eq!(summary.tables, 1);
        assert_eq!(summary.images, 1);
        assert_eq!(summary.files, 0);
        assert_eq!(summary.pending, 0);
        assert_eq!(summary.characters, "Hithere".len() + 1);
    }

    #[test]
    fn test_summary_of_empty_document() {
        let summary = DocumentSummary::of(&EditorDocument::empty());
        assert_eq!(summary.blocks, 1);
        assert_eq!(summary.characters, 0);
    }
}
