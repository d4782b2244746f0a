use super::{collect_inputs, display_path, input_base, output_path, write_output, CliError};
use crate::config::Config;
use anyhow::{anyhow, Result};
use berry_sanitizer::{SanitizeMode, SanitizeReport, Sanitizer};
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::Path;

#[derive(Debug, Args)]
pub struct SanitizeArgs {
    /// File or directory to sanitize (defaults to the configured source directory)
    pub path: Option<String>,

    /// Sanitizer implementation (tree, fallback); overrides config
    #[arg(short, long)]
    pub mode: Option<String>,

    /// Output to stdout instead of files
    #[arg(long)]
    pub stdout: bool,

    /// Output directory (overrides config)
    #[arg(short, long)]
    pub out_dir: Option<String>,

    /// Only report files that would change; exit with an error if any do
    #[arg(long)]
    pub check: bool,

    /// Print what was removed from each file as JSON
    #[arg(long)]
    pub report: bool,
}

pub fn parse_mode(value: &str) -> Result<SanitizeMode> {
    match value {
        "tree" => Ok(SanitizeMode::Tree),
        "fallback" => Ok(SanitizeMode::Fallback),
        other => Err(anyhow!("Unknown sanitize mode: {}. Use: tree or fallback", other)),
    }
}

pub fn sanitize(args: SanitizeArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let mode = match args.mode.as_deref() {
        Some(mode) => parse_mode(mode)?,
        None => config.editor.sanitize_mode,
    };
    let sanitizer = Sanitizer::with_mode(mode);

    let files = collect_inputs(args.path.as_deref(), &config, cwd)?;
    let base = input_base(args.path.as_deref(), &config, cwd);
    let out_dir = args
        .out_dir
        .as_ref()
        .map(|dir| cwd.join(dir))
        .or_else(|| config.get_out_dir(cwd));

    if !args.stdout {
        println!("{}", "🧹 Sanitizing markup...".bright_blue().bold());
        println!("Found {} files", files.len());
    }

    let mut dirty = 0;
    let mut errors = 0;

    for file in &files {
        let name = display_path(file, cwd);
        let source = match fs::read_to_string(file) {
            Ok(source) => source,
            Err(e) => {
                errors += 1;
                eprintln!("  {} {} - {}", "✗".red(), name, e.to_string().red());
                continue;
            }
        };

        let (clean, report) = sanitizer.sanitize_with_report(&source);
        let changed = clean != source;
        if changed {
            dirty += 1;
        }
        tracing::debug!(file = %name, changed, clean = report.is_clean(), "Sanitized");

        if args.report {
            println!("{}", serde_json::to_string_pretty(&FileReport { file: &name, report: &report })?);
        }

        if args.check {
            if changed {
                println!("  {} {} {}", "!".yellow(), name, summarize(&report).dimmed());
            }
            continue;
        }

        if args.stdout {
            println!("{}", clean);
            continue;
        }

        let target = output_path(file, &base, out_dir.as_deref());
        if !changed && target == *file {
            println!("  {} {} {}", "✓".green(), name, "(clean)".dimmed());
            continue;
        }
        match write_output(&target, &clean) {
            Ok(()) => println!(
                "  {} {} → {} {}",
                "✓".green(),
                name,
                display_path(&target, cwd),
                summarize(&report).dimmed()
            ),
            Err(e) => {
                errors += 1;
                eprintln!("  {} {} - {}", "✗".red(), name, e.to_string().red());
            }
        }
    }

    if args.check && dirty > 0 {
        return Err(CliError::CheckFailed(dirty).into());
    }
    if errors > 0 {
        return Err(anyhow!("{} file(s) could not be processed", errors));
    }
    if !args.stdout {
        println!();
        println!("{} Sanitized {} files, {} changed", "✅".green(), files.len(), dirty);
    }
    Ok(())
}

#[derive(serde::Serialize)]
struct FileReport<'a> {
    file: &'a str,
    #[serde(flatten)]
    report: &'a SanitizeReport,
}

/// One-line summary of what a pass removed
pub fn summarize(report: &SanitizeReport) -> String {
    if report.is_clean() {
        return String::new();
    }
    let mut parts = Vec::new();
    if !report.removed_tags.is_empty() {
        parts.push(format!("tags: {}", report.removed_tags.join(", ")));
    }
    if !report.removed_attributes.is_empty() {
        parts.push(format!("attributes: {}", report.removed_attributes.join(", ")));
    }
    if !report.removed_styles.is_empty() {
        parts.push(format!("styles: {}", report.removed_styles.join(", ")));
    }
    if report.removed_comments > 0 {
        parts.push(format!("comments: {}", report.removed_comments));
    }
    format!("({})", parts.join("; "))
}
