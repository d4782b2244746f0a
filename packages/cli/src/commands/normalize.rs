use super::sanitize::parse_mode;
use super::{collect_inputs, display_path, input_base, output_path, write_output, CliError};
use crate::config::Config;
use anyhow::{anyhow, Result};
use berry_document::{parse_sanitized, serialize_html};
use berry_sanitizer::Sanitizer;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::Path;

#[derive(Debug, Args)]
pub struct NormalizeArgs {
    /// File or directory to normalize (defaults to the configured source directory)
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

    /// Only report files that are not in canonical form
    #[arg(long)]
    pub check: bool,
}

/// Sanitize, parse into the document model and serialize back out
pub fn normalize_source(source: &str, sanitizer: &Sanitizer) -> String {
    let clean = sanitizer.sanitize(source);
    serialize_html(&parse_sanitized(&clean))
}

pub fn normalize(args: NormalizeArgs, cwd: &Path) -> Result<()> {
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
        println!("{}", "📐 Normalizing markup...".bright_blue().bold());
    }

    let mut changed_count = 0;
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

        let canonical = normalize_source(&source, &sanitizer);
        let changed = canonical != source;
        if changed {
            changed_count += 1;
        }

        if args.check {
            if changed {
                println!("  {} {}", "!".yellow(), name);
            }
            continue;
        }
        if args.stdout {
            println!("{}", canonical);
            continue;
        }

        let target = output_path(file, &base, out_dir.as_deref());
        if !changed && target == *file {
            println!("  {} {} {}", "✓".green(), name, "(canonical)".dimmed());
            continue;
        }
        match write_output(&target, &canonical) {
            Ok(()) => println!("  {} {} → {}", "✓".green(), name, display_path(&target, cwd)),
            Err(e) => {
                errors += 1;
                eprintln!("  {} {} - {}", "✗".red(), name, e.to_string().red());
            }
        }
    }

    if args.check && changed_count > 0 {
        return Err(CliError::CheckFailed(changed_count).into());
    }
    if errors > 0 {
        return Err(anyhow!("{} file(s) could not be processed", errors));
    }
    if !args.stdout {
        println!();
        println!(
            "{} Normalized {} files, {} changed",
            "✅".green(),
            files.len(),
            changed_count
        );
    }
    Ok(())
}
