use std::io::{Read, Write};
use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use serde_json::json;
use tracing::debug;

use xgroup_sdk::{RegroupConfig, RegroupOutput, Regrouper};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Tags(args) => cmd_tags(args, cli.format),
        Command::Fields(args) => cmd_fields(args, cli.format),
        Command::Children(args) => cmd_children(args, cli.format),
        Command::Merge(args) => cmd_merge(args, cli.format),
        Command::Prune(args) => cmd_prune(args, cli.format),
    }
}

fn cmd_tags(args: TagsArgs, format: OutputFormat) -> anyhow::Result<()> {
    let input = read_input(&args.input)?;

    if args.sites {
        let sites = Regrouper::repeat_sites(&input).context("failed to analyze input")?;
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&sites)?),
            OutputFormat::Text if sites.is_empty() => println!("No repeating tags."),
            OutputFormat::Text => {
                for site in &sites {
                    println!(
                        "  {} x{} under <{}> {}",
                        site.tag.yellow().bold(),
                        site.count,
                        site.parent_tag,
                        format!("#{}", site.parent).dimmed()
                    );
                }
            }
        }
        return Ok(());
    }

    let tags = Regrouper::candidate_tags(&input).context("failed to analyze input")?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&tags)?),
        OutputFormat::Text if tags.is_empty() => println!("No repeating tags."),
        OutputFormat::Text => {
            for tag in &tags {
                println!("  {}", tag.yellow());
            }
        }
    }
    Ok(())
}

fn cmd_fields(args: FieldsArgs, format: OutputFormat) -> anyhow::Result<()> {
    let input = read_input(&args.input)?;

    if args.keys_only {
        let keys = Regrouper::key_candidates(&input, &args.tag).context("failed to analyze input")?;
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&keys)?),
            OutputFormat::Text if keys.is_empty() => println!("No key fields under <{}>.", args.tag),
            OutputFormat::Text => {
                for key in &keys {
                    println!("  {} = {}", key.field.cyan(), key.sample);
                }
            }
        }
        return Ok(());
    }

    let fields = Regrouper::key_fields(&input, &args.tag).context("failed to analyze input")?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&fields)?),
        OutputFormat::Text if fields.is_empty() => println!("No fields under <{}>.", args.tag),
        OutputFormat::Text => {
            for field in &fields {
                println!("  {}", field.cyan());
            }
        }
    }
    Ok(())
}

fn cmd_children(args: ChildrenArgs, format: OutputFormat) -> anyhow::Result<()> {
    let input = read_input(&args.input)?;
    let tags = Regrouper::child_tags(&input, &args.tag).context("failed to analyze input")?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&tags)?),
        OutputFormat::Text if tags.is_empty() => println!("No children under <{}>.", args.tag),
        OutputFormat::Text => {
            for tag in &tags {
                println!("  {}", tag.cyan());
            }
        }
    }
    Ok(())
}

fn cmd_merge(args: MergeArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = merge_config(&args)?;
    debug!(tag = ?config.tag, policy = %config.effective_policy(), "resolved merge settings");
    let regrouper = Regrouper::new(config).context("invalid merge settings")?;
    let input = read_input(&args.input)?;
    let output = regrouper.run(&input).context("merge failed")?;

    write_output(args.output.as_deref(), &output.xml)?;
    print_summary(&output, format)
}

fn cmd_prune(args: PruneArgs, format: OutputFormat) -> anyhow::Result<()> {
    let mut config = RegroupConfig::default();
    config.output.pretty = !args.compact;
    let regrouper = Regrouper::new(config)?;
    let input = read_input(&args.input)?;
    let output = regrouper.prune(&input).context("prune failed")?;

    write_output(args.output.as_deref(), &output.xml)?;
    print_summary(&output, format)
}

/// Settings from `--config` or `--preset`, with explicit flags on top.
fn merge_config(args: &MergeArgs) -> anyhow::Result<RegroupConfig> {
    let mut config = match (&args.config, args.preset) {
        (Some(path), _) => RegroupConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        (None, Some(PresetArg::EmployeeImport)) => RegroupConfig::employee_import(),
        (None, None) => RegroupConfig::default(),
    };

    if let Some(tag) = &args.tag {
        config.tag = Some(tag.clone());
    }
    if let Some(key) = &args.key {
        config.key_field = Some(key.clone());
    }
    if !args.allow.is_empty() {
        config.allowed_child_tags = Some(args.allow.clone());
    }
    if let Some(policy) = args.policy {
        config.policy = Some(policy.into());
    }
    if let Some(key_match) = args.key_match {
        config.key_match = key_match.into();
    }
    if args.prune {
        config.prune_empty = true;
    }
    if args.compact {
        config.output.pretty = false;
    }
    if args.no_declaration {
        config.output.declaration = false;
    }
    Ok(config)
}

fn print_summary(output: &RegroupOutput, format: OutputFormat) -> anyhow::Result<()> {
    let report = &output.report;
    match format {
        OutputFormat::Json => {
            let summary = json!({ "report": report, "pruned": output.pruned });
            eprintln!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Text if report.is_noop() && output.pruned == 0 => {
            eprintln!("{} Nothing to merge.", "✓".green());
        }
        OutputFormat::Text if report.is_noop() => {
            eprintln!("{} Pruned {} empty element(s)", "✓".green().bold(), output.pruned);
        }
        OutputFormat::Text => {
            eprintln!(
                "{} Merged {} group(s), removed {} element(s)",
                "✓".green().bold(),
                report.groups_merged,
                report.donors_removed
            );
            if !report.tags.is_empty() {
                let tags: Vec<&str> = report.tags.iter().map(String::as_str).collect();
                eprintln!("  Tags: {}", tags.join(", ").yellow());
            }
            eprintln!(
                "  Children: {} moved, {} dropped",
                report.children_migrated, report.children_dropped
            );
            if report.singletons > 0 {
                eprintln!("  Unkeyed: {}", report.singletons.to_string().dimmed());
            }
            if output.pruned > 0 {
                eprintln!("  Pruned: {}", output.pruned);
            }
        }
    }
    Ok(())
}

/// `-` reads stdin.
fn read_input(source: &str) -> anyhow::Result<Vec<u8>> {
    if source == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read(source).with_context(|| format!("failed to read {source}"))
}

fn write_output(target: Option<&Path>, xml: &[u8]) -> anyhow::Result<()> {
    let mut bytes = xml.to_vec();
    bytes.push(b'\n');
    match target {
        Some(path) => std::fs::write(path, &bytes)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.flush()?;
            Ok(())
        }
    }
}
