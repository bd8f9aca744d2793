mod commands;
mod logging;
mod progress;
mod prompt;

use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, OrganizeArgs};
use dotenv::dotenv;
use mediamovarr_core::config::{self, AppConfig};
use mediamovarr_core::decision::NeverConfirm;
use mediamovarr_core::engine::Resolver;
use mediamovarr_core::metadata::{MetadataResolver, TmdbClient};
use mediamovarr_core::rules;
use mediamovarr_core::scanner;
use mediamovarr_core::{
    Confirmer, Decision, FolderCandidate, OrganizeEngine, RunOptions, RunReport,
};
use progress::CliReporter;
use prompt::StdinConfirmer;
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let args = Cli::parse();

    let mut config = match config::load_configuration(args.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    match args.command {
        Some(Commands::Organize(organize)) => {
            apply_overrides(&mut config, &organize);
            if let Err(err) = config.validate() {
                error!("{}", err);
                process::exit(1);
            }
            if let Err(err) = run_organize(config, &organize) {
                error!("Error: {:#}", err);
                process::exit(1);
            }
        }
        Some(Commands::Classify { dir, verbose }) => {
            if let Err(err) = config.thresholds.validate() {
                error!("{}", err);
                process::exit(1);
            }
            if let Err(err) = run_classify(config, &dir, verbose) {
                error!("Error: {:#}", err);
                process::exit(1);
            }
        }
        Some(Commands::CheckRules) => run_check_rules(&config),
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:#?}", config);
        }
        None => {
            let _ = Cli::command().print_long_help();
        }
    }

    Ok(())
}

fn apply_overrides(config: &mut AppConfig, args: &OrganizeArgs) {
    if !args.sources.is_empty() {
        config.source_dirs = args.sources.clone();
    }
    if let Some(dest) = &args.dest {
        config.dest_dir = dest.clone();
    }
    if args.no_metadata {
        config.metadata.enabled = false;
    }
}

fn build_resolver(config: &AppConfig) -> anyhow::Result<Option<Resolver>> {
    if !config.metadata.enabled {
        return Ok(None);
    }
    let client = TmdbClient::new(&config.metadata).context("creating metadata client")?;
    Ok(Some(MetadataResolver::new(
        Box::new(client),
        Duration::from_millis(config.metadata.min_interval_ms),
    )))
}

fn build_engine(config: AppConfig) -> anyhow::Result<OrganizeEngine> {
    let compiled = rules::rules_from_config(config.rules.as_deref());
    if !compiled.errors.is_empty() {
        info!(
            "{} malformed rules ignored, run check-rules for details",
            compiled.errors.len()
        );
    }
    let resolver = build_resolver(&config)?;
    Ok(OrganizeEngine::new(config, compiled.rules, resolver))
}

fn run_organize(config: AppConfig, args: &OrganizeArgs) -> anyhow::Result<()> {
    let roots = config::non_overlapping_directories(config.source_dirs.clone());
    info!("Processing directories: {:?}", roots);

    let library = PathBuf::from(&config.dest_dir);
    let candidates = scanner::discover(&roots, &config.ignore_patterns, config.max_depth, &[library])
        .context("discovering candidate folders")?;
    if candidates.is_empty() {
        println!("No folders to organize.");
        return Ok(());
    }

    let options = RunOptions {
        dry_run: args.dry_run,
        force: args.force,
        interactive: !args.yes && io::stdin().is_terminal(),
    };

    let mut engine = build_engine(config)?;
    let reporter = CliReporter::new();
    let mut stdin_confirmer = StdinConfirmer::new(&reporter);
    let mut never = NeverConfirm;
    let confirmer: &mut dyn Confirmer = if options.interactive {
        &mut stdin_confirmer
    } else {
        &mut never
    };

    let report = engine.run(&candidates, &options, confirmer, &reporter);

    print_report(&report, args.verbose);

    if let Some(path) = &args.report_csv {
        report
            .write_csv(path)
            .with_context(|| format!("writing report to {}", path.display()))?;
    }

    Ok(())
}

fn print_report(report: &RunReport, verbose: bool) {
    println!();
    for c in &report.candidates {
        let decision = match c.decision {
            Decision::AutoProcess | Decision::Confirmed => c.decision.to_string().green(),
            Decision::Skip(_) => c.decision.to_string().yellow(),
            Decision::Abort => c.decision.to_string().red(),
        };
        println!(
            "{} [{} {:.2}] {}",
            c.path.display(),
            c.media_type.to_string().cyan(),
            c.confidence,
            decision
        );
        if verbose {
            for t in &c.trace {
                println!("    {:+.2}  {}  {}", t.delta, t.source, t.reason.dimmed());
            }
        }
        for m in &c.moves {
            println!("    {} -> {} ({})", m.plan.source_path.display(), m.plan.destination_path.display(), m.outcome);
        }
        if c.fallback {
            println!("    {}", "naming used fallbacks".yellow());
        }
        if let Some(failure) = &c.failure {
            println!("    {}", failure.red());
        }
    }

    let s = report.summary;
    println!();
    info!(
        "{} processed, {} moved ({} files), {} would move, {} confirmed, {} skipped, {} failed",
        format!("{}", s.processed).cyan(),
        format!("{}", s.moved).green(),
        s.files_moved,
        format!("{}", s.would_move).green(),
        s.confirmed,
        format!("{}", s.skipped).yellow(),
        format!("{}", s.failed).red(),
    );
    if s.aborted_remaining > 0 {
        info!("Aborted, {} folders left untouched", format!("{}", s.aborted_remaining).red());
    }
    if let Some(stats) = report.metadata {
        info!(
            "Metadata: {} lookups, {} cache hits, {} external calls, {} failures",
            stats.lookups, stats.cache_hits, stats.external_calls, stats.failures
        );
    }
}

fn run_classify(config: AppConfig, dir: &Path, verbose: bool) -> anyhow::Result<()> {
    let thresholds = config.thresholds;
    let max_depth = config.max_depth;
    let mut engine = build_engine(config)?;
    let candidate = FolderCandidate::from_path(dir, max_depth)
        .with_context(|| format!("reading {}", dir.display()))?;
    let assessment = engine.assess(&candidate);
    let result = &assessment.result;

    println!(
        "{} [{} {:.2}] {:?}",
        candidate.folder_name().bold(),
        result.media_type.to_string().cyan(),
        result.confidence(),
        thresholds.band(result.confidence())
    );
    for t in result.trace() {
        println!("    {:+.2}  {}  {}", t.delta, t.source, t.reason.dimmed());
    }
    match &assessment.metadata {
        Some(m) if m.matched => println!(
            "    metadata: {} ({})",
            m.canonical_title.as_deref().unwrap_or("?"),
            m.year.map(|y| y.to_string()).unwrap_or_else(|| "-".to_string())
        ),
        Some(_) => println!("    metadata: no match"),
        None => {}
    }
    match &assessment.naming {
        Some(naming) => println!(
            "    naming: {:?}{}",
            naming.naming,
            if naming.fallback { " (fallback)" } else { "" }
        ),
        None => println!("    naming: {}", "no destination template".yellow()),
    }
    if verbose {
        println!("{:#?}", assessment.features);
    }
    Ok(())
}

fn run_check_rules(config: &AppConfig) {
    let source = if config.rules.is_some() { "configured" } else { "built-in" };
    let compiled = rules::rules_from_config(config.rules.as_deref());
    println!("{} {} rules compiled", compiled.rules.len(), source);
    for rule in &compiled.rules {
        println!(
            "  {} {} {:+.2}  {}",
            "✓".green(),
            rule.name,
            rule.adjustment,
            rule.condition.name().dimmed()
        );
    }
    for err in &compiled.errors {
        println!("  {} {}", "✗".red(), err);
    }
}
