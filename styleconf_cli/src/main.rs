use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use styleconf_diff::{
    ChangedLine, EditSession, ImportOptions, MergeCandidate, MergeOptions, Side, apply_preference,
    choose, format_changed_lines_report, format_diff_rows, format_merge_report,
};
use styleconf_ir::{ItemSignature, parse_checked};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "style-conf")]
#[command(about = "Compare, review and merge style.conf files")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compare a live file against an old revision, line by line.
    Diff {
        new: PathBuf,
        old: PathBuf,

        #[arg(long)]
        json: bool,
    },
    /// List lines of `current` that differ from `baseline`.
    Changes {
        baseline: PathBuf,
        current: PathBuf,

        #[arg(long)]
        json: bool,
    },
    /// Merge item values from an old revision into a new file.
    Merge {
        new: PathBuf,
        old: PathBuf,

        #[arg(long, value_enum, default_value_t = CliSide::New)]
        prefer: CliSide,

        #[arg(long)]
        use_other_when_missing: bool,

        /// Take the old value for `section::key`, overriding `--prefer`.
        #[arg(long, value_name = "SIGNATURE")]
        take_old: Vec<String>,

        /// Take the new value for `section::key`, overriding `--prefer`.
        #[arg(long, value_name = "SIGNATURE")]
        take_new: Vec<String>,

        #[arg(long)]
        output: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },
    /// Validate that a file parses into at least one section.
    Check { file: PathBuf },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliSide {
    New,
    Old,
}

impl From<CliSide> for Side {
    fn from(side: CliSide) -> Self {
        match side {
            CliSide::New => Side::New,
            CliSide::Old => Side::Old,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChangesOutput {
    changed_lines: Vec<ChangedLine>,
    descriptions: BTreeMap<usize, String>,
}

#[derive(Debug, Serialize)]
struct MergeOutput {
    candidates: Vec<MergeCandidate>,
    used_structural_rewrite: bool,
    text: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;

    let cli = Cli::parse();
    match cli.command {
        Command::Diff { new, old, json } => run_diff(&new, &old, json),
        Command::Changes {
            baseline,
            current,
            json,
        } => run_changes(&baseline, &current, json),
        Command::Merge {
            new,
            old,
            prefer,
            use_other_when_missing,
            take_old,
            take_new,
            output,
            json,
        } => {
            let options =
                MergeOptions::new(prefer.into()).with_use_other_when_missing(use_other_when_missing);
            let overrides = take_old
                .iter()
                .map(|s| (s.as_str(), Side::Old))
                .chain(take_new.iter().map(|s| (s.as_str(), Side::New)))
                .collect::<Vec<_>>();
            run_merge(&new, &old, &options, &overrides, output.as_deref(), json)
        }
        Command::Check { file } => run_check(&file),
    }
}

fn run_diff(new: &Path, old: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = EditSession::load(&fs::read_to_string(new)?)?;
    session.set_old(Some(old.display().to_string()), fs::read_to_string(old)?);
    let rows = session.diff_rows()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        print!("{}", format_diff_rows(&rows));
    }
    Ok(())
}

fn run_changes(
    baseline: &Path,
    current: &Path,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = EditSession::load(&fs::read_to_string(baseline)?)?;
    session.import_text(
        &fs::read_to_string(current)?,
        ImportOptions::default().keep_source_text(true),
    )?;
    let changed_lines = session.changed_lines();
    let descriptions = session.line_descriptions();

    if json {
        let output = ChangesOutput {
            changed_lines,
            descriptions,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!(
            "{}",
            format_changed_lines_report(&changed_lines, &descriptions)
        );
    }
    Ok(())
}

fn run_merge(
    new: &Path,
    old: &Path,
    options: &MergeOptions,
    overrides: &[(&str, Side)],
    output: Option<&Path>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = EditSession::load(&fs::read_to_string(new)?)?;
    session.set_old(Some(old.display().to_string()), fs::read_to_string(old)?);

    let mut candidates = session.merge_candidates()?;
    apply_preference(&mut candidates, options);
    for (raw, side) in overrides {
        let found = parse_signature(raw)
            .is_some_and(|signature| choose(&mut candidates, &signature, *side));
        if !found {
            tracing::warn!(signature = %raw, "no merge candidate matches");
        }
    }

    let outcome = session.apply_merge(&candidates, options.use_other_when_missing)?;
    if let Some(path) = output {
        fs::write(path, &outcome.text)?;
    }

    if json {
        let summary = MergeOutput {
            candidates,
            used_structural_rewrite: outcome.used_structural_rewrite,
            text: outcome.text,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if output.is_some() {
        print!("{}", format_merge_report(&candidates));
        if outcome.used_structural_rewrite {
            println!("Merge applied (includes structural changes).");
        } else {
            println!("Merge applied (value-only update for New).");
        }
    } else {
        print!("{}", outcome.text);
    }
    Ok(())
}

fn run_check(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let doc = parse_checked(&fs::read_to_string(file)?)?;
    println!(
        "{}: {} section(s), {} item(s)",
        file.display(),
        doc.sections.len(),
        doc.items().count()
    );
    Ok(())
}

// `section::key` as typed on the command line.
fn parse_signature(raw: &str) -> Option<ItemSignature> {
    let (section, key) = raw.split_once("::")?;
    ItemSignature::new(section, key)
}
