use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::env;
use std::path::{Path, PathBuf};
use textpatch::{
    load_from_path, Document, EditRequest, EditSession, RequestConfig, SandboxGuard, SessionReport,
};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "textpatch")]
#[command(about = "Pattern-based text editing with verified span edits", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply edit requests to files under the base directory
    Apply {
        /// Sandbox base directory (defaults to $TEXTPATCH_BASE, then the
        /// current directory)
        #[arg(short, long)]
        base: Option<PathBuf>,

        /// Specific request file to apply (otherwise applies all in edits/)
        #[arg(short, long)]
        request: Option<PathBuf>,

        /// Dry run - resolve and verify everything without writing files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Check that edit requests would apply cleanly, without writing
    Check {
        /// Sandbox base directory (defaults to $TEXTPATCH_BASE, then the
        /// current directory)
        #[arg(short, long)]
        base: Option<PathBuf>,

        /// Specific request file to check
        #[arg(short, long)]
        request: Option<PathBuf>,
    },

    /// Safely append lines to the end of a file
    Append {
        /// Sandbox base directory
        #[arg(short, long)]
        base: Option<PathBuf>,

        /// Target file, relative to the base directory (created if missing)
        file: PathBuf,

        /// Lines to append
        #[arg(required = true)]
        lines: Vec<String>,

        /// Do not force a newline before the appended content
        #[arg(long)]
        no_ensure_newline: bool,
    },

    /// List discovered request files and their edit counts
    List {
        /// Sandbox base directory
        #[arg(short, long)]
        base: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Apply {
            base,
            request,
            dry_run,
            diff,
        } => cmd_apply(base, request, dry_run, diff),

        Commands::Check { base, request } => cmd_check(base, request),

        Commands::Append {
            base,
            file,
            lines,
            no_ensure_newline,
        } => cmd_append(base, file, lines, !no_ensure_newline),

        Commands::List { base } => cmd_list(base),
    }
}

/// Resolve the sandbox base directory.
///
/// Priority order:
/// 1. Explicit --base flag
/// 2. TEXTPATCH_BASE environment variable
/// 3. Current directory
fn resolve_base(cli_base: Option<PathBuf>) -> Result<PathBuf> {
    // 1. Explicit flag (highest priority)
    if let Some(path) = cli_base {
        return Ok(path.canonicalize()?);
    }

    // 2. Environment variable
    if let Ok(env_path) = env::var("TEXTPATCH_BASE") {
        let path = PathBuf::from(&env_path);
        if path.exists() {
            return Ok(path.canonicalize()?);
        }
        eprintln!(
            "{}",
            format!(
                "Warning: TEXTPATCH_BASE is set but path doesn't exist: {}",
                env_path
            )
            .yellow()
        );
    }

    // 3. Current directory
    let cwd = env::current_dir()?;
    println!(
        "{}",
        format!("Using current directory as base: {}", cwd.display()).dimmed()
    );
    Ok(cwd)
}

/// Helper: Discover all request files in an edits/ directory.
///
/// Discovery order:
/// 1. `<base>/edits` (keeps request files alongside the files they target).
/// 2. `./edits` relative to the current working directory.
fn discover_request_files(base: &Path) -> Result<Vec<PathBuf>> {
    let cwd_edits_dir = env::current_dir().ok().map(|cwd| cwd.join("edits"));
    let base_edits_dir = base.join("edits");

    let candidate_dirs: Vec<PathBuf> = std::iter::once(base_edits_dir)
        .chain(cwd_edits_dir.into_iter())
        .collect();

    for edits_dir in candidate_dirs {
        if !edits_dir.exists() {
            continue;
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&edits_dir).max_depth(1) {
            let entry = entry?;
            let ext = entry.path().extension().and_then(|s| s.to_str());
            if entry.file_type().is_file() && matches!(ext, Some("toml") | Some("json")) {
                files.push(entry.path().to_path_buf());
            }
        }

        files.sort();

        if !files.is_empty() {
            return Ok(files);
        }
    }

    anyhow::bail!(
        "No request files (.toml/.json) found in either ./edits or {}/edits",
        base.display()
    )
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (edited)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

/// Resolve the target, read it, and run the session in memory.
///
/// Returns the report together with the validated target path and the
/// original text so the caller can decide about persistence; `None` when
/// the target itself was rejected.
fn run_request(
    guard: &SandboxGuard,
    request: &EditRequest,
) -> Option<(PathBuf, String, SessionReport)> {
    let path = match guard.validate_path(&request.file) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("{} {}: {}", "✗".red(), request.file, e);
            return None;
        }
    };

    let document = match Document::from_path(&path) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("{} {}: {}", "✗".red(), request.file, e);
            return None;
        }
    };

    let original = document.text().to_string();
    let report = EditSession::new(document).run(&request.edits);
    Some((path, original, report))
}

/// Explain a failed session: which edit broke, why, and what never ran.
fn report_failure(request: &EditRequest, report: &SessionReport) {
    let Some((index, outcome)) = report.failure() else {
        return;
    };

    eprintln!(
        "{} {}: Failed at edit {} - {}",
        "✗".red(),
        request.file,
        index,
        outcome
    );

    let attempted = report.outcomes().len();
    let total = request.edits.len();
    if attempted < total {
        eprintln!(
            "  {} edit(s) after the failure were not attempted",
            total - attempted
        );
    }
}

fn cmd_apply(
    base: Option<PathBuf>,
    request_file: Option<PathBuf>,
    dry_run: bool,
    show_diff: bool,
) -> Result<()> {
    // 1. Resolve sandbox base
    let base = resolve_base(base)?;
    let guard = SandboxGuard::new(&base)?;

    // 2. Determine request files to load
    let request_files = if let Some(path) = request_file {
        vec![path]
    } else {
        discover_request_files(&base)?
    };

    println!("Base: {}", base.display());
    println!();

    let mut total_applied = 0;
    let mut total_no_changes = 0;
    let mut total_failed = 0;

    // 3. Load and process each request file
    for request_file in request_files {
        println!("Loading requests from {}...", request_file.display());

        let config = load_from_path(&request_file)?;
        print_config_header(&config);

        if dry_run {
            println!("{}", "  [DRY RUN - no files will be written]".cyan());
        }

        for request in &config.requests {
            let Some((path, original, report)) = run_request(&guard, request) else {
                total_failed += 1;
                continue;
            };

            if !report.succeeded() {
                // Discard policy: a request either fully applies or the
                // file is left exactly as it was on disk.
                report_failure(request, &report);
                total_failed += 1;
                continue;
            }

            if report.text() == original {
                println!("{} {}: No changes", "⊙".yellow(), request.file);
                total_no_changes += 1;
                continue;
            }

            let applied = report.outcomes().len();
            if dry_run {
                println!(
                    "{} {}: Would apply {} edit(s)",
                    "✓".green(),
                    request.file,
                    applied
                );
            } else {
                println!(
                    "{} {}: Applied {} edit(s)",
                    "✓".green(),
                    request.file,
                    applied
                );
            }

            if show_diff {
                display_diff(&path, &original, report.text());
            }

            if !dry_run {
                let path = guard.revalidate(&path)?;
                report.document().write_to(&path)?;
            }
            total_applied += 1;
        }

        println!();
    }

    // 4. Summary
    println!("{}", "Summary:".bold());
    println!("  {} applied", format!("{}", total_applied).green());
    println!(
        "  {} without changes",
        format!("{}", total_no_changes).yellow()
    );
    println!("  {} failed", format!("{}", total_failed).red());

    if total_failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_check(base: Option<PathBuf>, request_file: Option<PathBuf>) -> Result<()> {
    // 1. Resolve sandbox base
    let base = resolve_base(base)?;
    let guard = SandboxGuard::new(&base)?;

    // 2. Discover request files
    let request_files = if let Some(path) = request_file {
        vec![path]
    } else {
        discover_request_files(&base)?
    };

    println!("{}", "Checking edit requests...".bold());
    println!("Base: {}", base.display());
    println!();

    let mut clean = 0;
    let mut failed = 0;

    // 3. Run every session in memory; nothing is written
    for request_file in request_files {
        let config = load_from_path(&request_file)?;

        for request in &config.requests {
            let Some((_, _, report)) = run_request(&guard, request) else {
                failed += 1;
                continue;
            };

            if report.succeeded() {
                println!(
                    "{} {}: {} edit(s) would apply cleanly",
                    "✓".green(),
                    request.file,
                    report.outcomes().len()
                );
                clean += 1;
            } else {
                report_failure(request, &report);
                failed += 1;
            }
        }
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} clean", format!("{}", clean).green());
    println!("  {} failed", format!("{}", failed).red());

    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_append(
    base: Option<PathBuf>,
    file: PathBuf,
    lines: Vec<String>,
    ensure_newline: bool,
) -> Result<()> {
    let base = resolve_base(base)?;
    let guard = SandboxGuard::new(&base)?;

    let path = guard.validate_or_create(&file)?;

    let mut document = Document::from_path(&path)?;
    document.append_lines(&lines, ensure_newline);

    let path = guard.revalidate(&path)?;
    document.write_to(&path)?;

    println!(
        "{} Appended {} line(s) to {}",
        "✓".green(),
        lines.len(),
        file.display()
    );

    Ok(())
}

fn cmd_list(base: Option<PathBuf>) -> Result<()> {
    let base = resolve_base(base)?;
    let request_files = discover_request_files(&base)?;

    println!("{}", "Available edit requests".bold());
    println!();

    for request_file in request_files {
        match load_from_path(&request_file) {
            Ok(config) => {
                let edits: usize = config.requests.iter().map(|r| r.edits.len()).sum();
                let name = if config.meta.name.is_empty() {
                    "(unnamed)".to_string()
                } else {
                    config.meta.name.clone()
                };
                println!(
                    "{} - {} ({} request(s), {} edit(s))",
                    request_file.display(),
                    name,
                    config.requests.len(),
                    edits
                );
                if let Some(description) = &config.meta.description {
                    println!("  {}", description.dimmed());
                }
            }
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), request_file.display(), e);
            }
        }
    }

    Ok(())
}

fn print_config_header(config: &RequestConfig) {
    if !config.meta.name.is_empty() {
        println!("  {}", config.meta.name.bold());
    }
    if let Some(description) = &config.meta.description {
        println!("  {}", description.dimmed());
    }
}
