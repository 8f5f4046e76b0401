//! pagestruct CLI - page structure recovery for OCR word dumps

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use pagestruct::pipeline::{AcceptAll, CancelAt, CorrectionChannel};
use pagestruct::{
    render, DigitConfusion, Document, JsonFormat, Pipeline, PipelineOptions, PipelineReport,
    RegionType,
};

#[derive(Parser)]
#[command(name = "pagestruct")]
#[command(version)]
#[command(about = "Recover page numbers, table grids and continuations from OCR word dumps", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full structure pipeline and write the updated dump
    Process {
        /// Input dump (JSON or gzip-compressed JSON)
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Digit confusion table for OCR'd pages
        #[arg(long, value_name = "FILE", env = "PAGESTRUCT_CONFUSION")]
        confusion: Option<PathBuf>,

        /// Commit only pages below this index, as if review was cancelled there
        #[arg(long, value_name = "N")]
        cutoff: Option<usize>,

        /// Skip table reconstruction
        #[arg(long)]
        no_tables: bool,

        /// Skip continuation stitching
        #[arg(long)]
        no_stitch: bool,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        /// Also write the run report as JSON
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },

    /// Resolve and print page numbers
    PageNumbers {
        /// Input dump (JSON or gzip-compressed JSON)
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Digit confusion table for OCR'd pages
        #[arg(long, value_name = "FILE", env = "PAGESTRUCT_CONFUSION")]
        confusion: Option<PathBuf>,

        /// Print as a JSON array (null for undetermined pages)
        #[arg(long)]
        json: bool,
    },

    /// Process a dump and print its plain text
    Text {
        /// Input dump (JSON or gzip-compressed JSON)
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Keep regions typed as OCR artifacts
        #[arg(long)]
        keep_artifacts: bool,
    },

    /// Show document information
    Info {
        /// Input dump (JSON or gzip-compressed JSON)
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Process {
            input,
            output,
            confusion,
            cutoff,
            no_tables,
            no_stitch,
            compact,
            report,
        }) => {
            let options = pipeline_options(confusion.as_deref())
                .with_tables(!no_tables)
                .with_stitching(!no_stitch);
            cmd_process(&input, output.as_deref(), options, cutoff, compact, report.as_deref())
        }
        Some(Commands::PageNumbers { input, confusion, json }) => {
            cmd_page_numbers(&input, confusion.as_deref(), json)
        }
        Some(Commands::Text {
            input,
            output,
            keep_artifacts,
        }) => cmd_text(&input, output.as_deref(), keep_artifacts),
        Some(Commands::Info { input }) => cmd_info(&input),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            println!("{}", "Usage: pagestruct <COMMAND> <FILE>".yellow());
            println!("       pagestruct --help for more information");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn pipeline_options(confusion: Option<&Path>) -> PipelineOptions {
    match confusion {
        Some(path) => PipelineOptions::new().with_confusion_file(path),
        None => PipelineOptions::new(),
    }
}

fn cmd_process(
    input: &Path,
    output: Option<&Path>,
    options: PipelineOptions,
    cutoff: Option<usize>,
    compact: bool,
    report_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(3);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {msg}")?
            .progress_chars("#>-"),
    );

    pb.set_message("Loading pages...");
    let mut doc = Document::load(input)?;
    log::debug!("Loaded {} pages from {}", doc.page_count(), input.display());
    pb.inc(1);

    pb.set_message("Recovering structure...");
    let pipeline = Pipeline::new(options)?;
    let mut channel: Box<dyn CorrectionChannel> = match cutoff {
        Some(cutoff) => Box::new(CancelAt::new(cutoff)),
        None => Box::new(AcceptAll),
    };
    let report = pipeline.run(&mut doc, channel.as_mut())?;
    pb.inc(1);

    pb.set_message("Writing output...");
    let format = if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    };
    let json = render::to_json(&doc, format)?;
    if let Some(path) = report_path {
        fs::write(path, render::report_to_json(&report, JsonFormat::Pretty)?)?;
    }
    pb.inc(1);
    pb.finish_and_clear();

    match output {
        Some(path) => {
            fs::write(path, &json)?;
            print_summary(&report);
            println!("{} {}", "Saved to".green(), path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}

fn print_summary(report: &PipelineReport) {
    println!("{}", "Structure Summary".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "Pages".bold(), report.page_count);
    println!("{}: {}", "Classified".bold(), report.classified);
    let resolved = report.page_numbers.iter().filter(|e| e.value.is_some()).count();
    println!("{}: {}/{}", "Page numbers".bold(), resolved, report.page_numbers.len());
    println!("{}: {}", "Merges".bold(), report.merges);
    println!(
        "{}: {} ({} skipped, {} empty cells)",
        "Tables".bold(),
        report.tables_built,
        report.tables_skipped,
        report.synthetic_cells
    );
    if !report.orphans.is_empty() {
        println!("{}: {}", "Orphans".yellow().bold(), report.orphans.len());
    }
    if report.cancelled {
        println!(
            "{} pages from index {} left unprocessed",
            "Cancelled:".yellow().bold(),
            report.cutoff
        );
    }
    println!();
}

fn cmd_page_numbers(input: &Path, confusion: Option<&Path>, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut doc = Document::load(input)?;

    let table = match confusion {
        Some(path) => match DigitConfusion::load(path) {
            Ok(table) => Some(table),
            Err(pagestruct::Error::Io(e)) => {
                eprintln!("{} {} ({})", "Warning: cannot read".yellow(), path.display(), e);
                None
            }
            Err(e) => return Err(e.into()),
        },
        None => None,
    };

    let numbers = pagestruct::resolve_page_numbers(&mut doc, table)?;
    if json {
        println!("{}", serde_json::to_string(&numbers)?);
        return Ok(());
    }
    for (page, number) in doc.pages.iter().zip(numbers) {
        match number {
            Some(n) => println!("{:>6}  {}", page.id, n.to_string().green()),
            None => println!("{:>6}  {}", page.id, "-".dimmed()),
        }
    }

    Ok(())
}

fn cmd_text(input: &Path, output: Option<&Path>, keep_artifacts: bool) -> Result<(), Box<dyn std::error::Error>> {
    let text = extract_text(input, keep_artifacts)?;

    if let Some(path) = output {
        fs::write(path, &text)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", text);
    }

    Ok(())
}

fn extract_text(input: &Path, keep_artifacts: bool) -> pagestruct::Result<String> {
    let mut doc = Document::load(input)?;
    Pipeline::with_defaults()?.run_auto(&mut doc)?;

    let options = render::TextOptions {
        skip_artifacts: !keep_artifacts,
        ..render::TextOptions::default()
    };
    Ok(render::to_text_with_options(&doc, &options))
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let format = pagestruct::detect_format_from_path(input)?;
    let doc = Document::load(input)?;

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Format".bold(), format);
    println!("{}: {}", "Pages".bold(), doc.page_count());

    if let Some(ref title) = doc.metadata.title {
        println!("{}: {}", "Title".bold(), title);
    }
    if let Some(ref source) = doc.metadata.source {
        println!("{}: {}", "Source".bold(), source);
    }
    if let Some(ref processed) = doc.metadata.processed {
        println!("{}: {}", "Processed".bold(), processed);
    }

    println!();
    println!("{}", "Content Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    let ocred = doc.pages.iter().filter(|p| p.is_ocred).count();
    let regions: usize = doc.pages.iter().map(|p| p.regions.len()).sum();
    let tables = doc
        .pages
        .iter()
        .flat_map(|p| p.regions.iter())
        .filter(|r| r.kind == RegionType::Table)
        .count();
    let continuations = doc
        .pages
        .iter()
        .flat_map(|p| p.regions.iter())
        .filter(|r| r.continues)
        .count();

    println!("{}: {}", "Words".bold(), doc.word_count());
    println!("{}: {}", "OCR'd pages".bold(), ocred);
    println!("{}: {}", "Regions".bold(), regions);
    println!("{}: {}", "Tables".bold(), tables);
    println!("{}: {}", "Open continuations".bold(), continuations);

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "pagestruct".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Page structure recovery for OCR word dumps");
    println!();
    println!("License: MIT");
}
