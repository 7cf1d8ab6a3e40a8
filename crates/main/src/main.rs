use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use log::info;

use toc_report::config::ReportConfig;
use toc_report::report::sample_report;
use toc_report::style::StyleSheet;
use toc_report::{RenderedReport, ReportError};

/// Builds the sample report with a live table of contents and cross references.
///
/// Fonts are looked up in `--fonts-dir`, the `fonts_dir` configuration entry, the
/// `TOC_REPORT_FONTS_DIR` environment variable, `assets/fonts` next to the executable and
/// finally `assets/fonts` in the crate sources.
#[derive(Parser)]
#[command(author, version, about = "Multi-pass PDF report generator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the sample report to a PDF file.
    Render {
        #[command(flatten)]
        build: BuildArgs,

        /// Output path of the PDF.
        #[arg(short, long, default_value = "report.pdf")]
        output: PathBuf,
    },

    /// Build the sample report and print the resolved table of contents.
    Toc {
        #[command(flatten)]
        build: BuildArgs,
    },

    /// Print the registered paragraph and table styles.
    Styles,
}

#[derive(Args)]
struct BuildArgs {
    /// Configuration file (JSON). Falls back to TOC_REPORT_CONFIG.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the report fonts.
    #[arg(long)]
    fonts_dir: Option<PathBuf>,

    /// Fail when a cross-reference group matches no heading.
    #[arg(long)]
    strict: bool,
}

impl BuildArgs {
    fn config(&self) -> Result<ReportConfig, ReportError> {
        let (mut config, source) = ReportConfig::resolve(self.config.as_deref())?;
        info!("Using configuration from {}", source);
        if let Some(dir) = &self.fonts_dir {
            config.fonts_dir = Some(dir.clone());
        }
        if self.strict {
            config.strict_cross_references = true;
        }
        Ok(config)
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Render { build, output } => render(&build, &output),
        Commands::Toc { build } => print_toc(&build),
        Commands::Styles => {
            print_styles(&StyleSheet::report_defaults());
            Ok(())
        }
    };

    if let Err(err) = result {
        eprintln!("Error: {}", err);
        print_error_sources(&err);
        std::process::exit(1);
    }
}

fn render(build: &BuildArgs, output: &Path) -> Result<(), ReportError> {
    let report = sample_report(build.config()?).write_to(output)?;
    print_warnings(&report);
    println!(
        "Wrote {} ({} pages, {} layout passes)",
        output.display(),
        report.pages,
        report.passes
    );
    Ok(())
}

fn print_toc(build: &BuildArgs) -> Result<(), ReportError> {
    let report = sample_report(build.config()?).render()?;
    print_warnings(&report);

    println!("Table of contents:");
    for entry in &report.toc {
        println!("  {:indent$}{} .... {}", "", entry.text, entry.page, indent = 2 * entry.level as usize);
    }

    println!("Cross references:");
    for cross_ref in &report.cross_references {
        println!(
            "  [{}] {} .... {}",
            cross_ref.group, cross_ref.entry.text, cross_ref.entry.page
        );
    }
    Ok(())
}

fn print_styles(styles: &StyleSheet) {
    println!("Paragraph styles:");
    for style in styles.paragraph_styles() {
        println!(
            "  {:<16} {} {}pt (leading {}pt) {:?}",
            style.name, style.font_name, style.font_size, style.leading, style.alignment
        );
    }
    println!("Table styles:");
    for style in styles.table_styles() {
        println!(
            "  {:<16} grid {}pt rgb({}, {}, {}), padding {}pt",
            style.name,
            style.grid_width,
            style.grid_color.0,
            style.grid_color.1,
            style.grid_color.2,
            style.cell_padding
        );
    }
}

fn print_warnings(report: &RenderedReport) {
    for warning in &report.warnings {
        eprintln!("Warning: {}", warning);
    }
}

fn print_error_sources(mut error: &(dyn Error + 'static)) {
    while let Some(source) = error.source() {
        eprintln!("  caused by: {}", source);
        error = source;
    }
}
