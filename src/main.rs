use std::fs;
use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::Parser;
use tracing::info;

use plate_register::{
    ColumnChoice, FileLogo, LogoProvider, NoLogo, RawTable, RenderRequest, ReportSettings,
    VerificationRecord, extract_with, file_name, render_register, resolve_logo,
};

/// Vehicle Number Plate Register Generator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Spreadsheet (.xlsx, .xls) or CSV file to read
    #[arg(short, long)]
    input: PathBuf,

    /// Directory the PDF is saved into
    #[arg(short, long, default_value = "generated_reports")]
    output_dir: PathBuf,

    /// Column holding the plate numbers (auto-detected when omitted)
    #[arg(short, long)]
    column: Option<String>,

    /// Worksheet to read from a workbook (first sheet when omitted)
    #[arg(short, long)]
    sheet: Option<String>,

    /// Logo image shown in the header
    #[arg(short, long)]
    logo: Option<PathBuf>,

    /// Generation date stamped on the report (YYYY-MM-DD, default today)
    #[arg(short, long)]
    date: Option<NaiveDate>,

    /// JSON file overriding titles, labels and page geometry
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print every extracted plate
    #[arg(long, default_value_t = false)]
    list: bool,

    /// Extract and report only, without writing a PDF
    #[arg(long, default_value_t = false)]
    no_save: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let settings = match &args.config {
        Some(path) => ReportSettings::from_file(path)?,
        None => ReportSettings::default(),
    };
    settings.validate()?;

    println!("Vehicle Number Plate Register Generator");
    println!("=======================================");
    println!("Input file:      {}", args.input.display());
    println!("Output folder:   {}", args.output_dir.display());
    println!();

    let table = RawTable::from_path(&args.input, args.sheet.as_deref())?;

    let choice = match args.column.as_deref() {
        Some(name) => ColumnChoice::Named(name),
        None => ColumnChoice::Auto,
    };
    let extraction = extract_with(&table, choice)?;

    if let Some(column) = &extraction.column {
        let how = if extraction.auto_detected { "Auto-detected" } else { "Selected" };
        println!("{} column:  {}", how, column);
    }
    println!("Total unique plates: {}", extraction.total());

    if args.list {
        for (idx, plate) in extraction.plates.iter().enumerate() {
            println!("{:>6}. {}", idx + 1, plate);
        }
    }

    let generated_on = args.date.unwrap_or_else(|| Local::now().date_naive());
    let verification =
        VerificationRecord::issue(&settings.id_prefix, generated_on, extraction.total());
    println!("Verification ID: {}", verification.identifier);

    if args.no_save {
        info!("PDF generation skipped");
        return Ok(());
    }

    let provider: Box<dyn LogoProvider> = match &args.logo {
        Some(path) => Box::new(FileLogo::new(path)),
        None => Box::new(NoLogo),
    };
    let logo = resolve_logo(provider.as_ref());

    let report = render_register(
        &settings,
        &RenderRequest {
            plates: &extraction.plates,
            title: &settings.title,
            verification: &verification,
            logo: logo.as_deref(),
        },
    )?;

    fs::create_dir_all(&args.output_dir)?;
    let path = args
        .output_dir
        .join(file_name(&settings.report_label, &verification));
    fs::write(&path, &report.bytes)?;

    println!();
    println!("✓ Register generated successfully!");
    println!("  PDF:    {}", path.display());
    println!("  Pages:  {}", report.page_count);

    Ok(())
}
