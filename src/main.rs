use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::error;

use veridoc::config::EngineConfig;
use veridoc::engine::DocumentReport;
use veridoc::models::{DocumentClass, Frame, MrzOutcome};
use veridoc::ocr::TesseractMrzEngine;
use veridoc::processing::NoLandmarkProvider;
use veridoc::DocumentEngine;

/// Document compliance checks and MRZ extraction for identity documents.
#[derive(Parser, Debug)]
#[command(name = "veridoc", version, about)]
struct Cli {
    /// Image files to verify. The first page is scored for compliance; all
    /// pages are searched for an MRZ.
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Pin the compliance profile instead of auto-classifying.
    #[arg(long, value_enum)]
    profile: Option<ProfileArg>,

    /// Treat warnings as failures.
    #[arg(long)]
    strict: bool,

    /// Skip MRZ extraction and report compliance only.
    #[arg(long)]
    skip_mrz: bool,

    /// JSON configuration file with threshold overrides.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the OCR model files.
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Emit the report as JSON instead of text.
    #[arg(long)]
    json: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ProfileArg {
    Scan,
    Photo,
}

impl From<ProfileArg> for DocumentClass {
    fn from(p: ProfileArg) -> DocumentClass {
        match p {
            ProfileArg::Scan => DocumentClass::Scan,
            ProfileArg::Photo => DocumentClass::Photo,
        }
    }
}

fn run(cli: &Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    if cli.model_dir.is_some() {
        config.ocr.model_dir = cli.model_dir.clone();
    }

    let engine = if cli.skip_mrz {
        // No need to load the neural models when MRZ extraction is off.
        DocumentEngine::with_parts(
            config,
            Box::new(NoLandmarkProvider),
            Arc::new(TesseractMrzEngine),
            Arc::new(TesseractMrzEngine),
        )
    } else {
        DocumentEngine::new(config)?
    };

    let mut pages = Vec::with_capacity(cli.images.len());
    for path in &cli.images {
        let bytes = std::fs::read(path)?;
        pages.push(Frame::from_bytes(&bytes)?);
    }

    let class_override = cli.profile.map(DocumentClass::from);

    let report = if cli.skip_mrz {
        let first = &pages[0];
        DocumentReport {
            compliance: engine.evaluate_compliance(first, class_override, cli.strict)?,
            mrz: MrzOutcome::NotFound,
        }
    } else if class_override.is_some() {
        let compliance = engine.evaluate_compliance(&pages[0], class_override, cli.strict)?;
        let mrz = engine.extract_mrz(&pages)?;
        DocumentReport { compliance, mrz }
    } else {
        engine.verify_document(&pages, cli.strict)?
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, cli.skip_mrz);
    }

    Ok(report.compliance.is_valid)
}

fn print_report(report: &DocumentReport, skip_mrz: bool) {
    let c = &report.compliance;
    println!("Profile:          {}", c.profile);
    println!(
        "Classification:   {} (border std {:.1})",
        c.classification.class, c.classification.avg_border_std
    );
    println!("Compliance score: {:.0}/100", c.compliance_score);
    println!("Valid:            {}", if c.is_valid { "yes" } else { "no" });

    if !c.findings.is_empty() {
        println!("\nFindings:");
        for finding in &c.findings {
            println!("  [{:?}] {}: {}", finding.severity, finding.metric, finding.message);
        }
    }

    if skip_mrz {
        return;
    }
    match &report.mrz {
        MrzOutcome::Found(record) => {
            println!("\nMRZ ({} engine):", record.source_engine);
            println!("  Document:  {} ({})", record.document_number, record.document_type);
            println!("  Issuer:    {}", record.issuing_country);
            println!("  Name:      {} {}", record.given_names, record.surname);
            println!("  Nationality: {}", record.nationality);
            println!("  Born:      {}  Sex: {}", record.birth_date, record.sex);
            println!("  Expires:   {}", record.expiry_date);
            if let Some(personal) = &record.personal_number {
                println!("  Personal:  {}", personal);
            }
            println!(
                "  Integrity: {}",
                if record.is_valid { "all check digits valid" } else { "CHECK DIGIT FAILURES" }
            );
        }
        MrzOutcome::NotFound => println!("\nMRZ: not found"),
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::from(2)
        }
    }
}
