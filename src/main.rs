use std::fs;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use shop_extract::extract::reconstructor;
use shop_extract::output::to_json;
use shop_extract::{
    Document, DocumentToRecords, ExtractConfig, Shop, Strategy, cross_check, write_json,
};

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum StrategyArg {
    /// Segment the token stream on record boundaries (default)
    #[default]
    Sequential,
    /// Cluster rows by position and split on column bounds
    Geometric,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Sequential => Strategy::Sequential,
            StrategyArg::Geometric => Strategy::Geometric,
        }
    }
}

/// Extract the partner-shop table of a PDF as JSON records
#[derive(Parser, Debug)]
#[command(name = "shop-extract")]
#[command(version, about, long_about = None)]
struct Args {
    /// PDF file to read
    pdf: PathBuf,

    /// Write JSON to FILE instead of stdout
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,

    /// Record reconstruction strategy
    #[arg(long, value_enum, default_value_t = StrategyArg::Sequential)]
    strategy: StrategyArg,

    /// Number of records the document should contain
    #[arg(long = "expected", value_name = "N")]
    expected: Option<usize>,

    /// Max vertical distance between fragments of one row
    #[arg(long = "row-tolerance", default_value = "2.0")]
    row_tolerance: f64,

    /// Also run the other strategy and report where the two disagree
    #[arg(long = "cross-check")]
    cross_check: bool,

    /// Print decoded text fragments with positions instead of records
    #[arg(long)]
    raw: bool,

    /// Debug logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    eprintln!("Reading: {}", args.pdf.display());

    let data = match fs::read(&args.pdf) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Failed to read file: {}", e);
            std::process::exit(1);
        }
    };

    let doc = match Document::new(&data) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error opening PDF: {}", e);
            std::process::exit(1);
        }
    };

    if args.raw {
        print_raw(&doc);
        return;
    }

    let config = ExtractConfig::new()
        .with_strategy(args.strategy.into())
        .with_row_tolerance(args.row_tolerance)
        .with_expected_total(args.expected);

    let extraction = match doc.extract(&config) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Extraction failed: {}", e);
            std::process::exit(1);
        }
    };

    for dropped in &extraction.dropped {
        eprintln!("Dropped record {}: {}", dropped.id, dropped.reason);
    }

    if args.cross_check {
        run_cross_check(&doc, &config, &extraction.shops);
    }

    match args.output {
        Some(path) => {
            if let Err(e) = write_json(&path, &extraction.shops) {
                eprintln!("Failed to write output: {}", e);
                std::process::exit(1);
            }
            eprintln!("Output written to: {}", path.display());
        }
        None => match to_json(&extraction.shops) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Failed to serialize records: {}", e);
                std::process::exit(1);
            }
        },
    }
}

fn print_raw(doc: &Document) {
    let cmap = doc.cmap();
    let fragments = match doc.fragments(&cmap) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error decoding content: {}", e);
            std::process::exit(1);
        }
    };

    let mut page = None;
    for fragment in fragments {
        if page != Some(fragment.page) {
            println!("--- Page {} ---", fragment.page + 1);
            page = Some(fragment.page);
        }
        println!(
            "[{:.1}, {:.1}] ({}pt): {}",
            fragment.x, fragment.y, fragment.font_size, fragment.text
        );
    }
}

fn run_cross_check(doc: &Document, config: &ExtractConfig, primary: &[Shop]) {
    let oracle_strategy = reconstructor(config.strategy.other(), config);
    let oracle = doc
        .fragments(&doc.cmap())
        .and_then(|fragments| oracle_strategy.to_records(&fragments));

    match oracle {
        Ok(oracle) => {
            let found = cross_check(primary, &oracle.shops);
            for discrepancy in &found {
                log::warn!("{}", discrepancy);
            }
            eprintln!(
                "Cross-check against {}: {} discrepancies",
                oracle_strategy.name(),
                found.len()
            );
        }
        Err(e) => log::warn!("cross-check skipped: {}", e),
    }
}
