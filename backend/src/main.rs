//! KPI Lens CLI - ingest financial spreadsheets and format KPIs
//!
//! # Main Commands
//!
//! ```bash
//! kpilens serve                         # Start HTTP server (port 3000)
//! kpilens kpis pnl.csv --format         # Suggest, compute and format KPIs
//! kpilens kpis pnl.csv --mapping k.json # KPIs from a mapping file
//! kpilens format 7245000 --unit ₹       # ₹72.45 L
//! kpilens dashboard list                # Manage stored dashboards
//! ```
//!
//! # Data Commands
//!
//! ```bash
//! kpilens parse pnl.csv                 # Ingest and print the dataset
//! kpilens export pnl.csv -o flat.csv    # Ingest then write back as CSV
//! ```

use clap::{Parser, Subcommand};
use kpilens::api::FormattedKpi;
use kpilens::{
    compute_kpis, format_kpi, format_kpi_value, ingest_file, parse_formatted, suggest_kpis,
    AppConfig, CellValue, Dataset, DashboardStore, IngestOptions, IngestOutput, KpiMapping,
    NumberSystem,
};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "kpilens")]
#[command(about = "Ingest financial CSV/JSON files, compute KPIs and format them in lakh/crore or millions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a file and output the dataset as JSON
    Parse {
        /// Input CSV or JSON file
        input: PathBuf,

        /// Field delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Skip rows with the wrong number of fields
        #[arg(long)]
        strict: bool,

        /// Keep row-aligned input as it is
        #[arg(long)]
        no_pivot: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Ingest a file and compute KPIs
    Kpis {
        /// Input CSV or JSON file
        input: PathBuf,

        /// KPI mapping file (default: suggest KPIs from the columns)
        #[arg(short, long)]
        mapping: Option<PathBuf>,

        /// Add display strings to each KPI
        #[arg(short, long)]
        format: bool,

        /// Number system for display strings
        #[arg(long)]
        system: Option<NumberSystem>,

        /// Currency symbol for monetary KPIs
        #[arg(long)]
        currency: Option<String>,

        /// Also save the result as a dashboard
        #[arg(long)]
        save: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Format a number (accepts `7245000`, `72.45 L`, `1,23,45,678`)
    Format {
        /// Value to format
        #[arg(allow_hyphen_values = true)]
        value: String,

        /// Unit: a currency symbol, %, x, days, score...
        #[arg(short, long)]
        unit: Option<String>,

        /// Number system
        #[arg(short, long)]
        system: Option<NumberSystem>,

        /// Fraction digits (0-10)
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(0..=10))]
        decimals: Option<u32>,

        /// Fully grouped digits instead of a magnitude suffix
        #[arg(long)]
        full: bool,
    },

    /// Ingest a file and write the (pivoted) dataset as CSV
    Export {
        /// Input CSV or JSON file
        input: PathBuf,

        /// Field delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: KPILENS_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage stored dashboards
    Dashboard {
        #[command(subcommand)]
        action: DashboardAction,
    },
}

#[derive(Subcommand)]
enum DashboardAction {
    /// List all stored dashboards
    List,

    /// Show a dashboard as JSON
    Show {
        /// Dashboard ID
        id: String,
    },

    /// Delete a dashboard
    Delete {
        /// Dashboard ID
        id: String,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse {
            input,
            delimiter,
            strict,
            no_pivot,
            output,
        } => {
            let options = IngestOptions {
                delimiter,
                strict: strict || config.strict,
                auto_pivot: !no_pivot,
            };
            cmd_parse(&input, &options, output.as_deref())
        }

        Commands::Kpis {
            input,
            mapping,
            format,
            system,
            currency,
            save,
            output,
        } => {
            let mut config = config;
            if let Some(system) = system {
                config.number_system = system;
            }
            if currency.is_some() {
                config.currency = currency;
            }
            cmd_kpis(&input, mapping.as_deref(), format, save, &config, output.as_deref())
        }

        Commands::Format {
            value,
            unit,
            system,
            decimals,
            full,
        } => {
            let mut config = config;
            if let Some(system) = system {
                config.number_system = system;
            }
            if let Some(decimals) = decimals {
                config.decimals = decimals;
            }
            cmd_format(&value, unit.as_deref(), full, &config)
        }

        Commands::Export {
            input,
            delimiter,
            output,
        } => {
            let options = IngestOptions {
                delimiter,
                strict: config.strict,
                ..IngestOptions::default()
            };
            cmd_export(&input, &options, output.as_deref())
        }

        Commands::Serve { port } => {
            let mut config = config;
            if let Some(port) = port {
                config.port = port;
            }
            kpilens::server::start_server(config).await
        }

        Commands::Dashboard { action } => cmd_dashboard(action, &config),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn ingest(input: &Path, options: &IngestOptions) -> Result<IngestOutput, Box<dyn std::error::Error>> {
    eprintln!("📄 Ingesting: {}", input.display());
    let output = ingest_file(input, options)?;

    if let Some(ref encoding) = output.encoding {
        eprintln!("   Encoding: {}", encoding);
    }
    if let Some(ref delimiter) = output.delimiter {
        eprintln!("   Delimiter: '{}'", delimiter);
    }
    eprintln!("   Orientation: {}", output.classification.orientation);
    eprintln!("   Columns: {}", output.dataset.headers.join(", "));
    eprintln!("✅ {} rows", output.dataset.row_count());
    Ok(output)
}

fn cmd_parse(
    input: &Path,
    options: &IngestOptions,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = ingest(input, options)?;
    let json = serde_json::to_string_pretty(&result.dataset)?;
    write_output(&json, output)
}

fn cmd_kpis(
    input: &Path,
    mapping: Option<&Path>,
    format: bool,
    save: bool,
    config: &AppConfig,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = IngestOptions {
        strict: config.strict,
        ..IngestOptions::default()
    };
    let result = ingest(input, &options)?;
    let dataset = result.dataset;

    let definitions = match mapping {
        Some(path) => {
            eprintln!("🗺️  Mapping: {}", path.display());
            KpiMapping::from_file(path)?.kpis
        }
        None => suggest_kpis(&dataset, config.currency.as_deref()),
    };

    let kpis = compute_kpis(&dataset, &definitions);
    let format_options = config.format_options();

    eprintln!("\n📊 {} KPIs:", kpis.len());
    for kpi in &kpis {
        let shown = format_kpi(kpi, &format_options)
            .map(|v| v.formatted)
            .unwrap_or_else(|| "-".to_string());
        eprintln!("   {:<30} {}", kpi.name, shown);
    }

    let json = if format {
        serde_json::to_string_pretty(&FormattedKpi::all(kpis.clone(), &format_options))?
    } else {
        serde_json::to_string_pretty(&kpis)?
    };

    if save {
        let name = input
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("dashboard");
        let mut store = DashboardStore::with_dir(&config.store_dir);
        let dashboard = store.save(name, dataset, kpis);
        if dashboard.storage.is_stored() {
            eprintln!("💾 Dashboard saved: {}", dashboard.id);
        }
    }

    write_output(&json, output)
}

fn cmd_format(
    value: &str,
    unit: Option<&str>,
    full: bool,
    config: &AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let number = parse_formatted(value).ok_or_else(|| format!("Not a number: {}", value))?;
    let options = config.format_options().with_compact(!full);

    let formatted = format_kpi_value(number, unit, &options);
    println!("{}", formatted.formatted);
    if formatted.tooltip != formatted.formatted {
        eprintln!("   {}", formatted.tooltip);
    }
    Ok(())
}

fn cmd_export(
    input: &Path,
    options: &IngestOptions,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = ingest(input, options)?;

    match output {
        Some(path) => {
            write_csv(&result.dataset, csv::Writer::from_path(path)?)?;
            eprintln!("💾 Output written to: {}", path.display());
        }
        None => write_csv(&result.dataset, csv::Writer::from_writer(io::stdout()))?,
    }
    Ok(())
}

fn write_csv<W: io::Write>(
    dataset: &Dataset,
    mut writer: csv::Writer<W>,
) -> Result<(), Box<dyn std::error::Error>> {
    writer.write_record(&dataset.headers)?;
    for row in &dataset.rows {
        let fields = dataset.headers.iter().map(|h| match row.get(h) {
            Some(CellValue::Number(n)) => n.to_string(),
            Some(CellValue::Text(s)) => s.clone(),
            Some(CellValue::Null) | None => String::new(),
        });
        writer.write_record(fields)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}

fn cmd_dashboard(action: DashboardAction, config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = DashboardStore::with_dir(&config.store_dir);

    match action {
        DashboardAction::List => {
            let dashboards = store.list();
            if dashboards.is_empty() {
                eprintln!("📋 No dashboards stored yet.");
                eprintln!("   Use 'kpilens kpis <file> --save' or upload through the server.");
                return Ok(());
            }

            eprintln!("📋 Stored dashboards ({}):\n", dashboards.len());
            for d in dashboards {
                println!("  📊 {} ({})", d.name, d.id);
                println!("     Created: {}", d.created_at);
                println!("     Rows: {}", d.dataset.row_count());
                println!("     KPIs: {}", d.kpis.len());
                println!();
            }
        }

        DashboardAction::Show { id } => match store.get(&id) {
            Some(d) => {
                println!("{}", serde_json::to_string_pretty(d)?);
            }
            None => {
                return Err(format!("Dashboard not found: {}", id).into());
            }
        },

        DashboardAction::Delete { id } => {
            store.delete(&id)?;
            eprintln!("🗑️  Dashboard deleted: {}", id);
        }
    }

    Ok(())
}
