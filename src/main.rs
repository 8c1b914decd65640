use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

mod aggregate;
mod db;
mod error;
mod export;
mod models;
mod pdf;
mod range;
mod report;
mod server;
mod shaping;
mod xlsx;

use aggregate::Aggregator;
use export::PdfExport;
use models::Field;
use pdf::FontSource;

#[derive(Parser)]
#[command(name = "survey-reports")]
#[command(about = "Student e-learning survey collection and reporting", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed responses
    Seed,
    /// Import responses from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Print the admin dashboard
    Dashboard {
        #[arg(long)]
        json: bool,
    },
    /// Count answers for one question
    Counts {
        #[arg(long)]
        field: Field,
        #[arg(long, requires = "to")]
        from: Option<String>,
        #[arg(long, requires = "from")]
        to: Option<String>,
    },
    /// Show responses per local day for the most recent active days
    Trend {
        #[arg(long, default_value_t = aggregate::TREND_DAYS)]
        days: usize,
    },
    /// Export responses in a date range as a spreadsheet
    ExportExcel {
        #[arg(long, default_value = "")]
        from: String,
        #[arg(long, default_value = "")]
        to: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Export statistics for a date range as a PDF report
    ExportPdf {
        #[arg(long, default_value = "")]
        from: String,
        #[arg(long, default_value = "")]
        to: String,
        #[arg(long, default_value = pdf::DEFAULT_FONT_PATH)]
        font: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Run the HTTP server
    Serve {
        #[arg(long, default_value_t = 8000)]
        port: u16,
        #[arg(long, default_value = pdf::DEFAULT_FONT_PATH)]
        font: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to the survey Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let inserted = db::seed(&pool).await?;
            println!("Inserted {inserted} seed responses.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} responses from {}.", csv.display());
        }
        Commands::Dashboard { json } => {
            let dashboard = report::build_dashboard(&pool).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&dashboard)?);
            } else {
                print!("{}", report::render_summary(&dashboard));
            }
        }
        Commands::Counts { field, from, to } => {
            let range = match (from, to) {
                (Some(from), Some(to)) => Some(range::DateRange::parse(&from, &to)?),
                _ => None,
            };
            let counts = Aggregator::new(&pool)
                .counts_by_field(field, range.as_ref())
                .await?;

            if counts.is_empty() {
                println!("No responses for {field}.");
                return Ok(());
            }
            for (label, count) in aggregate::top_n(&counts, counts.len()) {
                println!("- {label}: {count}");
            }
        }
        Commands::Trend { days } => {
            let trend = Aggregator::new(&pool).daily_trend(days).await?;
            if trend.is_empty() {
                println!("No responses recorded yet.");
            }
            for point in trend {
                println!("{}  {}", point.day, point.count);
            }
        }
        Commands::ExportExcel { from, to, out } => {
            let file = export::export_spreadsheet(&pool, &from, &to).await?;
            let out = out.unwrap_or_else(|| PathBuf::from(&file.filename));
            std::fs::write(&out, &file.bytes)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Spreadsheet written to {}.", out.display());
        }
        Commands::ExportPdf {
            from,
            to,
            font,
            out,
        } => {
            let font = FontSource::load(&font);
            match export::export_pdf(&pool, &from, &to, &font).await? {
                PdfExport::Document(file) => {
                    let out = out.unwrap_or_else(|| PathBuf::from(&file.filename));
                    std::fs::write(&out, &file.bytes)
                        .with_context(|| format!("failed to write {}", out.display()))?;
                    println!("Report written to {}.", out.display());
                }
                PdfExport::Dashboard => {
                    println!("A PDF needs both --from and --to; showing the dashboard.");
                    let dashboard = report::build_dashboard(&pool).await?;
                    print!("{}", report::render_summary(&dashboard));
                }
            }
        }
        Commands::Serve { port, font } => {
            let state = Arc::new(server::AppState {
                store: Arc::new(pool),
                font: FontSource::load(&font),
            });
            server::serve(state, port).await?;
        }
    }

    Ok(())
}
