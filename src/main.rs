use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use refund_radar::config::Config;
use refund_radar::io::writer;
use refund_radar::logging;
use refund_radar::pipeline::assemble::{self, ConsolidatedTable};
use refund_radar::pipeline::{metrics, validate};

#[derive(Parser)]
#[command(name = "refund_radar")]
#[command(about = "Point-of-sale refund analytics pipeline")]
#[command(version = "0.1.0")]
struct Cli {
    /// Optional TOML config file; defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize raw exports and write the consolidated refund table
    Clean {
        /// Directory holding the raw per-site, per-month CSV exports
        #[arg(long, default_value = "data/raw")]
        input_dir: PathBuf,
        /// Destination for the consolidated CSV
        #[arg(long, default_value = "data/processed/refunds.csv")]
        output: PathBuf,
    },
    /// Compute KPIs, grouped aggregations, peak days and SQRI scores
    Report {
        #[arg(long, default_value = "data/raw")]
        input_dir: PathBuf,
        /// Directory the aggregate CSVs are written to
        #[arg(long, default_value = "output")]
        output_dir: PathBuf,
    },
    /// Print the data-quality validation report as JSON
    Validate {
        #[arg(long, default_value = "data/raw")]
        input_dir: PathBuf,
    },
}

fn assemble_input(input_dir: &PathBuf, config: &Config) -> anyhow::Result<ConsolidatedTable> {
    let span = tracing::info_span!("assemble", dir = %input_dir.display());
    let _enter = span.enter();
    let table = assemble::assemble_dir(input_dir, &config.cleaning)?;
    info!(
        raw = table.raw_rows,
        refunds = table.refund_rows,
        retained = table.len(),
        "assembled consolidated table"
    );
    Ok(table)
}

fn main() -> anyhow::Result<()> {
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Clean { input_dir, output } => {
            println!("🧹 Cleaning raw exports...");
            let table = assemble_input(&input_dir, &config)?;
            writer::write_consolidated(&output, &table)?;

            println!("\n📊 Cleaning results:");
            println!("   Raw rows:      {}", table.raw_rows);
            println!("   Refund rows:   {}", table.refund_rows);
            println!("   Analysis rows: {}", table.len());
            println!("   Output file:   {}", output.display());
        }
        Commands::Report { input_dir, output_dir } => {
            println!("📈 Building refund report...");
            let table = assemble_input(&input_dir, &config)?;

            let kpis = metrics::kpis(&table);
            let by_site_month = metrics::by_site_month(&table);
            let category_split = metrics::category_split(&table);
            let peak_days = metrics::peak_days(&table, config.peak_days_top_n);
            let sqri = metrics::sqri(&table, &config.sqri, config.cleaning.high_value_threshold);

            writer::write_rows(&output_dir.join("by_site_month.csv"), &by_site_month)?;
            writer::write_rows(&output_dir.join("category_split.csv"), &category_split)?;
            writer::write_rows(&output_dir.join("peak_days.csv"), &peak_days)?;
            writer::write_rows(&output_dir.join("sqri.csv"), &sqri)?;

            println!("\n📊 KPIs:");
            println!("   Refund count: {}", kpis.refund_count);
            println!("   Total value:  {:.2}", kpis.total_refund_value);
            println!("   Avg value:    {:.2}", kpis.avg_refund_value);

            println!("\n🏨 SQRI leaderboard:");
            for row in &sqri {
                println!(
                    "   {:<12} score {:.3} (total {:.2}, accomm share {:.2}, high-value {:.2})",
                    row.site,
                    row.sqri_score,
                    row.total_value,
                    row.accommodation_share_value,
                    row.high_value_share
                );
            }
            println!("\n   Output dir: {}", output_dir.display());
        }
        Commands::Validate { input_dir } => {
            println!("🔍 Validating dataset...");
            let table = match assemble_input(&input_dir, &config) {
                Ok(table) => table,
                Err(e) => {
                    error!("validation aborted: {e}");
                    return Err(e);
                }
            };
            let report = validate::validate_dataset(&table);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
