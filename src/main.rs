use anyhow::Context;
use clap::{Parser, Subcommand};
use royalbit_insight::cli;
use royalbit_insight::config::AnalysisConfig;
use royalbit_insight::core::AnalysisFacade;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "insight")]
#[command(about = "Pareto and pivot analysis for tabular business data.")]
#[command(long_about = "Insight - Pareto (80/20) and pivot analysis
CSV, YAML and Excel input | YAML/JSON reports | Excel charts

COMMANDS:
  pareto       - Rank categories by their share of a measure
  pivot        - Summarize a measure across row/column dimensions
  sales        - Which products drive 80% of sales
  inventory    - Which items drive 80% of inventory turnover
  sales-pivot  - Sales pivot with grand totals

EXAMPLES:
  insight pareto sales.csv --category Product --value Sales
  insight pareto sales.csv -c Product -v Sales --chart pareto.xlsx
  insight pivot sales.csv --rows Region --columns Quarter --value Sales --margins
  insight sales-pivot sales.csv --rows Region --columns Quarter

CONFIGURATION:
  --config insight.yaml overrides the threshold, margin labels and the
  preset column names. INSIGHT_THRESHOLD overrides the threshold.
  RUST_LOG controls log output (default: warnings only).")]
#[command(version)]
struct Cli {
    /// Configuration file (YAML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Cumulative share threshold for Pareto analyses, in (0, 1]
    #[arg(short, long, global = true, env = "INSIGHT_THRESHOLD")]
    threshold: Option<f64>,

    /// Show debug logging
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(long_about = "Rank categories by their contribution to a measure.

Groups rows by the category column, sums the value column per category,
sorts descending and reports cumulative totals and percentages. The
highlighted rows are the smallest set of categories whose cumulative
share reaches the threshold (default 80%).

Ties keep the order in which categories first appear in the input.
Missing values are skipped; empty categories are grouped as (blank).

EXAMPLES:
  insight pareto sales.csv --category Product --value Sales
  insight pareto sales.csv -c Product -v Sales --threshold 0.9
  insight pareto sales.csv -c Product -v Sales --chart pareto.xlsx -o pareto.yaml")]
    /// Rank categories by their share of a measure
    Pareto {
        /// Input table (.csv, .yaml, .yml or .xlsx)
        file: PathBuf,

        /// Category column
        #[arg(short, long)]
        category: String,

        /// Numeric value column
        #[arg(short, long)]
        value: String,

        /// Write an Excel Pareto chart (.xlsx)
        #[arg(long)]
        chart: Option<PathBuf>,

        /// Write the result as a report (.yaml or .json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    #[command(long_about = "Summarize a measure across row and column dimensions.

Each cell aggregates the value column over the rows sharing its row key
and column key. Keys are sorted (numbers, dates, text, booleans, blanks).

AGGREGATIONS:
  sum, mean, count, min, max

MARGINS:
  --margins adds row totals, column totals and a grand total. Totals are
  computed from the underlying rows, so a mean total is the mean of all
  values in that row or column, not the mean of the cell means.

OUTPUT FORMATS:
  Terminal table (default)
  YAML/JSON: insight pivot sales.csv -r Region -v Sales -o pivot.json
  Excel:     insight pivot sales.csv -r Region -v Sales -o pivot.xlsx

EXAMPLES:
  insight pivot sales.csv --rows Region --columns Quarter --value Sales
  insight pivot sales.csv -r Region,Product -v Units --agg mean --margins
  insight pivot sales.csv -r Region --columns Quarter -v Sales --fill 0")]
    /// Summarize a measure across row/column dimensions
    Pivot {
        /// Input table (.csv, .yaml, .yml or .xlsx)
        file: PathBuf,

        /// Row dimension columns (comma-separated)
        #[arg(short, long, required = true, value_delimiter = ',')]
        rows: Vec<String>,

        /// Column dimension columns (comma-separated)
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,

        /// Value column
        #[arg(short, long)]
        value: String,

        /// Aggregation: sum, mean, count, min or max
        #[arg(short, long, default_value = "sum")]
        agg: String,

        /// Add row totals, column totals and a grand total
        #[arg(short, long)]
        margins: bool,

        /// Fill missing row/column combinations with this value
        #[arg(long)]
        fill: Option<f64>,

        /// Output file (.yaml, .json or .xlsx)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Which products drive the threshold share of sales
    Sales {
        /// Input table with product and sales columns
        file: PathBuf,

        /// Write an Excel Pareto chart (.xlsx)
        #[arg(long)]
        chart: Option<PathBuf>,

        /// Write the summary as a report (.yaml or .json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Which items drive the threshold share of inventory turnover
    Inventory {
        /// Input table with item and turnover columns
        file: PathBuf,

        /// Write an Excel Pareto chart (.xlsx)
        #[arg(long)]
        chart: Option<PathBuf>,

        /// Write the summary as a report (.yaml or .json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Sales pivot with grand totals
    SalesPivot {
        /// Input table
        file: PathBuf,

        /// Row dimension
        #[arg(short, long)]
        rows: String,

        /// Optional column dimension
        #[arg(long)]
        columns: Option<String>,

        /// Value column
        #[arg(short, long, default_value = "Sales")]
        value: String,

        /// Aggregation: sum, mean, count, min or max
        #[arg(short, long, default_value = "sum")]
        agg: String,

        /// Output file (.yaml, .json or .xlsx)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "royalbit_insight=debug"
    } else {
        "royalbit_insight=warn"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}

fn load_config(cli: &Cli) -> anyhow::Result<AnalysisConfig> {
    let mut config = match &cli.config {
        Some(path) => AnalysisConfig::load(path)
            .with_context(|| format!("Failed to load configuration '{}'", path.display()))?,
        None => AnalysisConfig::default(),
    };
    if let Some(threshold) = cli.threshold {
        config = config.with_threshold(threshold);
    }
    config.validate()?;
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let facade = AnalysisFacade::new(load_config(&cli)?);

    match cli.command {
        Commands::Pareto {
            file,
            category,
            value,
            chart,
            output,
        } => cli::pareto(&facade, file.clone(), category, value, chart, output)
            .with_context(|| format!("Pareto analysis of '{}' failed", file.display())),

        Commands::Pivot {
            file,
            rows,
            columns,
            value,
            agg,
            margins,
            fill,
            output,
        } => cli::pivot(
            &facade,
            file.clone(),
            rows,
            columns,
            value,
            agg,
            margins,
            fill,
            output,
        )
        .with_context(|| format!("Pivot of '{}' failed", file.display())),

        Commands::Sales {
            file,
            chart,
            output,
        } => cli::sales(&facade, file.clone(), chart, output)
            .with_context(|| format!("Sales analysis of '{}' failed", file.display())),

        Commands::Inventory {
            file,
            chart,
            output,
        } => cli::inventory(&facade, file.clone(), chart, output)
            .with_context(|| format!("Inventory analysis of '{}' failed", file.display())),

        Commands::SalesPivot {
            file,
            rows,
            columns,
            value,
            agg,
            output,
        } => cli::sales_pivot(&facade, file.clone(), rows, columns, value, agg, output)
            .with_context(|| format!("Sales pivot of '{}' failed", file.display())),
    }
}
