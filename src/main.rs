use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

mod config;
mod error;
mod logging;
mod services;
pub mod models;

use config::Config;
use error::AppError;
use models::Table;
use services::analysis::{ColumnClassifier, Report};
use services::ranges::{derive_range_columns, ParseDiagnostics, RangeParser};
use services::{loader, plot, report};

#[derive(Parser, Debug)]
#[command(name = "ad_stats")]
#[command(about = "Descriptive statistics and quick plots for ad archive CSV exports")]
#[command(version)]
struct Cli {
    /// JSON config file; flags below override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Range-encoded column to split into _lower/_upper (repeatable, replaces the defaults)
    #[arg(long = "range-column", global = true)]
    range_columns: Vec<String>,

    /// Identifier column to leave out of the summary (repeatable)
    #[arg(long = "id-column", global = true)]
    id_columns: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarize every column as numeric or categorical
    Stats(StatsArgs),
    /// Histogram of one column and a boxplot of another grouped by a third
    Plot(PlotArgs),
}

#[derive(Args, Debug)]
struct StatsArgs {
    /// Path to the ads CSV file
    csv: PathBuf,

    /// Emit the full report as JSON
    #[arg(long)]
    json: bool,

    /// Number of most frequent values listed per categorical column
    #[arg(long)]
    top: Option<usize>,
}

#[derive(Args, Debug)]
struct PlotArgs {
    /// Path to the ads CSV file
    csv: PathBuf,

    #[arg(long, default_value = "impressions_lower")]
    hist_column: String,

    #[arg(long)]
    bins: Option<usize>,

    /// Linear instead of log-scaled bar lengths
    #[arg(long)]
    no_log: bool,

    #[arg(long, default_value = "spend_upper")]
    box_column: String,

    #[arg(long, default_value = "publisher_platforms")]
    group_by: String,

    /// Emit the plot data as JSON
    #[arg(long)]
    json: bool,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    logging::init_logging()?;

    let cli = Cli::parse();
    let mut config = config::load_config(cli.config.as_deref())?;
    if !cli.range_columns.is_empty() {
        config.range_columns = cli.range_columns;
    }
    config.id_columns.extend(cli.id_columns);

    let app = App::new(config);
    let output = match cli.command {
        Command::Stats(args) => app.stats(&args)?,
        Command::Plot(args) => app.plot(&args)?,
    };
    print!("{}", output);

    Ok(())
}

struct App {
    config: Config,
}

impl App {
    fn new(config: Config) -> Self {
        Self { config }
    }

    /// Loads the CSV and appends the derived range columns.
    fn working_table(&self, path: &Path) -> Result<(Table, ParseDiagnostics), AppError> {
        let mut table = loader::load_csv(path, &self.config)?;
        let parser = RangeParser::new(&self.config);
        let diagnostics = derive_range_columns(&mut table, &parser, &self.config.range_columns);
        Ok((table, diagnostics))
    }

    fn analyze(&self, path: &Path) -> Result<Report, AppError> {
        let (table, diagnostics) = self.working_table(path)?;
        Ok(ColumnClassifier::new(&self.config).report(&table, diagnostics))
    }

    fn stats(mut self, args: &StatsArgs) -> Result<String, AppError> {
        if let Some(top) = args.top {
            self.config.top_n = top;
        }
        self.config.validate()?;

        let summary = self.analyze(&args.csv)?;
        if args.json {
            let mut json = report::render_json(&summary)?;
            json.push('\n');
            Ok(json)
        } else {
            Ok(report::render_text(&summary))
        }
    }

    fn plot(self, args: &PlotArgs) -> Result<String, AppError> {
        self.config.validate()?;
        let (table, _) = self.working_table(&args.csv)?;

        let bins = args.bins.unwrap_or(self.config.histogram_bins);
        let hist = plot::histogram(&table, &args.hist_column, bins, !args.no_log)?;
        let boxes = plot::boxplot(&table, &args.box_column, &args.group_by)?;

        if args.json {
            let value = serde_json::json!({ "histogram": hist, "boxplot": boxes });
            let mut json = serde_json::to_string_pretty(&value)?;
            json.push('\n');
            Ok(json)
        } else {
            Ok(format!(
                "{}\n{}",
                plot::render_histogram(&hist),
                plot::render_boxplot(&boxes)
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ADS: &str = "\
id,page_name,publisher_platforms,impressions,spend,estimated_audience_size
1,Acme,\"['facebook', 'instagram']\",\"{'lower_bound': '1000', 'upper_bound': '1999'}\",\"{'lower_bound': '100', 'upper_bound': '199'}\",\"[10000, 50000]\"
2,Acme,\"['facebook']\",\"{'lower_bound': '5000', 'upper_bound': '5999'}\",\"{'lower_bound': '0', 'upper_bound': '99'}\",
3,Blue,\"['instagram']\",NaN,\"{'lower_bound': 'x', 'upper_bound': '99'}\",\"[1000, 5000]\"
";

    fn ads_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(ADS.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn app() -> App {
        App::new(Config {
            id_columns: vec!["id".to_string()],
            ..Config::default()
        })
    }

    #[test]
    fn test_end_to_end_report() {
        let file = ads_file();
        let report = app().analyze(file.path()).unwrap();

        assert_eq!(report.row_count, 3);
        assert!(report.get("id").is_none());
        assert!(report.get("impressions").is_none());
        assert!(report.get("spend").is_none());

        let names: Vec<&str> = report.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "page_name",
                "publisher_platforms",
                "estimated_audience_size_lower",
                "estimated_audience_size_upper",
                "impressions_lower",
                "impressions_upper",
                "spend_lower",
                "spend_upper",
            ]
        );

        let (_, impressions) = report
            .numeric()
            .find(|(name, _)| *name == "impressions_lower")
            .unwrap();
        assert_eq!(impressions.count, 2);
        assert_eq!(impressions.mean, Some(3000.0));

        let spend = &report.diagnostics.columns[2];
        assert_eq!(spend.column, "spend");
        assert_eq!(spend.malformed, 1);
    }

    #[test]
    fn test_stats_text_and_json() {
        let file = ads_file();
        let args = StatsArgs {
            csv: file.path().to_path_buf(),
            json: false,
            top: Some(1),
        };
        let text = app().stats(&args).unwrap();
        assert!(text.contains("page_name\n  • unique = 2\n  • top values:\n      'Acme'  (n=2)\n\n"));

        let args = StatsArgs { json: true, ..args };
        let json: serde_json::Value = serde_json::from_str(&app().stats(&args).unwrap()).unwrap();
        assert_eq!(json["rows"], 3);
        assert_eq!(json["numeric"]["spend_upper"]["count"], 2);
    }

    #[test]
    fn test_plot_output() {
        let file = ads_file();
        let args = PlotArgs {
            csv: file.path().to_path_buf(),
            hist_column: "impressions_lower".to_string(),
            bins: Some(4),
            no_log: false,
            box_column: "spend_upper".to_string(),
            group_by: "publisher_platforms".to_string(),
            json: true,
        };
        let json: serde_json::Value = serde_json::from_str(&app().plot(&args).unwrap()).unwrap();
        assert_eq!(json["histogram"]["bins"].as_array().unwrap().len(), 4);
        let groups = json["boxplot"]["groups"].as_array().unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0]["group"], "facebook");
        assert_eq!(groups[0]["count"], 2);
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let args = StatsArgs {
            csv: PathBuf::from("/definitely/not/here.csv"),
            json: false,
            top: None,
        };
        assert!(matches!(app().stats(&args), Err(AppError::IoError { .. })));
    }

    #[test]
    fn test_unknown_plot_column() {
        let file = ads_file();
        let args = PlotArgs {
            csv: file.path().to_path_buf(),
            hist_column: "clicks".to_string(),
            bins: None,
            no_log: true,
            box_column: "spend_upper".to_string(),
            group_by: "publisher_platforms".to_string(),
            json: false,
        };
        assert!(matches!(app().plot(&args), Err(AppError::UnknownColumn(_))));
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "ad_stats",
            "--id-column",
            "id",
            "stats",
            "ads.csv",
            "--json",
            "--top",
            "5",
        ])
        .unwrap();
        assert_eq!(cli.id_columns, vec!["id"]);
        match cli.command {
            Command::Stats(args) => {
                assert!(args.json);
                assert_eq!(args.top, Some(5));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
