use std::fs::File;
use std::path::{Path, PathBuf};

use agrihanda::{
    config::Config,
    formatters::{CSVFormatter, JsonRowsFormatter, OutputFormatter, OutputGenerator},
    label::Level,
    query::Lookup,
    search::{CaseSensitivity, LabelSearchParams, LevelFilter, MatchType, SearchConfig},
    selection::Selection,
    Agrihanda, COL,
};
use anyhow::{anyhow, Context};
use clap::{command, Args, Parser, Subcommand};
use enum_dispatch::enum_dispatch;
use log::{debug, info};
use nonempty::NonEmpty;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use spinners::{Spinner, Spinners};
use strum_macros::EnumString;

use crate::display::{
    display_key_values, display_labels, display_library, display_options, display_row,
    display_run_report, display_summary, print_labels_count,
};
use crate::error::AgrihandaCliResult;

const DEFAULT_PROGRESS_SPINNER: Spinners = Spinners::Dots;
const COMPLETE_PROGRESS_STRING: &str = "✔";
const RUNNING_TAIL_STRING: &str = "...";
const LOADING_TABLES_STRING: &str = "Loading cleaned tables";
const DEFAULT_MAX_LABELS: usize = 50;

/// Defines the formats a barangay row can be printed in.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, EnumString, PartialEq, Eq)]
#[strum(ascii_case_insensitive)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl From<&OutputFormat> for Option<OutputFormatter> {
    fn from(value: &OutputFormat) -> Self {
        match value {
            OutputFormat::Table => None,
            OutputFormat::Json => Some(OutputFormatter::JsonRows(JsonRowsFormatter)),
            OutputFormat::Csv => Some(OutputFormatter::Csv(CSVFormatter)),
        }
    }
}

fn write_output<T, U>(
    output_generator: T,
    mut data: DataFrame,
    output_file: Option<U>,
) -> AgrihandaCliResult<()>
where
    T: OutputGenerator,
    U: AsRef<Path>,
{
    if let Some(output_file) = output_file {
        let mut f = File::create(output_file).context("Failed to write output")?;
        output_generator.save(&mut f, &mut data)?;
    } else {
        let mut stdout_lock = std::io::stdout().lock();
        output_generator.save(&mut stdout_lock, &mut data)?;
    };
    Ok(())
}

fn start_spinner(quiet: bool, message: &str) -> Option<Spinner> {
    (!quiet).then(|| {
        Spinner::with_timer(
            DEFAULT_PROGRESS_SPINNER,
            message.to_string() + RUNNING_TAIL_STRING,
        )
    })
}

fn stop_spinner(spinner: Option<Spinner>) {
    if let Some(mut s) = spinner {
        s.stop_with_symbol(COMPLETE_PROGRESS_STRING);
    }
}

/// Reads the cleaned tables with a spinner, returning the loaded handle.
fn load(config: Config, quiet: bool) -> AgrihandaCliResult<Agrihanda> {
    let sp = start_spinner(quiet, LOADING_TABLES_STRING);
    let mut agrihanda = Agrihanda::new_with_config(config);
    agrihanda.tables()?;
    stop_spinner(sp);
    Ok(agrihanda)
}

/// Trait that defines what to run when a given subcommand is invoked.
#[enum_dispatch]
pub trait RunCommand {
    fn run(&self, config: Config) -> AgrihandaCliResult<()>;
}

/// The `clean` command reads the element-group workbooks and writes the cleaned tables.
#[derive(Args, Debug)]
pub struct CleanCommand {
    #[arg(short = 'i', long, help = "Directory holding the input workbooks")]
    input: Option<PathBuf>,
    #[arg(short = 'o', long, help = "Directory to write the cleaned tables to")]
    output: Option<PathBuf>,
    #[arg(long, help = "Do not write one sub-table per library entry")]
    no_divided: bool,
    #[arg(from_global)]
    quiet: bool,
}

impl CleanCommand {
    fn apply(&self, mut config: Config) -> Config {
        if let Some(input) = &self.input {
            config.input_dir = input.clone();
        }
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if self.no_divided {
            config.write_divided = false;
        }
        config
    }
}

impl RunCommand for CleanCommand {
    fn run(&self, config: Config) -> AgrihandaCliResult<()> {
        info!("Running `clean` subcommand");
        let config = self.apply(config);
        let sp = start_spinner(self.quiet, "Cleaning element groups");
        let mut agrihanda = Agrihanda::new_with_config(config);
        let report = agrihanda.clean()?;
        stop_spinner(sp);
        display_run_report(&report);
        Ok(())
    }
}

#[derive(Debug, Clone, clap::ValueEnum, Copy)]
enum MatchTypeArgs {
    Regex,
    Exact,
    Contains,
    Startswith,
}

impl From<MatchTypeArgs> for MatchType {
    fn from(value: MatchTypeArgs) -> Self {
        match value {
            MatchTypeArgs::Exact => MatchType::Exact,
            MatchTypeArgs::Regex => MatchType::Regex,
            MatchTypeArgs::Contains => MatchType::Contains,
            MatchTypeArgs::Startswith => MatchType::Startswith,
        }
    }
}

#[derive(Debug, Clone, clap::ValueEnum, Copy)]
enum CaseSensitivityArgs {
    Sensitive,
    Insensitive,
}

impl From<CaseSensitivityArgs> for CaseSensitivity {
    fn from(value: CaseSensitivityArgs) -> Self {
        match value {
            CaseSensitivityArgs::Insensitive => CaseSensitivity::Insensitive,
            CaseSensitivityArgs::Sensitive => CaseSensitivity::Sensitive,
        }
    }
}

/// Command-line arguments that can be parsed into `LabelSearchParams`. Each level takes any number
/// of values.
#[derive(Args, Debug, Clone)]
pub struct LabelSearchArgs {
    #[arg(long, help = "Filter by sector", num_args = 0..)]
    sector: Vec<String>,
    #[arg(long, help = "Filter by element", num_args = 0..)]
    element: Vec<String>,
    #[arg(long, help = "Filter by hazard", num_args = 0..)]
    hazard: Vec<String>,
    #[arg(long, help = "Filter by disaster risk aspect", num_args = 0..)]
    aspect: Vec<String>,
    #[arg(long, help = "Filter by detail", num_args = 0..)]
    detail: Vec<String>,
    #[arg(long, help = "Include the barangay name column in the results")]
    include_barangay: bool,
    #[arg(
        value_enum,
        short = 'm',
        long,
        value_name = "MATCH_TYPE",
        help = "Type of matching to perform on the level filters",
        default_value_t = MatchTypeArgs::Exact
    )]
    match_type: MatchTypeArgs,
    #[arg(
        value_enum,
        long,
        value_name = "CASE_SENSITIVITY",
        help = "Type of case sensitivity used in matching on the level filters",
        default_value_t = CaseSensitivityArgs::Insensitive
    )]
    case_sensitivity: CaseSensitivityArgs,
}

impl From<LabelSearchArgs> for LabelSearchParams {
    fn from(args: LabelSearchArgs) -> Self {
        let config = SearchConfig {
            match_type: args.match_type.into(),
            case_sensitivity: args.case_sensitivity.into(),
        };
        let filters = [
            (Level::Sector, args.sector),
            (Level::Element, args.element),
            (Level::Hazard, args.hazard),
            (Level::Aspect, args.aspect),
            (Level::Detail, args.detail),
        ]
        .into_iter()
        .filter_map(|(level, values)| {
            NonEmpty::from_vec(values).map(|values| LevelFilter {
                level,
                values,
                config: config.clone(),
            })
        })
        .collect();
        Self {
            filters,
            include_barangay: args.include_barangay,
        }
    }
}

/// The `labels` command lists the column labels of the cleaned tables. Multiple filters are
/// applied conjunctively.
#[derive(Args, Debug)]
pub struct LabelsCommand {
    #[command(flatten)]
    search_args: LabelSearchArgs,
    #[arg(short, long, help = "Show all labels even if there are a large number")]
    full: bool,
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for LabelsCommand {
    fn run(&self, config: Config) -> AgrihandaCliResult<()> {
        info!("Running `labels` subcommand");
        let mut agrihanda = load(config, self.quiet)?;
        let params: LabelSearchParams = self.search_args.clone().into();
        let results = agrihanda.search(params)?;
        let max_results = (!self.full).then_some(DEFAULT_MAX_LABELS);
        display_labels(&results, max_results)?;
        print_labels_count(
            max_results.map_or(results.len(), |max| max.min(results.len())),
            results.len(),
        );
        Ok(())
    }
}

/// The `row` command prints every value of one barangay.
#[derive(Args, Debug)]
pub struct RowCommand {
    #[arg(help = "Barangay ID")]
    bid: i64,
    #[arg(
        short = 'f',
        long,
        value_name = "table|json|csv",
        default_value = "table",
        help = "Output format for the row"
    )]
    format: OutputFormat,
    #[arg(short = 'o', long, help = "Output file to place the row (json and csv only)")]
    output_file: Option<String>,
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for RowCommand {
    fn run(&self, config: Config) -> AgrihandaCliResult<()> {
        info!("Running `row` subcommand");
        let mut agrihanda = load(config, self.quiet)?;
        let tables = agrihanda.tables()?;
        let formatter: Option<OutputFormatter> = (&self.format).into();
        match (formatter, tables.hierarchical.get_row(self.bid)) {
            (_, Lookup::Unknown) => println!("Barangay {} is not in the cleaned tables", self.bid),
            (None, Lookup::Known(row)) => display_row(&row, &tables.label_index),
            (Some(formatter), Lookup::Known(_)) => {
                let data = tables
                    .flat
                    .frame()
                    .clone()
                    .lazy()
                    .filter(col(COL::BID).eq(lit(self.bid)))
                    .collect()?;
                debug!("{data:#?}");
                write_output(formatter, data, self.output_file.as_deref())?;
            }
        }
        Ok(())
    }
}

/// The `percentile` command ranks one barangay's value of a numeric column among all barangays.
#[derive(Args, Debug)]
pub struct PercentileCommand {
    #[arg(help = "Barangay ID")]
    bid: i64,
    #[arg(help = "Flat key of a numeric column, e.g. from `agrihanda labels`")]
    flat_key: String,
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for PercentileCommand {
    fn run(&self, config: Config) -> AgrihandaCliResult<()> {
        info!("Running `percentile` subcommand");
        let mut agrihanda = load(config, self.quiet)?;
        let tables = agrihanda.tables()?;
        let label = tables
            .label_index
            .label(&self.flat_key)
            .ok_or_else(|| anyhow!("No column with flat key '{}'", self.flat_key))?;
        let value = tables.hierarchical.get_value(self.bid, label);
        let percentile = tables.hierarchical.percentile_of(self.bid, label);
        println!("{}: {value}, percentile {percentile}", self.flat_key);
        Ok(())
    }
}

/// The `library` command lists every (sector, element, hazard) combination with its sheet ID.
#[derive(Args, Debug)]
pub struct LibraryCommand {
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for LibraryCommand {
    fn run(&self, config: Config) -> AgrihandaCliResult<()> {
        info!("Running `library` subcommand");
        let mut agrihanda = load(config, self.quiet)?;
        display_library(&agrihanda.tables()?.library);
        Ok(())
    }
}

/// The `select` command chooses a column one level at a time. Pass the choices made so far to see
/// the options for the next level, or the flat key once all five levels are chosen.
#[derive(Args, Debug)]
pub struct SelectCommand {
    #[arg(help = "Values chosen so far, broadest level first")]
    values: Vec<String>,
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for SelectCommand {
    fn run(&self, config: Config) -> AgrihandaCliResult<()> {
        info!("Running `select` subcommand");
        let mut agrihanda = load(config, self.quiet)?;
        let index = &agrihanda.tables()?.label_index;
        let selection = Selection::walk(&self.values, index)?;
        match (selection.flat_key(), selection.next_level()) {
            (Some(flat_key), _) => println!("{flat_key}"),
            (None, Some(level)) => display_options(level, &selection.options(index)),
            (None, None) => {}
        }
        Ok(())
    }
}

/// The `summary` command describes one barangay. With an element and a hazard it shows the key
/// categories and scores of that combination instead.
#[derive(Args, Debug)]
pub struct SummaryCommand {
    #[arg(help = "Barangay ID")]
    bid: i64,
    #[arg(short, long, requires = "hazard", help = "Element to show key scores for")]
    element: Option<String>,
    #[arg(short = 'z', long, requires = "element", help = "Hazard to show key scores for")]
    hazard: Option<String>,
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for SummaryCommand {
    fn run(&self, config: Config) -> AgrihandaCliResult<()> {
        info!("Running `summary` subcommand");
        let mut agrihanda = load(config, self.quiet)?;
        let Lookup::Known(summary) = agrihanda.summary(self.bid)? else {
            println!("Barangay {} is not in the cleaned tables", self.bid);
            return Ok(());
        };
        match (&self.element, &self.hazard) {
            (Some(element), Some(hazard)) => display_key_values(&summary, element, hazard),
            _ => display_summary(&summary),
        }
        Ok(())
    }
}

/// The entrypoint for the CLI.
#[derive(Parser, Debug)]
#[command(version, about="Agrihanda cleans and queries agricultural disaster-risk data for barangays", long_about = None, name="agrihanda")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
    #[arg(
        short = 'q',
        long = "quiet",
        help = "\
            Do not print progress bar to stdout. Results and logs (when `RUST_LOG` is set)\n\
            will still be printed.",
        global = true
    )]
    quiet: bool,
}

/// Commands contains the list of subcommands avaliable for use in the CLI.
/// Each command should implmement the RunCommand trait and specify the list
/// of required args for that command.
#[derive(Subcommand, Debug)]
#[enum_dispatch(RunCommand)]
pub enum Commands {
    /// Clean the element-group workbooks and write the output tables
    Clean(CleanCommand),
    /// List and filter the column labels of the cleaned tables
    Labels(LabelsCommand),
    /// Print every value of one barangay
    Row(RowCommand),
    /// Percentile of one barangay's value in a numeric column
    Percentile(PercentileCommand),
    /// List the (sector, element, hazard) library
    Library(LibraryCommand),
    /// Choose a column level by level
    Select(SelectCommand),
    /// Summarise one barangay
    Summary(SummaryCommand),
}
