use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use foundation::ids::TractId;
use foundation::toggles::{IndicatorMode, InvestorCategory, NarrativeSection, Year};
use loader::{DataSource, FilesystemSource, HttpSource, LoadReport, Loader, LoaderConfig};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use views::{AtlasState, SelectionView, StateSnapshot, TractSelection};

#[derive(Parser, Debug)]
#[command(
    name = "tractscope",
    version,
    about = "Load tract datasets and print the derived views as JSON"
)]
struct Cli {
    #[command(flatten)]
    source: SourceArgs,

    /// Exit non-zero when tract statistics or census rows could not be loaded
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Directory holding the datasets
    #[arg(long, global = true, conflicts_with = "base_url")]
    data_dir: Option<PathBuf>,

    /// Base URL the datasets are served under
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Tract statistics CSV (overrides TRACTSCOPE_TABULAR)
    #[arg(long, global = true)]
    tabular: Option<String>,

    /// Neighborhood GeoJSON (overrides TRACTSCOPE_NEIGHBORHOODS)
    #[arg(long, global = true)]
    neighborhoods: Option<String>,

    /// Tract boundary GeoJSON (overrides TRACTSCOPE_TRACTS)
    #[arg(long, global = true)]
    tracts: Option<String>,

    /// Census CSV (overrides TRACTSCOPE_CENSUS)
    #[arg(long, global = true)]
    census: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the load report
    Report,

    /// Apply filters and selections, then print the derived views
    Views(ViewArgs),

    /// Print a normalized boundary collection as GeoJSON
    Geometry {
        #[arg(value_enum)]
        layer: GeometryLayer,

        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct ViewArgs {
    #[arg(long)]
    year: Option<Year>,

    #[arg(long)]
    category: Option<InvestorCategory>,

    #[arg(long)]
    indicator: Option<IndicatorMode>,

    #[arg(long)]
    section: Option<NarrativeSection>,

    /// Tract to select in the investor view (repeatable)
    #[arg(long = "select", value_name = "TRACT")]
    primary: Vec<String>,

    /// Tract to select in the indicator view (repeatable)
    #[arg(long = "select-secondary", value_name = "TRACT")]
    secondary: Vec<String>,

    /// Include the per-year trajectory table
    #[arg(long)]
    trajectories: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum GeometryLayer {
    Tracts,
    Neighborhoods,
}

#[derive(Debug)]
enum CliError {
    NoSource,
    InvalidTractId(String),
    LoadFailed(LoadReport),
    Runtime(io::Error),
    Io { path: Option<PathBuf>, source: io::Error },
    Json(serde_json::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::NoSource => write!(f, "one of --data-dir or --base-url is required"),
            CliError::InvalidTractId(raw) => write!(f, "{raw:?} contains no tract digits"),
            CliError::LoadFailed(report) => write!(
                f,
                "load incomplete (tabular: {:?}, census: {:?})",
                report.tabular, report.census
            ),
            CliError::Runtime(e) => write!(f, "failed to start runtime: {e}"),
            CliError::Io { path: Some(p), source } => write!(f, "write {}: {source}", p.display()),
            CliError::Io { path: None, source } => write!(f, "write stdout: {source}"),
            CliError::Json(e) => write!(f, "json: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Runtime(e) | CliError::Io { source: e, .. } => Some(e),
            CliError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Json(e)
    }
}

#[derive(Serialize)]
struct ViewsOutput<'a> {
    report: &'a LoadReport,
    #[serde(flatten)]
    views: StateSnapshot,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    if let Err(e) = real_main() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let source = open_source(&cli.source)?;
    let config = loader_config(&cli.source);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    let state = AtlasState::new();
    let loader = Loader::new(source, config);
    let report = runtime.block_on(loader.load_into(&state));

    if !report.succeeded() {
        if cli.strict {
            return Err(CliError::LoadFailed(report));
        }
        warn!("continuing with partial data");
    }

    match cli.command {
        Command::Report => write_json(&report, None),
        Command::Views(args) => cmd_views(&state, &report, args),
        Command::Geometry { layer, out } => {
            let collection = match layer {
                GeometryLayer::Tracts => state.tract_boundaries().get(),
                GeometryLayer::Neighborhoods => state.neighborhoods().get(),
            };
            write_json(&collection.to_value(), out)
        }
    }
}

fn open_source(args: &SourceArgs) -> Result<Arc<dyn DataSource>, CliError> {
    match (&args.data_dir, &args.base_url) {
        (Some(dir), _) => Ok(Arc::new(FilesystemSource::new(dir))),
        (None, Some(url)) => Ok(Arc::new(HttpSource::new(url.clone()))),
        (None, None) => Err(CliError::NoSource),
    }
}

fn loader_config(args: &SourceArgs) -> LoaderConfig {
    let mut config = LoaderConfig::from_env();
    if let Some(name) = &args.tabular {
        config.tabular = name.clone();
    }
    if let Some(name) = &args.neighborhoods {
        config.neighborhoods = name.clone();
    }
    if let Some(name) = &args.tracts {
        config.tracts = name.clone();
    }
    if let Some(name) = &args.census {
        config.census = name.clone();
    }
    config
}

fn parse_selection(raw: &[String]) -> Result<TractSelection, CliError> {
    raw.iter()
        .map(|s| TractId::normalize(s).ok_or_else(|| CliError::InvalidTractId(s.clone())))
        .collect()
}

fn cmd_views(state: &AtlasState, report: &LoadReport, args: ViewArgs) -> Result<(), CliError> {
    if let Some(year) = args.year {
        state.set_year(year);
    }
    if let Some(category) = args.category {
        state.set_investor_category(category);
    }
    if let Some(mode) = args.indicator {
        state.set_indicator_mode(mode);
    }
    if let Some(section) = args.section {
        state.set_section(section);
    }
    state.set_selection(SelectionView::Primary, parse_selection(&args.primary)?);
    state.set_selection(SelectionView::Secondary, parse_selection(&args.secondary)?);

    let mut views = state.snapshot();
    if !args.trajectories {
        views.investor_scatter.trajectories.clear();
    }
    info!(
        points = views.investor_scatter.points.len(),
        indicator_points = views.indicator_scatter.points.len(),
        "views ready"
    );
    write_json(&ViewsOutput { report, views }, None)
}

fn write_json<T: Serialize>(value: &T, out: Option<PathBuf>) -> Result<(), CliError> {
    let mut payload = serde_json::to_string_pretty(value)?;
    payload.push('\n');
    match out {
        Some(path) => {
            fs::write(&path, payload).map_err(|source| CliError::Io {
                path: Some(path.clone()),
                source,
            })?;
            eprintln!("wrote {}", path.display());
            Ok(())
        }
        None => io::stdout()
            .lock()
            .write_all(payload.as_bytes())
            .map_err(|source| CliError::Io { path: None, source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn toggles_parse_from_literals() {
        let cli = Cli::try_parse_from([
            "tractscope",
            "--data-dir",
            "data",
            "views",
            "--year",
            "2021",
            "--category",
            "small",
            "--indicator",
            "median_price_diff",
            "--select",
            "25025010100",
        ])
        .unwrap();
        let Command::Views(args) = cli.command else {
            panic!("expected views");
        };
        assert_eq!(args.year, Some(Year::Y2021));
        assert_eq!(args.category, Some(InvestorCategory::Small));
        assert_eq!(args.indicator, Some(IndicatorMode::MedianPriceDiff));
        assert_eq!(args.primary, vec!["25025010100".to_string()]);
    }

    #[test]
    fn unknown_toggle_is_rejected() {
        assert!(Cli::try_parse_from(["tractscope", "views", "--year", "2019"]).is_err());
    }

    #[test]
    fn selections_must_contain_digits() {
        let ok = parse_selection(&["1400000US25025010100".to_string()]).unwrap();
        assert_eq!(ok.len(), 1);
        assert!(matches!(
            parse_selection(&["tract".to_string()]),
            Err(CliError::InvalidTractId(_))
        ));
    }

    #[test]
    fn resource_flags_override_config() {
        let cli = Cli::try_parse_from(["tractscope", "--tracts", "t.geojson", "report"]).unwrap();
        assert_eq!(loader_config(&cli.source).tracts, "t.geojson");
        assert!(matches!(open_source(&cli.source), Err(CliError::NoSource)));
    }
}
