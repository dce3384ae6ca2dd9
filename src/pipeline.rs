use log::{debug, info};

use election_model::*;
use snafu::{prelude::*, Snafu};

use std::collections::HashSet;
use std::fs;
use std::io::Write;

use text_diff::print_diff;

pub mod config_reader;
pub mod io_kml;
pub mod io_results;

#[derive(Debug, Snafu)]
pub enum PipelineError {
    #[snafu(display("Error opening results directory {path}"))]
    OpeningResultsDir {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Result file name {name} is not of the form PROV_DISTRICT.csv"))]
    BadResultFileName { name: String },
    #[snafu(display("Error opening result file {path}"))]
    OpeningCsv { source: csv::Error, path: String },
    #[snafu(display("Error reading a result row in {path}"))]
    CsvLineParse { source: csv::Error, path: String },
    #[snafu(display("Result file {path} is missing a field at line {lineno}"))]
    CsvLineTooShort { path: String, lineno: usize },
    #[snafu(display("Bad vote count at line {lineno} of {path}"))]
    BadVoteCount {
        source: std::num::ParseIntError,
        path: String,
        lineno: usize,
    },
    #[snafu(display("Error opening boundary file {path}"))]
    OpeningKml {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening configuration file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing configuration file {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error writing {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing the ranking table"))]
    WritingCsv { source: csv::Error },
    #[snafu(display("{source}"))]
    Model { source: ModelError },
    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Annotates a boundary file with the styles of the winning parties.
pub fn run_annotate(
    results_dir: String,
    boundaries: String,
    out: String,
    config_path: Option<String>,
    districts: &[String],
    reference: Option<String>,
) -> PipelineResult<()> {
    let run = config_reader::load_config(config_path)?;
    let config = run.election;
    info!("Loading the {} election results", config.year);

    let rows = io_results::read_results_dir(&results_dir)?;
    let store = ResultStore::from_rows(&rows, &config).merge_subdivisions();
    let styles = StyleRegistry::from_config(&config);
    let scope = scope_filter(effective_scope(districts, &run.scope));

    let lines = io_kml::read_lines(&boundaries)?;
    info!("Annotating {} ({} lines)", boundaries, lines.len());
    let annotator = BoundaryAnnotator::new(&store, &styles, scope.as_ref());
    let annotated = annotator.annotate(&lines);

    io_kml::write_document(&out, &annotated)?;
    info!("Wrote annotated boundaries to {}", out);

    if let Some(reference_path) = reference {
        let reference_doc = io_kml::read_document(&reference_path)?;
        if reference_doc != annotated {
            print_diff(reference_doc.as_str(), annotated.as_str(), "\n");
            whatever!("Difference detected between the annotated boundaries and the reference file")
        }
        info!("Annotated boundaries match the reference file");
    }

    Ok(())
}

/// Ranks ridings by margin for the target party and writes the table in CSV
/// format to the given path, or to the standard output.
pub fn run_tipping(
    results_dir: String,
    party: Option<String>,
    out: Option<String>,
    config_path: Option<String>,
    districts: &[String],
) -> PipelineResult<()> {
    let run = config_reader::load_config(config_path)?;
    let config = run.election;
    let party = match party.or(run.target_party) {
        Some(party) => party,
        None => whatever!(
            "No target party given, either with --party or in the configuration file"
        ),
    };
    let target = config.party_id(&party).context(ModelSnafu)?;
    info!("Loading the {} election results", config.year);

    let rows = io_results::read_results_dir(&results_dir)?;
    let store = ResultStore::from_rows(&rows, &config).merge_subdivisions();
    let mut rollups = store.district_rollup(&config);
    if let Some(scope) = scope_filter(effective_scope(districts, &run.scope)) {
        rollups.retain(|code, _| scope.contains(code));
    }

    let ranking = rank_tipping_point(&rollups, target, &config);
    write_tipping_table(&ranking, &config, out)
}

// The command line scope wins over the configuration file's.
fn effective_scope<'a>(cli: &'a [String], file: &'a [String]) -> &'a [String] {
    if cli.is_empty() {
        file
    } else {
        cli
    }
}

fn scope_filter(districts: &[String]) -> Option<HashSet<DistrictCode>> {
    if districts.is_empty() {
        None
    } else {
        Some(districts.iter().map(|d| DistrictCode(d.clone())).collect())
    }
}

fn write_tipping_table(
    ranking: &[TippingRow],
    config: &ElectionConfig,
    out: Option<String>,
) -> PipelineResult<()> {
    let sink: Box<dyn Write> = match out {
        Some(path) if path != "stdout" => {
            let file = fs::File::create(&path).context(WritingOutputSnafu { path })?;
            Box::new(file)
        }
        _ => Box::new(std::io::stdout()),
    };
    let mut writer = csv::Writer::from_writer(sink);
    writer
        .write_record([
            "Index",
            "DistrictCode",
            "WinningParty",
            "TargetPartyMargin",
            "TargetPartyVotePercentage",
            "Category",
        ])
        .context(WritingCsvSnafu {})?;
    for row in ranking {
        debug!("tipping row: {:?}", row);
        writer
            .write_record([
                row.index.to_string(),
                row.district.to_string(),
                config.party(row.winner).label.clone(),
                row.margin.to_string(),
                row.vote_share.to_string(),
                row.category.to_string(),
            ])
            .context(WritingCsvSnafu {})?;
    }
    writer.flush().map_err(csv::Error::from).context(WritingCsvSnafu {})?;
    Ok(())
}
