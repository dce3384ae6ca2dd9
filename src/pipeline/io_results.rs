// Primitives for reading the per-riding poll-by-poll result files.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use log::{debug, info};
use snafu::prelude::*;

use election_model::{Disposition, ResultRow};

use crate::pipeline::*;

// Positional columns of the poll-by-poll format.
const COL_DISTRICT_NAME: usize = 1;
const COL_STATION_CODE: usize = 3;
const COL_STATION_NAME: usize = 4;
const COL_VOID: usize = 5;
const COL_MERGED: usize = 7;
const COL_PARTY_NAME: usize = 13;
const COL_VOTES: usize = 17;

/// Reads every result file of a directory. The files are named
/// `PROV_DISTRICT.csv`; the province and district codes only exist in the
/// file names, not in the rows.
pub fn read_results_dir(dir: &str) -> PipelineResult<Vec<ResultRow>> {
    let entries = fs::read_dir(dir).context(OpeningResultsDirSnafu { path: dir })?;
    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.context(OpeningResultsDirSnafu { path: dir })?;
        let path = entry.path();
        if path.extension().map_or(false, |ext| ext == "csv") {
            paths.push(path);
        }
    }
    // Directory listing order is not deterministic.
    paths.sort();

    let mut rows: Vec<ResultRow> = Vec::new();
    for path in paths {
        let path_str = path.as_path().display().to_string();
        let (province, district_code) = split_file_name(&path)?;
        debug!("Reading result file {:?}", path_str);
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .context(OpeningCsvSnafu {
                path: path_str.clone(),
            })?;
        rows.extend(read_result_file(
            reader,
            &province,
            &district_code,
            &path_str,
        )?);
    }
    info!("Loaded {} result rows from {}", rows.len(), dir);
    Ok(rows)
}

/// Decodes the rows of one riding's file. The first line holds headers.
pub fn read_result_file<R: Read>(
    reader: csv::Reader<R>,
    province: &str,
    district_code: &str,
    path: &str,
) -> PipelineResult<Vec<ResultRow>> {
    let mut res: Vec<ResultRow> = Vec::new();
    let mut records = reader.into_records();
    // Skip the header line.
    _ = records.next();

    for (idx, record) in records.enumerate() {
        let lineno = idx + 2;
        let record = record.context(CsvLineParseSnafu { path })?;
        let field = |col: usize| -> PipelineResult<&str> {
            record.get(col).context(CsvLineTooShortSnafu { path, lineno })
        };

        let voided = field(COL_VOID)?.trim() == "Y";
        let merged_away = !field(COL_MERGED)?.trim().is_empty();
        let disposition = if merged_away {
            Disposition::MergedAway
        } else if voided {
            Disposition::Void
        } else {
            Disposition::Counted
        };

        // The vote count of a skipped station is not decoded: some of these
        // rows carry blank counts.
        let votes = if matches!(disposition, Disposition::Counted) {
            field(COL_VOTES)?
                .trim()
                .parse::<u64>()
                .context(BadVoteCountSnafu { path, lineno })?
        } else {
            0
        };

        res.push(ResultRow {
            province: province.to_string(),
            district_code: district_code.to_string(),
            district_name: field(COL_DISTRICT_NAME)?.to_string(),
            station_code: field(COL_STATION_CODE)?.trim().to_string(),
            station_name: field(COL_STATION_NAME)?.to_string(),
            party_name: field(COL_PARTY_NAME)?.to_string(),
            disposition,
            votes,
        });
    }
    Ok(res)
}

// "ON_35001.csv" -> ("ON", "35001")
fn split_file_name(path: &Path) -> PipelineResult<(String, String)> {
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .context(BadResultFileNameSnafu {
            name: path.display().to_string(),
        })?;
    match name.split_once('_') {
        Some((province, district)) if !province.is_empty() && !district.is_empty() => {
            Ok((province.trim().to_string(), district.trim().to_string()))
        }
        _ => BadResultFileNameSnafu { name }.fail(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(contents: &str) -> csv::Reader<&[u8]> {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(contents.as_bytes())
    }

    // 18 columns, the shape of the real files.
    fn line(station: &str, void: &str, merged: &str, party: &str, votes: &str) -> String {
        let mut cols = vec![""; 18];
        cols[COL_DISTRICT_NAME] = "Somewhere";
        cols[COL_STATION_CODE] = station;
        cols[COL_STATION_NAME] = "Some Hall";
        cols[COL_VOID] = void;
        cols[COL_MERGED] = merged;
        cols[COL_PARTY_NAME] = party;
        cols[COL_VOTES] = votes;
        cols.join(",")
    }

    fn header() -> String {
        let cols = vec!["h"; 18];
        cols.join(",")
    }

    #[test]
    fn rows_are_decoded_with_codes_from_the_file_name() {
        let contents = format!("{}\n{}\n", header(), line("30A", "", "", "Liberal", "12"));
        let rows = read_result_file(reader(&contents), "ON", "35001", "test").unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.province, "ON");
        assert_eq!(row.district_code, "35001");
        assert_eq!(row.station_code, "30A");
        assert_eq!(row.party_name, "Liberal");
        assert_eq!(row.votes, 12);
        assert!(matches!(row.disposition, Disposition::Counted));
    }

    #[test]
    fn void_and_merged_markers_set_the_disposition() {
        let contents = format!(
            "{}\n{}\n{}\n",
            header(),
            line("1", "Y", "", "Liberal", ""),
            line("2", "", "45", "Liberal", "")
        );
        let rows = read_result_file(reader(&contents), "ON", "35001", "test").unwrap();
        assert!(matches!(rows[0].disposition, Disposition::Void));
        assert!(matches!(rows[1].disposition, Disposition::MergedAway));
        // The blank counts of skipped stations do not fail the decode.
        assert_eq!(rows[0].votes, 0);
        assert_eq!(rows[1].votes, 0);
    }

    #[test]
    fn a_bad_vote_count_on_a_counted_row_is_fatal() {
        let contents = format!("{}\n{}\n", header(), line("1", "", "", "Liberal", "abc"));
        let res = read_result_file(reader(&contents), "ON", "35001", "test");
        assert!(matches!(res, Err(PipelineError::BadVoteCount { .. })));
    }

    #[test]
    fn a_short_row_is_fatal() {
        let contents = format!("{}\na,b,c\n", header());
        let res = read_result_file(reader(&contents), "ON", "35001", "test");
        assert!(res.is_err());
    }

    #[test]
    fn file_names_split_into_province_and_district() {
        let (province, district) = split_file_name(Path::new("/tmp/ON_35001.csv")).unwrap();
        assert_eq!(province, "ON");
        assert_eq!(district, "35001");
        assert!(split_file_name(Path::new("/tmp/nodash.csv")).is_err());
    }
}
