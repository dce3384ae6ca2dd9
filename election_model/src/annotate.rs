//! Single-pass annotation of a polling-division boundary document (KML).
//!
//! The boundary file spreads the two identifiers of a shape over several
//! lines: a marker line names the field, the value follows in a table cell
//! on the same or a later line. No suitable parsing library exists for the
//! structure assumptions the file makes, so the annotator is a narrow
//! line-by-line pattern match, not an XML parser.

use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use std::collections::HashSet;

use crate::config::{ElectionConfig, StyleEntry, StyleRegistry};
use crate::{DistrictCode, ResultStore, StationCode};

/// Marker token of the district (riding) code field.
pub const DISTRICT_MARKER: &str = "FEDNUM";
/// Marker token of the polling station code field.
pub const STATION_MARKER: &str = "PDNUM";
/// The default style definition the registry block is inserted before.
pub const DEFAULT_STYLE_DEF: &str = "<Style id=\"PolyStyle00\">";
/// The per-shape style reference placeholder.
pub const DEFAULT_STYLE_REF: &str = "<styleUrl>#PolyStyle00</styleUrl>";

const DEFAULT_STYLE_ID: &str = "PolyStyle00";

lazy_static! {
    static ref DISTRICT_FIELD: Regex = Regex::new("<td>([0-9]{5})</td>").unwrap();
    static ref STATION_FIELD: Regex = Regex::new("<td>([0-9]{1,4})</td>").unwrap();
}

// One identifier slot of the scan. A slot is pending between its marker line
// and the line holding its value.
#[derive(Eq, PartialEq, Debug, Clone)]
enum FieldSlot {
    Empty,
    Pending,
    Captured(String),
}

/// The observable state of the shape scan.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ScanState {
    /// No identifier captured.
    Idle,
    /// District marker seen, value not yet parsed.
    AwaitDistrict,
    /// District parsed, awaiting the station marker.
    HaveDistrict,
    /// Station marker seen, value not yet parsed.
    AwaitStation,
    /// Both identifiers resolved for the current shape.
    Ready,
}

/// Tracks the district and station identifiers of the shape being scanned.
///
/// The two fields are independent slots: each is reset only when its own
/// marker re-appears, or when the shape is consumed. A shape whose fields
/// never both resolve is silently left alone.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ShapeScan {
    district: FieldSlot,
    station: FieldSlot,
}

impl Default for ShapeScan {
    fn default() -> Self {
        ShapeScan::new()
    }
}

impl ShapeScan {
    pub fn new() -> ShapeScan {
        ShapeScan {
            district: FieldSlot::Empty,
            station: FieldSlot::Empty,
        }
    }

    pub fn state(&self) -> ScanState {
        match (&self.district, &self.station) {
            (FieldSlot::Pending, _) => ScanState::AwaitDistrict,
            (_, FieldSlot::Pending) => ScanState::AwaitStation,
            (FieldSlot::Captured(_), FieldSlot::Captured(_)) => ScanState::Ready,
            (FieldSlot::Captured(_), FieldSlot::Empty) => ScanState::HaveDistrict,
            // A station left over without a district cannot be acted upon.
            (FieldSlot::Empty, _) => ScanState::Idle,
        }
    }

    /// Feeds one line to the two capture slots, in the order the markers and
    /// values appear in the document. A marker line may also carry its value.
    pub fn scan(&mut self, line: &str) {
        if line.contains(DISTRICT_MARKER) {
            self.district = FieldSlot::Pending;
        }
        if line.contains(STATION_MARKER) {
            self.station = FieldSlot::Pending;
        }
        if self.district == FieldSlot::Pending {
            if let Some(captures) = DISTRICT_FIELD.captures(line) {
                self.district = FieldSlot::Captured(captures[1].to_string());
            }
        }
        if self.station == FieldSlot::Pending {
            if let Some(captures) = STATION_FIELD.captures(line) {
                self.station = FieldSlot::Captured(captures[1].to_string());
            }
        }
    }

    /// The captured identifier pair, once both slots are resolved.
    pub fn resolved(&self) -> Option<(DistrictCode, StationCode)> {
        match (&self.district, &self.station) {
            (FieldSlot::Captured(d), FieldSlot::Captured(s)) => Some((
                DistrictCode(d.clone()),
                StationCode(s.clone()),
            )),
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        self.district = FieldSlot::Empty;
        self.station = FieldSlot::Empty;
    }
}

/// Rewrites a boundary document so that every shape references the style of
/// the party that won its polling station.
///
/// The scan is append-only and line-count-preserving, except for the
/// one-time insertion of the style-registry block immediately before the
/// first default style definition.
pub struct BoundaryAnnotator<'a> {
    store: &'a ResultStore,
    styles: &'a StyleRegistry,
    scope: Option<&'a HashSet<DistrictCode>>,
}

impl<'a> BoundaryAnnotator<'a> {
    /// `store` must be in canonical (merged) form. `scope`, when present,
    /// restricts the annotation to the given district codes; every other
    /// district is treated as out of scope.
    pub fn new(
        store: &'a ResultStore,
        styles: &'a StyleRegistry,
        scope: Option<&'a HashSet<DistrictCode>>,
    ) -> BoundaryAnnotator<'a> {
        BoundaryAnnotator {
            store,
            styles,
            scope,
        }
    }

    pub fn annotate<I, S>(&self, lines: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = String::new();
        let mut scan = ShapeScan::new();
        let mut styles_injected = false;

        for line in lines {
            let mut line = line.as_ref().to_string();

            if !styles_injected && line.contains(DEFAULT_STYLE_DEF) {
                out.push_str(&style_block(self.styles));
                styles_injected = true;
            }

            scan.scan(&line);

            if let Some((district, station)) = scan.resolved() {
                if line.contains(DEFAULT_STYLE_REF) {
                    let style_id = self.resolve_style(&district, &station);
                    line = line.replace(DEFAULT_STYLE_ID, style_id);
                    scan.reset();
                }
            }

            out.push_str(&line);
            out.push('\n');
        }
        out
    }

    fn resolve_style(&self, district: &DistrictCode, station: &StationCode) -> &str {
        let in_scope = self.scope.map_or(true, |scope| scope.contains(district));
        let found = if in_scope {
            self.store.district(district)
        } else {
            None
        };
        match found {
            None => {
                debug!("Riding {} is not in the result set", district);
                self.styles.out_of_scope()
            }
            Some(d) => match d.station(station) {
                // Some polling stations that were merged upstream still
                // appear in the boundary file.
                None => {
                    warn!(
                        "Merged polling station {} in riding {} is in the boundary file",
                        station, district
                    );
                    self.styles.unknown()
                }
                Some(st) => self.styles.party_style(st.tally.winner()),
            },
        }
    }
}

/// Materializes one KML style element, matching the markup of the boundary
/// files byte for byte.
fn style_element(entry: &StyleEntry) -> String {
    format!(
        r#"<Style id="{}">
                  <LabelStyle>
                      <color>00000000</color>
                      <scale>0</scale>
                  </LabelStyle>
                  <LineStyle>
                      <color>{}</color>
                      <width>0.4</width>
                  </LineStyle>
                  <PolyStyle>
                      <color>{}</color>
                  </PolyStyle>
              </Style>"#,
        entry.id, entry.outline_colour, entry.fill_colour
    )
}

fn style_block(styles: &StyleRegistry) -> String {
    let mut block = String::new();
    for entry in styles.entries() {
        block.push_str(&style_element(entry));
        block.push('\n');
    }
    block
}

/// Convenience wrapper assembling the registry from the configuration.
pub fn annotate_boundaries<I, S>(
    lines: I,
    store: &ResultStore,
    config: &ElectionConfig,
    scope: Option<&HashSet<DistrictCode>>,
) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let styles = StyleRegistry::from_config(config);
    BoundaryAnnotator::new(store, &styles, scope).annotate(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Disposition, ElectionConfig, ResultRow, ResultStore};

    fn config() -> ElectionConfig {
        ElectionConfig::federal(43).unwrap()
    }

    fn row(district: &str, station: &str, party: &str, votes: u64) -> ResultRow {
        ResultRow {
            province: "ON".to_string(),
            district_code: district.to_string(),
            district_name: "Somewhere".to_string(),
            station_code: station.to_string(),
            station_name: format!("Station {}", station),
            party_name: party.to_string(),
            disposition: Disposition::Counted,
            votes,
        }
    }

    fn store(config: &ElectionConfig) -> ResultStore {
        let rows = vec![
            row("35001", "1", "Liberal", 120),
            row("35001", "1", "Conservative", 95),
            row("35001", "1", "Green Party", 10),
            row("35001", "2", "Conservative", 40),
        ];
        ResultStore::from_rows(&rows, config).merge_subdivisions()
    }

    fn shape_lines(district: &str, station: &str) -> Vec<String> {
        vec![
            "<Placemark>".to_string(),
            "<td>FEDNUM</td>".to_string(),
            format!("<td>{}</td>", district),
            "<td>PDNUM</td>".to_string(),
            format!("<td>{}</td>", station),
            "<styleUrl>#PolyStyle00</styleUrl>".to_string(),
            "</Placemark>".to_string(),
        ]
    }

    #[test]
    fn scan_states_follow_the_marker_value_sequence() {
        let mut scan = ShapeScan::new();
        assert_eq!(scan.state(), ScanState::Idle);
        scan.scan("<td>FEDNUM</td>");
        assert_eq!(scan.state(), ScanState::AwaitDistrict);
        scan.scan("<td>35001</td>");
        assert_eq!(scan.state(), ScanState::HaveDistrict);
        scan.scan("<td>PDNUM</td>");
        assert_eq!(scan.state(), ScanState::AwaitStation);
        scan.scan("<td>12</td>");
        assert_eq!(scan.state(), ScanState::Ready);
        assert_eq!(
            scan.resolved(),
            Some((
                DistrictCode("35001".to_string()),
                StationCode("12".to_string())
            ))
        );
        scan.reset();
        assert_eq!(scan.state(), ScanState::Idle);
    }

    #[test]
    fn a_five_digit_value_is_not_mistaken_for_a_station() {
        let mut scan = ShapeScan::new();
        scan.scan("<td>PDNUM</td>");
        scan.scan("<td>35001</td>");
        assert_eq!(scan.state(), ScanState::AwaitStation);
        scan.scan("<td>7</td>");
        assert_eq!(scan.resolved(), None);
    }

    #[test]
    fn marker_and_value_may_share_a_line() {
        let mut scan = ShapeScan::new();
        scan.scan("<td>FEDNUM</td><td>35001</td>");
        assert_eq!(scan.state(), ScanState::HaveDistrict);
    }

    #[test]
    fn winner_style_is_substituted() {
        let config = config();
        let store = store(&config);
        let out = annotate_boundaries(shape_lines("35001", "1"), &store, &config, None);
        assert!(out.contains("<styleUrl>#Liberal</styleUrl>"));
        assert!(!out.contains("<styleUrl>#PolyStyle00</styleUrl>"));
    }

    #[test]
    fn unknown_district_gets_the_out_of_scope_style() {
        let config = config();
        let store = store(&config);
        let out = annotate_boundaries(shape_lines("59999", "1"), &store, &config, None);
        assert!(out.contains("<styleUrl>#OutOfScope</styleUrl>"));
    }

    #[test]
    fn missing_station_gets_the_unknown_style() {
        let config = config();
        let store = store(&config);
        let out = annotate_boundaries(shape_lines("35001", "99"), &store, &config, None);
        assert!(out.contains("<styleUrl>#Unknown</styleUrl>"));
    }

    #[test]
    fn scope_filter_excludes_districts() {
        let config = config();
        let store = store(&config);
        let scope: HashSet<DistrictCode> = [DistrictCode("35002".to_string())].into_iter().collect();
        let out = annotate_boundaries(shape_lines("35001", "1"), &store, &config, Some(&scope));
        assert!(out.contains("<styleUrl>#OutOfScope</styleUrl>"));
    }

    #[test]
    fn style_block_is_injected_once_before_the_default_definition() {
        let config = config();
        let store = store(&config);
        let mut lines = vec!["<Document>".to_string(), DEFAULT_STYLE_DEF.to_string()];
        lines.extend(shape_lines("35001", "1"));
        lines.push(DEFAULT_STYLE_DEF.to_string());
        let out = annotate_boundaries(lines, &store, &config, None);
        assert_eq!(out.matches("<Style id=\"Liberal\">").count(), 1);
        let registry_at = out.find("<Style id=\"Liberal\">").unwrap();
        let default_at = out.find(DEFAULT_STYLE_DEF).unwrap();
        assert!(registry_at < default_at);
    }

    #[test]
    fn line_count_is_preserved_outside_the_insertion() {
        let config = config();
        let store = store(&config);
        let lines = shape_lines("35001", "1");
        let out = annotate_boundaries(lines.clone(), &store, &config, None);
        assert_eq!(out.lines().count(), lines.len());
    }

    #[test]
    fn unresolved_shapes_keep_their_placeholder() {
        let config = config();
        let store = store(&config);
        // The station value never appears: the placeholder must survive.
        let lines = vec![
            "<td>FEDNUM</td>".to_string(),
            "<td>35001</td>".to_string(),
            "<td>PDNUM</td>".to_string(),
            "<styleUrl>#PolyStyle00</styleUrl>".to_string(),
        ];
        let out = annotate_boundaries(lines, &store, &config, None);
        assert!(out.contains("<styleUrl>#PolyStyle00</styleUrl>"));
    }

    #[test]
    fn consecutive_shapes_are_resolved_independently() {
        let config = config();
        let store = store(&config);
        let mut lines = shape_lines("35001", "1");
        lines.extend(shape_lines("35001", "2"));
        let out = annotate_boundaries(lines, &store, &config, None);
        assert!(out.contains("<styleUrl>#Liberal</styleUrl>"));
        assert!(out.contains("<styleUrl>#Conservative</styleUrl>"));
    }
}
