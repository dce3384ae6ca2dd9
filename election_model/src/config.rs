// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// The fate of a polling station as recorded in the official result rows.
///
/// Only counted rows contribute to a tally. The other two markers indicate
/// that the station no longer exists in the published results.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Disposition {
    /// The station reported votes normally.
    Counted,
    /// The station was voided before the election.
    Void,
    /// The votes were transposed into another station.
    MergedAway,
}

/// One raw result row, as decoded by the readers.
///
/// A row carries the votes of a single party at a single polling station.
/// Station codes may still carry a subdivision letter suffix at this point
/// (e.g. "30A").
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ResultRow {
    pub province: String,
    pub district_code: String,
    pub district_name: String,
    pub station_code: String,
    pub station_name: String,
    /// Free-text party name as printed in the source file. Resolved against
    /// the configured party table by [crate::ElectionConfig::resolve_party].
    pub party_name: String,
    pub disposition: Disposition,
    pub votes: u64,
}

// ********* Configuration **********

/// Index of a party in the configured party list.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct PartyId(pub u32);

/// Label of the catch-all party. Every configuration must contain it.
pub const CATCH_ALL: &str = "Other";

/// A configured party: a short label (also used as the KML style id), the
/// canonical name used to match the free-text names of the result files, and
/// the colour pair of its map style.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Party {
    pub label: String,
    pub match_name: String,
    /// KML colour, aabbggrr notation.
    pub fill_colour: String,
    pub outline_colour: String,
}

// The five federal elections for which poll-by-poll results and boundary
// files are published in a compatible format, with their majority seat
// thresholds.
const FEDERAL_ELECTIONS: [(u32, u32, u32); 5] = [
    (39, 2006, 155),
    (40, 2008, 155),
    (41, 2011, 155),
    (42, 2015, 170),
    (43, 2019, 170),
];

pub const DEFAULT_ELECTION: u32 = 43;

const DEFAULT_OUTLINE: &str = "ffffffff";

fn federal_parties() -> Vec<Party> {
    let table: [(&str, &str, &str); 6] = [
        ("Liberal", "Liberal", "b31400C8"),
        ("Conservative", "Conservative", "b3B42814"),
        ("NDP", "NDP-New Democratic Party", "b31478FA"),
        ("BlocQuebecois", "Bloc", "b3B47800"),
        ("Green", "Green Party", "b3009614"),
        (CATCH_ALL, CATCH_ALL, "b3646464"),
    ];
    table
        .iter()
        .map(|(label, match_name, fill)| Party {
            label: label.to_string(),
            match_name: match_name.to_string(),
            fill_colour: fill.to_string(),
            outline_colour: DEFAULT_OUTLINE.to_string(),
        })
        .collect()
}

/// The immutable configuration of one analysis run: which election is being
/// analyzed and the closed, ordered set of parties.
///
/// The party order is significant: it fixes the iteration order of tallies
/// and therefore which party wins an exact tie.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ElectionConfig {
    pub election: u32,
    pub year: u32,
    /// Seat count needed for a governing majority in this election.
    pub majority_threshold: u32,
    parties: Vec<Party>,
    catch_all: PartyId,
}

impl ElectionConfig {
    /// The built-in configuration for a federal general election.
    pub fn federal(election: u32) -> Result<ElectionConfig, ModelError> {
        ElectionConfig::with_parties(election, federal_parties())
    }

    /// A configuration for a known federal election with a custom party
    /// table. The table must contain the catch-all party.
    pub fn with_parties(election: u32, parties: Vec<Party>) -> Result<ElectionConfig, ModelError> {
        let (_, year, majority_threshold) = FEDERAL_ELECTIONS
            .iter()
            .find(|(e, _, _)| *e == election)
            .ok_or(ModelError::UnknownElection(election))?;
        let catch_all = parties
            .iter()
            .position(|p| p.label == CATCH_ALL)
            .map(|idx| PartyId(idx as u32))
            .ok_or(ModelError::MissingCatchAll)?;
        Ok(ElectionConfig {
            election,
            year: *year,
            majority_threshold: *majority_threshold,
            parties,
            catch_all,
        })
    }

    pub fn parties(&self) -> &[Party] {
        &self.parties
    }

    pub fn party(&self, id: PartyId) -> &Party {
        &self.parties[id.0 as usize]
    }

    pub fn party_ids(&self) -> impl Iterator<Item = PartyId> {
        (0..self.parties.len() as u32).map(PartyId)
    }

    pub fn catch_all(&self) -> PartyId {
        self.catch_all
    }

    /// Looks up a party by its configured label.
    pub fn party_id(&self, label: &str) -> Result<PartyId, ModelError> {
        self.parties
            .iter()
            .position(|p| p.label == label)
            .map(|idx| PartyId(idx as u32))
            .ok_or_else(|| ModelError::UnknownParty(label.to_string()))
    }

    /// Maps a free-text party name to a configured party.
    ///
    /// The name is first matched exactly against the canonical names, then
    /// by the text before the first space (the source files spell some names
    /// with locale variants and accents after the first word), and finally
    /// falls back to the catch-all. Total: every input resolves.
    pub fn resolve_party(&self, raw: &str) -> PartyId {
        if let Some(idx) = self.parties.iter().position(|p| p.match_name == raw) {
            return PartyId(idx as u32);
        }
        let head = raw.split(' ').next().unwrap_or(raw);
        if let Some(idx) = self.parties.iter().position(|p| p.match_name == head) {
            return PartyId(idx as u32);
        }
        self.catch_all
    }
}

// ********* Style registry **********

/// Style id assigned to shapes whose district is not in the result set.
pub const OUT_OF_SCOPE_STYLE: &str = "OutOfScope";
/// Style id assigned to shapes whose station was merged or voided upstream.
pub const UNKNOWN_STYLE: &str = "Unknown";

const OUT_OF_SCOPE_FILL: &str = "1e646464";
const UNKNOWN_FILL: &str = "b3969696";

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct StyleEntry {
    pub id: String,
    pub fill_colour: String,
    pub outline_colour: String,
}

/// The styles injected in the annotated boundary document: one per party, in
/// party order, plus the two fallback styles. Pure data.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct StyleRegistry {
    entries: Vec<StyleEntry>,
}

impl StyleRegistry {
    pub fn from_config(config: &ElectionConfig) -> StyleRegistry {
        let mut entries: Vec<StyleEntry> = config
            .parties()
            .iter()
            .map(|p| StyleEntry {
                id: p.label.clone(),
                fill_colour: p.fill_colour.clone(),
                outline_colour: p.outline_colour.clone(),
            })
            .collect();
        entries.push(StyleEntry {
            id: OUT_OF_SCOPE_STYLE.to_string(),
            fill_colour: OUT_OF_SCOPE_FILL.to_string(),
            outline_colour: DEFAULT_OUTLINE.to_string(),
        });
        entries.push(StyleEntry {
            id: UNKNOWN_STYLE.to_string(),
            fill_colour: UNKNOWN_FILL.to_string(),
            outline_colour: DEFAULT_OUTLINE.to_string(),
        });
        StyleRegistry { entries }
    }

    pub fn entries(&self) -> &[StyleEntry] {
        &self.entries
    }

    /// The style id of a party. Party styles are listed first, in party
    /// order, so the index is the party id itself.
    pub fn party_style(&self, id: PartyId) -> &str {
        &self.entries[id.0 as usize].id
    }

    pub fn out_of_scope(&self) -> &str {
        OUT_OF_SCOPE_STYLE
    }

    pub fn unknown(&self) -> &str {
        UNKNOWN_STYLE
    }
}

// ********* Errors **********

/// Errors raised while assembling a configuration.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ModelError {
    UnknownElection(u32),
    UnknownParty(String),
    MissingCatchAll,
}

impl Error for ModelError {}

impl Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::UnknownElection(e) => write!(f, "unknown election identifier {}", e),
            ModelError::UnknownParty(l) => write!(f, "party {} is not in the configuration", l),
            ModelError::MissingCatchAll => {
                write!(f, "the party configuration has no {} entry", CATCH_ALL)
            }
        }
    }
}
