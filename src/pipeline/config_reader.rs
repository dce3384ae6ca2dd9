use crate::pipeline::*;

use election_model::{ElectionConfig, ModelError, Party, DEFAULT_ELECTION};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::fs;

/// One party entry of the configuration file.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PartyEntry {
    pub label: String,
    #[serde(rename = "matchName")]
    pub match_name: String,
    #[serde(rename = "fillColour")]
    pub fill_colour: String,
    /// Defaults to a white outline when not specified.
    #[serde(rename = "outlineColour")]
    pub outline_colour: Option<String>,
}

/// The optional JSON configuration file. Every field falls back to the
/// built-in federal configuration; the party and scope settings are
/// defaults that the command line flags override.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollmapConfig {
    pub election: Option<u32>,
    pub parties: Option<Vec<PartyEntry>>,
    /// Default target party of the tipping command.
    #[serde(rename = "targetParty")]
    pub target_party: Option<String>,
    /// Default district code scope of both commands.
    pub scope: Option<Vec<String>>,
}

/// The assembled settings of one run.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RunConfig {
    pub election: ElectionConfig,
    pub target_party: Option<String>,
    pub scope: Vec<String>,
}

const FILE_OUTLINE_DEFAULT: &str = "ffffffff";

/// Assembles the run configuration, overlaying the configuration file (when
/// given) on the built-in defaults. An unknown election identifier or a
/// party table without the catch-all entry is fatal.
pub fn load_config(path: Option<String>) -> PipelineResult<RunConfig> {
    let file_config = match path {
        None => PollmapConfig::default(),
        Some(path) => {
            let contents =
                fs::read_to_string(&path).context(OpeningJsonSnafu { path: path.clone() })?;
            parse_config(&contents).context(ParsingJsonSnafu { path })?
        }
    };
    build_config(file_config).context(ModelSnafu {})
}

fn parse_config(contents: &str) -> Result<PollmapConfig, serde_json::Error> {
    serde_json::from_str(contents)
}

fn build_config(file_config: PollmapConfig) -> Result<RunConfig, ModelError> {
    let election = file_config.election.unwrap_or(DEFAULT_ELECTION);
    let election = match file_config.parties {
        None => ElectionConfig::federal(election),
        Some(entries) => {
            let parties: Vec<Party> = entries
                .into_iter()
                .map(|e| Party {
                    label: e.label,
                    match_name: e.match_name,
                    fill_colour: e.fill_colour,
                    outline_colour: e
                        .outline_colour
                        .unwrap_or_else(|| FILE_OUTLINE_DEFAULT.to_string()),
                })
                .collect();
            ElectionConfig::with_parties(election, parties)
        }
    }?;
    Ok(RunConfig {
        election,
        target_party: file_config.target_party,
        scope: file_config.scope.unwrap_or_default(),
    })
}
