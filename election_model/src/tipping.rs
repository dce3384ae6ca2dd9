//! Tipping-point analysis: how far down the margin ranking a party must go
//! before sequentially acquired ridings yield a governing outcome.

use log::{info, warn};
use std::collections::{BTreeMap, HashMap};

use crate::config::{ElectionConfig, PartyId};
use crate::{DistrictCode, VoteTally};

/// Government outcome after a rank has been acquired.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Category {
    Majority,
    Minority,
    None,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Category::Majority => "Majority",
            Category::Minority => "Minority",
            Category::None => "None",
        };
        write!(f, "{}", s)
    }
}

/// One rank of the tipping-point table.
#[derive(PartialEq, Debug, Clone)]
pub struct TippingRow {
    /// 1-based rank by descending target-party margin.
    pub index: u32,
    pub district: DistrictCode,
    pub winner: PartyId,
    /// Target-party vote share minus the best share among the other parties.
    /// Positive when the target party won the riding.
    pub margin: f64,
    /// Target-party share of the riding's votes.
    pub vote_share: f64,
    pub category: Category,
}

/// Ranks ridings by descending target-party margin and simulates their
/// sequential acquisition by the target party.
///
/// Walking the ranking, an acquired riding either accrues to the target
/// party or is taken away from its actual winner's remaining count. The
/// category becomes Majority once the 1-based rank reaches the configured
/// seat threshold, and Minority once the target party's accrued count
/// strictly exceeds every other party's remaining count.
pub fn rank_tipping_point(
    rollups: &BTreeMap<DistrictCode, VoteTally>,
    target: PartyId,
    config: &ElectionConfig,
) -> Vec<TippingRow> {
    info!(
        "Ranking {} ridings by {} margin",
        rollups.len(),
        config.party(target).label
    );

    let mut ranked: Vec<TippingRow> = rollups
        .iter()
        .map(|(district, tally)| district_row(district, tally, target, config))
        .collect();
    ranked.sort_by(|a, b| b.margin.total_cmp(&a.margin));

    // Seats currently held by each non-target party; a riding passed in the
    // walk is no longer held by its winner.
    let mut remaining: HashMap<PartyId, i64> = HashMap::new();
    for row in ranked.iter() {
        if row.winner != target {
            *remaining.entry(row.winner).or_insert(0) += 1;
        }
    }

    let mut acquired: i64 = 0;
    for (idx, row) in ranked.iter_mut().enumerate() {
        if row.winner == target {
            acquired += 1;
        } else if let Some(count) = remaining.get_mut(&row.winner) {
            *count -= 1;
        }

        row.index = (idx + 1) as u32;
        let best_remaining = remaining.values().copied().max().unwrap_or(0);
        row.category = if row.index >= config.majority_threshold {
            Category::Majority
        } else if acquired > best_remaining {
            Category::Minority
        } else {
            Category::None
        };
    }
    ranked
}

fn district_row(
    district: &DistrictCode,
    tally: &VoteTally,
    target: PartyId,
    config: &ElectionConfig,
) -> TippingRow {
    let total = tally.total();
    if total == 0 {
        warn!("Riding {} has no votes at all", district);
    }
    let share = |party: PartyId| -> f64 {
        if total == 0 {
            0.0
        } else {
            tally.count(party) as f64 / total as f64
        }
    };
    let target_share = share(target);
    let best_other = config
        .party_ids()
        .filter(|p| *p != target)
        .map(share)
        .fold(0.0, f64::max);
    TippingRow {
        index: 0,
        district: district.clone(),
        winner: tally.winner(),
        margin: target_share - best_other,
        vote_share: target_share,
        category: Category::None,
    }
}
