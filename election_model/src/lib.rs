mod annotate;
mod config;
mod tipping;

use log::warn;

use std::collections::BTreeMap;
use std::fmt::Display;

pub use crate::annotate::*;
pub use crate::config::*;
pub use crate::tipping::*;

// **** Identifiers ****

/// Two-letter code of a province or territory.
pub type ProvinceCode = String;

/// 5-digit code of an electoral district (riding). District codes are
/// assumed to be unique across provinces; this is not verified.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd)]
pub struct DistrictCode(pub String);

impl Display for DistrictCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 1-4 digit code of a polling station (polling division), possibly carrying
/// a letter suffix when the station is a subdivision (e.g. "30A").
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd)]
pub struct StationCode(pub String);

impl StationCode {
    /// The canonical code of a subdivided station, or None when the code is
    /// already canonical. A code is canonical exactly when it parses as an
    /// integer; otherwise the trailing suffix character is dropped.
    pub fn canonical(&self) -> Option<StationCode> {
        if self.0.parse::<u64>().is_ok() {
            None
        } else {
            let mut code = self.0.clone();
            code.pop();
            Some(StationCode(code))
        }
    }
}

impl Display for StationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// **** Tallies ****

/// Per-party vote counts for one unit (station, district or province).
///
/// A tally always holds one slot per configured party, created at zero and
/// only ever increased.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct VoteTally {
    counts: Vec<u64>,
}

impl VoteTally {
    pub fn zeroed(config: &ElectionConfig) -> VoteTally {
        VoteTally {
            counts: vec![0; config.parties().len()],
        }
    }

    pub fn add(&mut self, party: PartyId, votes: u64) {
        self.counts[party.0 as usize] += votes;
    }

    pub fn count(&self, party: PartyId) -> u64 {
        self.counts[party.0 as usize]
    }

    /// The pairwise sum of two tallies. Commutative and associative.
    pub fn merged(&self, other: &VoteTally) -> VoteTally {
        VoteTally {
            counts: self
                .counts
                .iter()
                .zip(other.counts.iter())
                .map(|(a, b)| a + b)
                .collect(),
        }
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// The party with the strictly maximal count. An exact tie is won by the
    /// first maximal party in configured order; actual electoral ties are
    /// not resolved further.
    pub fn winner(&self) -> PartyId {
        let mut best = PartyId(0);
        let mut best_count = self.counts.first().copied().unwrap_or(0);
        for (idx, &count) in self.counts.iter().enumerate().skip(1) {
            if count > best_count {
                best = PartyId(idx as u32);
                best_count = count;
            }
        }
        best
    }

    pub fn iter(&self) -> impl Iterator<Item = (PartyId, u64)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .map(|(idx, &count)| (PartyId(idx as u32), count))
    }
}

// **** The result tree ****

/// A polling station with its display metadata and tally.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Station {
    pub name: String,
    pub district_name: String,
    pub tally: VoteTally,
}

/// The polling stations of one district, keyed by station code.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct District {
    stations: BTreeMap<StationCode, Station>,
}

impl District {
    pub fn station(&self, code: &StationCode) -> Option<&Station> {
        self.stations.get(code)
    }

    pub fn stations(&self) -> impl Iterator<Item = (&StationCode, &Station)> {
        self.stations.iter()
    }
}

/// The full province -> district -> station tree of an election.
///
/// The store is built once from raw rows, transformed exactly once by
/// [ResultStore::merge_subdivisions] and read-only afterwards.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ResultStore {
    provinces: BTreeMap<ProvinceCode, BTreeMap<DistrictCode, District>>,
}

impl ResultStore {
    /// Aggregates raw result rows into the station tree.
    ///
    /// Rows whose station was voided or merged away are skipped. Stations
    /// whose tally sums to zero are logged and kept.
    pub fn from_rows(rows: &[ResultRow], config: &ElectionConfig) -> ResultStore {
        let mut provinces: BTreeMap<ProvinceCode, BTreeMap<DistrictCode, District>> =
            BTreeMap::new();
        for row in rows {
            if !matches!(row.disposition, Disposition::Counted) {
                continue;
            }
            let party = config.resolve_party(&row.party_name);
            let district = provinces
                .entry(row.province.clone())
                .or_default()
                .entry(DistrictCode(row.district_code.clone()))
                .or_default();
            let station = district
                .stations
                .entry(StationCode(row.station_code.clone()))
                .or_insert_with(|| Station {
                    name: row.station_name.clone(),
                    district_name: row.district_name.clone(),
                    tally: VoteTally::zeroed(config),
                });
            station.tally.add(party, row.votes);
        }
        let store = ResultStore { provinces };
        for (district_code, district) in store.districts() {
            for (station_code, station) in district.stations() {
                if station.tally.total() == 0 {
                    warn!(
                        "Zero votes in riding {} at polling station {}",
                        district_code, station_code
                    );
                }
            }
        }
        store
    }

    /// Folds subdivided stations into their canonical numeric station.
    ///
    /// Sibling tallies are pointwise-summed; the metadata of the first
    /// inserted sibling is kept. Idempotent on a canonical store.
    pub fn merge_subdivisions(&self) -> ResultStore {
        let mut provinces: BTreeMap<ProvinceCode, BTreeMap<DistrictCode, District>> =
            BTreeMap::new();
        for (province, districts) in &self.provinces {
            let out_districts = provinces.entry(province.clone()).or_default();
            for (district_code, district) in districts {
                let out: &mut District = out_districts.entry(district_code.clone()).or_default();
                for (station_code, station) in &district.stations {
                    match station_code.canonical() {
                        None => {
                            out.stations.insert(station_code.clone(), station.clone());
                        }
                        Some(canonical) => match out.stations.get_mut(&canonical) {
                            Some(existing) => {
                                existing.tally = existing.tally.merged(&station.tally);
                            }
                            None => {
                                out.stations.insert(canonical, station.clone());
                            }
                        },
                    }
                }
            }
        }
        ResultStore { provinces }
    }

    /// Looks up a district by its globally-unique code, across provinces.
    pub fn district(&self, code: &DistrictCode) -> Option<&District> {
        self.provinces
            .values()
            .find_map(|districts| districts.get(code))
    }

    pub fn districts(&self) -> impl Iterator<Item = (&DistrictCode, &District)> {
        self.provinces
            .values()
            .flat_map(|districts| districts.iter())
    }

    /// Sums station tallies per district.
    pub fn district_rollup(&self, config: &ElectionConfig) -> BTreeMap<DistrictCode, VoteTally> {
        let mut res = BTreeMap::new();
        for (district_code, district) in self.districts() {
            let mut acc = VoteTally::zeroed(config);
            for (_, station) in district.stations() {
                acc = acc.merged(&station.tally);
            }
            res.insert(district_code.clone(), acc);
        }
        res
    }

    /// Sums station tallies per province.
    pub fn province_rollup(&self, config: &ElectionConfig) -> BTreeMap<ProvinceCode, VoteTally> {
        let mut res = BTreeMap::new();
        for (province, districts) in &self.provinces {
            let mut acc = VoteTally::zeroed(config);
            for district in districts.values() {
                for (_, station) in district.stations() {
                    acc = acc.merged(&station.tally);
                }
            }
            res.insert(province.clone(), acc);
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn party_resolution_is_total() {
        let config = config();
        let liberal = config.party_id("Liberal").unwrap();
        let bloc = config.party_id("BlocQuebecois").unwrap();
        let ndp = config.party_id("NDP").unwrap();
        // Exact canonical name.
        assert_eq!(config.resolve_party("Liberal"), liberal);
        assert_eq!(config.resolve_party("NDP-New Democratic Party"), ndp);
        // Locale variants match on the text before the first space.
        assert_eq!(config.resolve_party("Bloc Qu\u{e9}b\u{e9}cois"), bloc);
        // Everything else lands in the catch-all.
        assert_eq!(config.resolve_party("Rhinoceros"), config.catch_all());
        assert_eq!(config.resolve_party(""), config.catch_all());
    }

    #[test]
    fn tally_merge_is_commutative_and_associative() {
        let config = config();
        let mut a = VoteTally::zeroed(&config);
        let mut b = VoteTally::zeroed(&config);
        let mut c = VoteTally::zeroed(&config);
        a.add(PartyId(0), 10);
        b.add(PartyId(1), 4);
        b.add(PartyId(0), 1);
        c.add(PartyId(2), 7);
        assert_eq!(a.merged(&b), b.merged(&a));
        assert_eq!(a.merged(&b).merged(&c), a.merged(&b.merged(&c)));
    }

    #[test]
    fn winner_is_first_maximal_in_party_order() {
        let config = config();
        let mut tally = VoteTally::zeroed(&config);
        tally.add(PartyId(0), 120);
        tally.add(PartyId(1), 95);
        tally.add(PartyId(2), 10);
        assert_eq!(tally.winner(), PartyId(0));
        // An exact tie between parties 0 and 1 is won by party 0.
        let mut tied = VoteTally::zeroed(&config);
        tied.add(PartyId(0), 50);
        tied.add(PartyId(1), 50);
        assert_eq!(tied.winner(), PartyId(0));
    }

    #[test]
    fn voided_and_merged_rows_never_count() {
        let config = config();
        let mut voided = row("35001", "1", "Liberal", 999);
        voided.disposition = Disposition::Void;
        let mut merged = row("35001", "2", "Liberal", 999);
        merged.disposition = Disposition::MergedAway;
        let rows = vec![voided, merged, row("35001", "3", "Liberal", 5)];
        let store = ResultStore::from_rows(&rows, &config);
        let district = store.district(&DistrictCode("35001".to_string())).unwrap();
        assert!(district.station(&StationCode("1".to_string())).is_none());
        assert!(district.station(&StationCode("2".to_string())).is_none());
        let rollup = store.district_rollup(&config);
        assert_eq!(rollup[&DistrictCode("35001".to_string())].total(), 5);
    }

    #[test]
    fn subdivisions_merge_into_canonical_station() {
        let config = config();
        let rows = vec![
            row("35001", "30A", "Liberal", 10),
            row("35001", "30A", "Conservative", 3),
            row("35001", "30B", "Liberal", 7),
            row("35001", "31", "Green Party", 2),
        ];
        let store = ResultStore::from_rows(&rows, &config);
        let merged = store.merge_subdivisions();
        let district = merged.district(&DistrictCode("35001".to_string())).unwrap();
        let canonical = district.station(&StationCode("30".to_string())).unwrap();
        assert_eq!(
            canonical.tally.count(config.party_id("Liberal").unwrap()),
            17
        );
        assert_eq!(
            canonical.tally.count(config.party_id("Conservative").unwrap()),
            3
        );
        assert!(district.station(&StationCode("30A".to_string())).is_none());
        assert!(district.station(&StationCode("31".to_string())).is_some());
    }

    #[test]
    fn merge_preserves_district_totals_and_is_idempotent() {
        let config = config();
        let rows = vec![
            row("35001", "30A", "Liberal", 10),
            row("35001", "30B", "Conservative", 20),
            row("35001", "1", "Liberal", 5),
            row("10001", "7C", "Green Party", 9),
        ];
        let store = ResultStore::from_rows(&rows, &config);
        let merged = store.merge_subdivisions();
        assert_eq!(
            store.district_rollup(&config),
            merged.district_rollup(&config)
        );
        assert_eq!(merged, merged.merge_subdivisions());
    }

    #[test]
    fn merged_metadata_comes_from_first_sibling() {
        let config = config();
        let rows = vec![
            row("35001", "30A", "Liberal", 1),
            row("35001", "30B", "Liberal", 1),
        ];
        let merged = ResultStore::from_rows(&rows, &config).merge_subdivisions();
        let district = merged.district(&DistrictCode("35001".to_string())).unwrap();
        let station = district.station(&StationCode("30".to_string())).unwrap();
        assert_eq!(station.name, "Station 30A");
    }

    #[test]
    fn station_codes_canonicalize() {
        assert_eq!(StationCode("30".to_string()).canonical(), None);
        assert_eq!(
            StationCode("30A".to_string()).canonical(),
            Some(StationCode("30".to_string()))
        );
    }

    #[test]
    fn province_rollup_sums_all_districts() {
        let config = config();
        let rows = vec![
            row("35001", "1", "Liberal", 5),
            row("35002", "1", "Conservative", 6),
        ];
        let store = ResultStore::from_rows(&rows, &config);
        let rollup = store.province_rollup(&config);
        assert_eq!(rollup["ON"].total(), 11);
    }
}
