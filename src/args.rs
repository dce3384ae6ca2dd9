use clap::{Parser, Subcommand};

/// Colours polling-division boundary maps by election outcome and locates
/// the tipping-point riding for a party.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Command,

    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, global = true, takes_value = false)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Rewrites a polling-division boundary file (.kml) so that every shape
    /// carries the style of the party that won its polling station.
    Annotate {
        /// (directory path) The directory holding the per-riding result files,
        /// named PROV_DISTRICT.csv.
        #[clap(short, long, value_parser)]
        results: String,

        /// (file path) The polling-division boundary file (.kml).
        #[clap(short, long, value_parser)]
        boundaries: String,

        /// (file path) Destination of the annotated boundary file.
        #[clap(short, long, value_parser)]
        out: String,

        /// (file path, optional) JSON configuration overriding the built-in
        /// election and party table.
        #[clap(short, long, value_parser)]
        config: Option<String>,

        /// (5-digit riding code, repeatable) If specified, restricts the
        /// annotation to the given ridings.
        #[clap(short, long, value_parser)]
        district: Vec<String>,

        /// (file path, optional) A reference annotated file. If provided, pollmap
        /// will check that its output matches the reference.
        #[clap(long, value_parser)]
        reference: Option<String>,
    },

    /// Ranks ridings by vote margin and simulates their sequential
    /// acquisition by the target party.
    Tipping {
        /// (directory path) The directory holding the per-riding result files,
        /// named PROV_DISTRICT.csv.
        #[clap(short, long, value_parser)]
        results: String,

        /// (party label, optional when the configuration file names one) The
        /// party acquiring ridings in margin order.
        #[clap(short, long, value_parser)]
        party: Option<String>,

        /// (file path or empty) Destination of the ranking table in CSV format.
        /// If not specified, the table is written to the standard output.
        #[clap(short, long, value_parser)]
        out: Option<String>,

        /// (file path, optional) JSON configuration overriding the built-in
        /// election and party table.
        #[clap(short, long, value_parser)]
        config: Option<String>,

        /// (5-digit riding code, repeatable) If specified, restricts the
        /// ranking to the given ridings.
        #[clap(short, long, value_parser)]
        district: Vec<String>,
    },
}
