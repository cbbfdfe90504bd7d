use clap::Parser;

/// This is a score aggregation program for application evaluation rounds.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The file containing the round data in JSON format: a single round or a list of rounds,
    /// with their criteria, criterion groups and applications.
    #[clap(short, long, value_parser)]
    pub input: String,

    /// (file path, optional) A JSON settings file. It controls the multiplier applied to the final score
    /// and whether organizations may submit their scores.
    #[clap(short, long, value_parser)]
    pub settings: Option<String>,

    /// (file path, optional) A spreadsheet with one score per row (same layout as the export of individual
    /// scores). If provided, it replaces the scores contained in the round data.
    #[clap(long, value_parser)]
    pub scores: Option<String>,

    /// (csv or xlsx, default inferred from the extension) The type of the score spreadsheet.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (default: first worksheet) When using an Excel file, indicates the name of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// (name, score or unevaluated) If specified, the order in which the applications are listed.
    #[clap(long, value_parser)]
    pub order: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary of the rounds will be written in JSON format
    /// to the given location.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference file containing a summary in JSON format. If provided, evalscore will
    /// check that the computed summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, optional) Writes all the individual scores and comments to a CSV file.
    #[clap(long, value_parser)]
    pub export_scores: Option<String>,

    /// (file path, optional) Writes one row per application, with the group scores and the total score,
    /// to a CSV file.
    #[clap(long, value_parser)]
    pub export_summary: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
