use log::{debug, info, warn};

use application_scoring::*;
use snafu::{prelude::*, Snafu};

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::evaluation::round_reader::*;

pub mod io_common;
pub mod io_csv;
pub mod io_excel;
pub mod round_reader;

#[derive(Debug, Snafu)]
pub enum EvalError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON in {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error formatting the summary"))]
    FormattingJson { source: serde_json::Error },
    #[snafu(display("Error writing file {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening Excel file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Excel file {path} has no worksheet named {name}"))]
    MissingWorksheet { path: String, name: String },
    #[snafu(display("No data in {path}"))]
    EmptySheet { path: String },
    #[snafu(display("Line {lineno}: cannot read cell {content}"))]
    ExcelWrongCellType { lineno: usize, content: String },
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading a line of the CSV file"))]
    CsvLineParse { source: csv::Error },
    #[snafu(display("Error writing CSV file {path}"))]
    CsvWrite { source: csv::Error, path: String },
    #[snafu(display("Missing column {name} in {path}"))]
    MissingColumn { name: String, path: String },
    #[snafu(display("Line {lineno}: {content} is not a score"))]
    InvalidScore { lineno: usize, content: String },
    #[snafu(display("Invalid round {name}"))]
    InvalidRound {
        source: ScoringErrors,
        name: String,
    },
    #[snafu(display("Unknown input type {name}, expected csv or xlsx"))]
    UnknownInputType { name: String },
    #[snafu(display("Unknown order {name}, expected name, score or unevaluated"))]
    UnknownOrder { name: String },
    #[snafu(display("Difference detected between computed summary and reference summary"))]
    ReferenceMismatch {},
}

pub type EvalResult<T> = Result<T, EvalError>;

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum SheetKind {
    Csv,
    Excel,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ScoreSheet {
    pub path: String,
    pub kind: SheetKind,
    pub worksheet: Option<String>,
}

/// Everything needed to run the scoring, once the arguments are checked.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct RunOptions {
    pub input_path: String,
    pub settings_path: Option<String>,
    pub scores: Option<ScoreSheet>,
    pub order: Option<ApplicationOrder>,
    pub out: Option<String>,
    pub reference_path: Option<String>,
    pub export_scores: Option<String>,
    pub export_summary: Option<String>,
}

fn parse_order(name: &str) -> EvalResult<ApplicationOrder> {
    match name {
        "name" => Ok(ApplicationOrder::Name),
        "score" => Ok(ApplicationOrder::Score),
        "unevaluated" => Ok(ApplicationOrder::Unevaluated),
        x => UnknownOrderSnafu { name: x }.fail(),
    }
}

fn sheet_kind(path: &str, input_type: Option<&str>) -> EvalResult<SheetKind> {
    match input_type {
        Some("csv") => Ok(SheetKind::Csv),
        Some("xlsx") | Some("excel") => Ok(SheetKind::Excel),
        Some(x) => UnknownInputTypeSnafu { name: x }.fail(),
        None => {
            let ext = Path::new(path)
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_ascii_lowercase());
            match ext.as_deref() {
                Some("xlsx") => Ok(SheetKind::Excel),
                _ => Ok(SheetKind::Csv),
            }
        }
    }
}

impl RunOptions {
    pub fn from_args(args: &Args) -> EvalResult<RunOptions> {
        let order = match &args.order {
            Some(o) => Some(parse_order(o)?),
            None => None,
        };
        let scores = match &args.scores {
            Some(path) => Some(ScoreSheet {
                path: path.clone(),
                kind: sheet_kind(path, args.input_type.as_deref())?,
                worksheet: args.excel_worksheet_name.clone(),
            }),
            None => None,
        };
        Ok(RunOptions {
            input_path: args.input.clone(),
            settings_path: args.settings.clone(),
            scores,
            order,
            out: args.out.clone(),
            reference_path: args.reference.clone(),
            export_scores: args.export_scores.clone(),
            export_summary: args.export_summary.clone(),
        })
    }
}

/// Runs the scoring of all the rounds and returns the summary.
pub fn run_scoring(options: &RunOptions) -> EvalResult<JSValue> {
    let settings = match &options.settings_path {
        Some(p) => read_settings(p)?,
        None => ScoringSettings::DEFAULT_SETTINGS,
    };
    debug!("run_scoring: settings: {:?}", settings);

    let mut rounds = read_rounds(&options.input_path)?;

    if let Some(sheet) = &options.scores {
        let parsed = match sheet.kind {
            SheetKind::Csv => io_csv::read_csv_scores(&sheet.path)?,
            SheetKind::Excel => {
                io_excel::read_excel_scores(&sheet.path, sheet.worksheet.as_deref())?
            }
        };
        for round in rounds.iter_mut() {
            let attached = io_common::attach_scores(round, &parsed);
            info!(
                "run_scoring: round {:?}: {} scores read from {}",
                round.name,
                attached,
                io_common::simplify_file_name(&sheet.path)
            );
        }
    }

    let mut scored_rounds: Vec<(&ApplicationRound, Vec<ScoredApplication>)> = Vec::new();
    for round in rounds.iter() {
        let mut applications = add_application_scores(round, &round.applications);
        if let Some(order) = options.order {
            order_applications(&mut applications, order);
        }
        scored_rounds.push((round, applications));
    }

    if let Some(path) = &options.export_scores {
        io_csv::write_scores_csv(path, &scored_rounds)?;
    }
    if let Some(path) = &options.export_summary {
        io_csv::write_summary_csv(path, &scored_rounds, &settings)?;
    }

    let summary_js = build_summary_js(&scored_rounds, &settings);
    let pretty_js_summary =
        serde_json::to_string_pretty(&summary_js).context(FormattingJsonSnafu {})?;

    match options.out.as_deref() {
        None | Some("stdout") => println!("{}", pretty_js_summary),
        Some(path) => {
            fs::write(path, &pretty_js_summary).context(WritingOutputSnafu { path })?;
            info!("Summary written to {}", path);
        }
    }

    if let Some(reference_path) = &options.reference_path {
        let reference_summary = read_summary(reference_path)?;
        let pretty_reference_summary =
            serde_json::to_string_pretty(&reference_summary).context(FormattingJsonSnafu {})?;
        if pretty_reference_summary != pretty_js_summary {
            warn!("Found differences with the reference string");
            print_diff(
                pretty_reference_summary.as_str(),
                pretty_js_summary.as_ref(),
                "\n",
            );
            return ReferenceMismatchSnafu {}.fail();
        }
    }

    Ok(summary_js)
}

fn group_scores_to_js(group_scores: &std::collections::BTreeMap<GroupId, f64>) -> JSValue {
    let m: JSMap<String, JSValue> = group_scores
        .iter()
        .map(|(gid, s)| (gid.to_string(), json!(s)))
        .collect();
    JSValue::Object(m)
}

fn breakdown_to_js(breakdown: &ScoreBreakdown) -> JSMap<String, JSValue> {
    let mut m = JSMap::new();
    if let Some(s) = breakdown.score {
        m.insert("score".to_string(), json!(s));
    }
    m.insert(
        "groupScores".to_string(),
        group_scores_to_js(&breakdown.group_scores),
    );
    m
}

fn application_to_js(
    round: &ApplicationRound,
    scored: &ScoredApplication,
    settings: &ScoringSettings,
) -> JSValue {
    let summary = &scored.summary;
    let mut m = JSMap::new();
    m.insert("id".to_string(), json!(scored.application.id.0));
    m.insert("name".to_string(), json!(scored.application.name));
    if let Some(s) = summary.score {
        m.insert("score".to_string(), json!(s));
    }
    if let Some(s) = total_score(summary, settings) {
        m.insert("totalScore".to_string(), json!(s));
    }
    if let Some(s) = summary.scored {
        m.insert("scored".to_string(), json!(s));
    }
    m.insert(
        "groupScores".to_string(),
        group_scores_to_js(&summary.group_scores),
    );

    let by_org: JSMap<String, JSValue> = summary
        .scores_by_organization
        .iter()
        .map(|(org, b)| (org.clone(), JSValue::Object(breakdown_to_js(b))))
        .collect();
    m.insert("scoresByOrganization".to_string(), JSValue::Object(by_org));

    let by_evaluator: JSMap<String, JSValue> = summary
        .scores_by_evaluator
        .iter()
        .map(|(eid, es)| {
            let mut em = breakdown_to_js(&es.breakdown);
            em.insert("name".to_string(), json!(es.display_name));
            em.insert("organization".to_string(), json!(es.organization));
            (eid.to_string(), JSValue::Object(em))
        })
        .collect();
    m.insert("scoresByEvaluator".to_string(), JSValue::Object(by_evaluator));

    let thresholds: Vec<JSValue> = group_verdicts(round, &summary.group_scores)
        .iter()
        .map(|v| {
            let mut vm = JSMap::new();
            vm.insert("group".to_string(), json!(v.group.0));
            vm.insert("abbr".to_string(), json!(v.abbr));
            vm.insert("threshold".to_string(), json!(v.threshold));
            if let Some(s) = v.score {
                vm.insert("score".to_string(), json!(s));
            }
            vm.insert("belowThreshold".to_string(), json!(v.below_threshold));
            JSValue::Object(vm)
        })
        .collect();
    m.insert("thresholds".to_string(), json!(thresholds));
    JSValue::Object(m)
}

fn organizations_to_js(
    round: &ApplicationRound,
    applications: &[ScoredApplication],
    settings: &ScoringSettings,
) -> Vec<JSValue> {
    let organizations: BTreeSet<&String> = applications
        .iter()
        .flat_map(|a| a.summary.scores_by_organization.keys())
        .collect();
    let mut palette = OrganizationPalette::default();
    organizations
        .iter()
        .map(|org| {
            json!({
                "name": org,
                "color": palette.color(org),
                "submitted": round.has_submitted(org),
                "canSubmit": can_submit(round, org, applications, settings),
            })
        })
        .collect()
}

pub fn build_summary_js(
    rounds: &[(&ApplicationRound, Vec<ScoredApplication>)],
    settings: &ScoringSettings,
) -> JSValue {
    let rounds_js: Vec<JSValue> = rounds
        .iter()
        .map(|(round, applications)| {
            let progress = round_progress(applications);
            let applications_js: Vec<JSValue> = applications
                .iter()
                .map(|a| application_to_js(round, a, settings))
                .collect();
            json!({
                "id": round.id.0,
                "name": round.name,
                "progress": {
                    "scored": progress.scored,
                    "total": progress.total,
                },
                "approvalOpen": round.approval_open(),
                "organizations": organizations_to_js(round, applications, settings),
                "applications": applications_js,
            })
        })
        .collect();
    json!({ "rounds": rounds_js })
}
