// Primitives shared by the score sheet readers.

use std::collections::HashMap;
use std::path::Path;

use crate::evaluation::*;

pub const APPLICATION_COLUMN: &str = "Application";
pub const GROUP_COLUMN: &str = "Criterion group";
pub const CRITERION_COLUMN: &str = "Criterion";
pub const ORGANIZATION_COLUMN: &str = "Organization";
pub const FIRST_NAME_COLUMN: &str = "First name";
pub const LAST_NAME_COLUMN: &str = "Last name";
pub const USERNAME_COLUMN: &str = "Username";
pub const SCORE_COLUMN: &str = "Score";
pub const COMMENT_COLUMN: &str = "Comment";

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// One row of a score sheet.
#[derive(PartialEq, Debug, Clone)]
pub struct ParsedScore {
    pub lineno: usize,
    pub application: String,
    pub criterion: String,
    pub organization: String,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
}

#[derive(PartialEq, Debug, Clone)]
pub struct ParsedRow {
    pub entry: ParsedScore,
    pub score: f64,
}

/// The positions of the columns of a score sheet, found from its header.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SheetColumns {
    application: usize,
    criterion: usize,
    organization: usize,
    first_name: usize,
    last_name: usize,
    username: Option<usize>,
    score: usize,
}

impl SheetColumns {
    pub fn from_header(header: &[String], path: &str) -> EvalResult<SheetColumns> {
        let find = |name: &str| header.iter().position(|h| h.trim() == name);
        let require = |name: &str| {
            find(name).context(MissingColumnSnafu {
                name,
                path: simplify_file_name(path),
            })
        };
        Ok(SheetColumns {
            application: require(APPLICATION_COLUMN)?,
            criterion: require(CRITERION_COLUMN)?,
            organization: require(ORGANIZATION_COLUMN)?,
            first_name: require(FIRST_NAME_COLUMN)?,
            last_name: require(LAST_NAME_COLUMN)?,
            username: find(USERNAME_COLUMN),
            score: require(SCORE_COLUMN)?,
        })
    }

    /// Rows without a score are comment rows: they give `None`.
    pub fn parse_row(&self, lineno: usize, cells: &[String]) -> EvalResult<Option<ParsedRow>> {
        let cell = |idx: usize| cells.get(idx).map(|s| s.trim()).unwrap_or("");
        let raw_score = cell(self.score);
        if raw_score.is_empty() {
            return Ok(None);
        }
        let score: f64 = match raw_score.parse() {
            Ok(x) => x,
            Err(_) => {
                return InvalidScoreSnafu {
                    lineno,
                    content: raw_score,
                }
                .fail();
            }
        };
        let first_name = cell(self.first_name).to_string();
        let last_name = cell(self.last_name).to_string();
        let username = match self.username.map(cell) {
            Some(u) if !u.is_empty() => u.to_string(),
            _ => format!("{} {}", first_name, last_name).trim().to_string(),
        };
        Ok(Some(ParsedRow {
            entry: ParsedScore {
                lineno,
                application: cell(self.application).to_string(),
                criterion: cell(self.criterion).to_string(),
                organization: cell(self.organization).to_string(),
                first_name,
                last_name,
                username,
            },
            score,
        }))
    }
}

/// Replaces the scores of the applications of the round with the rows of a sheet.
///
/// Applications and criteria are matched by name. Evaluators are identified by
/// their organization and names, and numbered in the order in which they first
/// appear. Returns the number of scores attached.
pub fn attach_scores(round: &mut ApplicationRound, rows: &[ParsedRow]) -> usize {
    let criteria: HashMap<&str, CriterionId> = round
        .criteria
        .iter()
        .map(|c| (c.name.as_str(), c.id))
        .collect();
    // On duplicate names, the rows go to the first application.
    let mut applications: HashMap<&str, usize> = HashMap::new();
    for (idx, a) in round.applications.iter().enumerate() {
        if applications.contains_key(a.name.as_str()) {
            warn!(
                "attach_scores: round {:?}: several applications are named {:?}, only the first one receives scores",
                round.name, a.name
            );
            continue;
        }
        applications.insert(a.name.as_str(), idx);
    }

    let mut evaluators: HashMap<(String, String, String, String), Evaluator> = HashMap::new();
    let mut new_scores: Vec<Vec<Score>> = vec![Vec::new(); round.applications.len()];
    let mut count = 0;
    for row in rows.iter() {
        let entry = &row.entry;
        let app_idx = match applications.get(entry.application.as_str()) {
            Some(idx) => *idx,
            None => {
                warn!(
                    "attach_scores: line {}: unknown application {:?} in round {:?}",
                    entry.lineno, entry.application, round.name
                );
                continue;
            }
        };
        let criterion = match criteria.get(entry.criterion.as_str()) {
            Some(cid) => *cid,
            None => {
                warn!(
                    "attach_scores: line {}: unknown criterion {:?} in round {:?}",
                    entry.lineno, entry.criterion, round.name
                );
                continue;
            }
        };
        let key = (
            entry.organization.clone(),
            entry.first_name.clone(),
            entry.last_name.clone(),
            entry.username.clone(),
        );
        let next_id = EvaluatorId(evaluators.len() as u32 + 1);
        let evaluator = evaluators.entry(key).or_insert_with(|| Evaluator {
            id: next_id,
            organization: entry.organization.clone(),
            first_name: entry.first_name.clone(),
            last_name: entry.last_name.clone(),
            username: entry.username.clone(),
        });
        new_scores[app_idx].push(Score {
            id: ScoreId(entry.lineno as u32),
            score: row.score,
            criterion,
            evaluator: evaluator.clone(),
        });
        count += 1;
    }
    for (app, scores) in round.applications.iter_mut().zip(new_scores) {
        app.scores = scores;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use application_scoring::builder::Builder;

    fn header() -> Vec<String> {
        ["Application", "Criterion", "Organization", "First name", "Last name", "Score"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn missing_column_is_reported() {
        let header = row(&["Application", "Criterion", "Score"]);
        assert!(matches!(
            SheetColumns::from_header(&header, "/tmp/sheet.csv"),
            Err(EvalError::MissingColumn { .. })
        ));
    }

    #[test]
    fn comment_rows_are_skipped() {
        let cols = SheetColumns::from_header(&header(), "sheet.csv").unwrap();
        let parsed = cols
            .parse_row(3, &row(&["Solar", "", "Org A", "Ann", "Lee", ""]))
            .unwrap();
        assert_eq!(parsed, None);
    }

    #[test]
    fn username_defaults_to_full_name() {
        let cols = SheetColumns::from_header(&header(), "sheet.csv").unwrap();
        let parsed = cols
            .parse_row(2, &row(&["Solar", "Reach", "Org A", "Ann", "Lee", " 4.5 "]))
            .unwrap()
            .unwrap();
        assert_eq!(parsed.score, 4.5);
        assert_eq!(parsed.entry.username, "Ann Lee");
    }

    #[test]
    fn bad_score_is_an_error() {
        let cols = SheetColumns::from_header(&header(), "sheet.csv").unwrap();
        assert!(matches!(
            cols.parse_row(5, &row(&["Solar", "Reach", "Org A", "Ann", "Lee", "high"])),
            Err(EvalError::InvalidScore { lineno: 5, .. })
        ));
    }

    #[test]
    fn attach_by_name() {
        let mut round = Builder::new(RoundId(1), "Call")
            .criterion(CriterionId(1), "Reach", None, 1.0)
            .unwrap()
            .application(ApplicationId(1), "Solar")
            .unwrap()
            .application(ApplicationId(2), "Wind")
            .unwrap()
            .build()
            .unwrap();
        let cols = SheetColumns::from_header(&header(), "sheet.csv").unwrap();
        let rows: Vec<ParsedRow> = [
            row(&["Wind", "Reach", "Org A", "Ann", "Lee", "3"]),
            row(&["Solar", "Reach", "Org B", "Bo", "Kim", "2"]),
            row(&["Solar", "Reach", "Org A", "Ann", "Lee", "5"]),
            row(&["Solar", "Budget", "Org A", "Ann", "Lee", "5"]),
            row(&["Tidal", "Reach", "Org A", "Ann", "Lee", "5"]),
        ]
        .iter()
        .enumerate()
        .filter_map(|(idx, r)| cols.parse_row(idx + 2, r).unwrap())
        .collect();
        assert_eq!(attach_scores(&mut round, &rows), 3);
        let solar = &round.applications[0];
        assert_eq!(solar.scores.len(), 2);
        assert_eq!(solar.scores[0].evaluator.id, EvaluatorId(2));
        assert_eq!(solar.scores[1].evaluator.id, EvaluatorId(1));
        assert_eq!(round.applications[1].scores[0].score, 3.0);
    }

    #[test]
    fn duplicate_application_names_go_to_the_first() {
        let mut round = Builder::new(RoundId(1), "Call")
            .criterion(CriterionId(1), "Reach", None, 1.0)
            .unwrap()
            .application(ApplicationId(1), "Solar")
            .unwrap()
            .application(ApplicationId(2), "Solar")
            .unwrap()
            .build()
            .unwrap();
        let cols = SheetColumns::from_header(&header(), "sheet.csv").unwrap();
        let rows: Vec<ParsedRow> = cols
            .parse_row(2, &row(&["Solar", "Reach", "Org A", "Ann", "Lee", "4"]))
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(attach_scores(&mut round, &rows), 1);
        assert_eq!(round.applications[0].scores.len(), 1);
        assert!(round.applications[1].scores.is_empty());
    }
}
