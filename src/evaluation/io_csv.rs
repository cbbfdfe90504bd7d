// Primitives for reading and writing CSV files.

use csv::{ReaderBuilder, WriterBuilder};

use crate::evaluation::{
    io_common::{simplify_file_name, ParsedRow, SheetColumns},
    *,
};

pub fn read_csv_scores(path: &str) -> EvalResult<Vec<ParsedRow>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;

    let mut records = rdr.records();
    let header: Vec<String> = match records.next() {
        Some(r) => r
            .context(CsvLineParseSnafu {})?
            .iter()
            .map(|s| s.to_string())
            .collect(),
        None => {
            return EmptySheetSnafu {
                path: simplify_file_name(path),
            }
            .fail()
        }
    };
    debug!("read_csv_scores: header: {:?}", header);
    let columns = SheetColumns::from_header(&header, path)?;

    let mut res: Vec<ParsedRow> = Vec::new();
    for (idx, record) in records.enumerate() {
        let cells: Vec<String> = record
            .context(CsvLineParseSnafu {})?
            .iter()
            .map(|s| s.to_string())
            .collect();
        // The header is on line 1.
        if let Some(parsed) = columns.parse_row(idx + 2, &cells)? {
            res.push(parsed);
        }
    }
    info!(
        "read_csv_scores: {} scores in {}",
        res.len(),
        simplify_file_name(path)
    );
    Ok(res)
}

fn group_name(round: &ApplicationRound, group: Option<GroupId>) -> String {
    group
        .and_then(|gid| round.group(gid))
        .map(|g| g.name.clone())
        .unwrap_or_default()
}

pub fn score_header() -> Vec<String> {
    [
        io_common::APPLICATION_COLUMN,
        io_common::GROUP_COLUMN,
        io_common::CRITERION_COLUMN,
        io_common::ORGANIZATION_COLUMN,
        io_common::FIRST_NAME_COLUMN,
        io_common::LAST_NAME_COLUMN,
        io_common::USERNAME_COLUMN,
        io_common::SCORE_COLUMN,
        io_common::COMMENT_COLUMN,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// For each application, one row per individual score, then one row per comment.
pub fn score_rows(round: &ApplicationRound, applications: &[ScoredApplication]) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    for sa in applications.iter() {
        let app = &sa.application;
        for s in app.scores.iter() {
            let criterion = round.criterion(s.criterion);
            rows.push(vec![
                app.name.clone(),
                group_name(round, criterion.and_then(|c| c.group)),
                criterion.map(|c| c.name.clone()).unwrap_or_default(),
                s.evaluator.organization.clone(),
                s.evaluator.first_name.clone(),
                s.evaluator.last_name.clone(),
                s.evaluator.username.clone(),
                s.score.to_string(),
                String::new(),
            ]);
        }
        for c in app.comments.iter() {
            rows.push(vec![
                app.name.clone(),
                group_name(round, Some(c.criterion_group)),
                String::new(),
                c.evaluator.organization.clone(),
                c.evaluator.first_name.clone(),
                c.evaluator.last_name.clone(),
                c.evaluator.username.clone(),
                String::new(),
                c.comment.clone(),
            ]);
        }
    }
    rows
}

pub fn summary_header(round: &ApplicationRound) -> Vec<String> {
    let mut header = vec!["Application number".to_string(), "Id".to_string()];
    header.extend(round.criterion_groups.iter().map(|g| g.name.clone()));
    header.push("Total score".to_string());
    header.push("Approved".to_string());
    header.push("Comments".to_string());
    header
}

/// One row per application, with the scores of the threshold groups.
pub fn summary_rows(
    round: &ApplicationRound,
    applications: &[ScoredApplication],
    settings: &ScoringSettings,
) -> Vec<Vec<String>> {
    applications
        .iter()
        .map(|sa| {
            let app = &sa.application;
            let mut row = vec![app.name.clone(), app.application_id.clone().unwrap_or_default()];
            row.extend(round.criterion_groups.iter().map(|g| {
                sa.summary
                    .group_scores
                    .get(&g.id)
                    .map(|s| s.to_string())
                    .unwrap_or_default()
            }));
            row.push(format_total_score(&sa.summary, settings).unwrap_or_default());
            row.push(app.approved.to_string());
            let comments: Vec<String> = app
                .comments
                .iter()
                .map(|c| {
                    format!(
                        "{} {} - {}: {}",
                        c.evaluator.first_name,
                        c.evaluator.last_name,
                        group_name(round, Some(c.criterion_group)),
                        c.comment
                    )
                })
                .collect();
            row.push(comments.join("\n"));
            row
        })
        .collect()
}

fn write_rows(path: &str, rows: &[Vec<String>]) -> EvalResult<()> {
    let mut wtr = WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .context(CsvWriteSnafu { path })?;
    for row in rows.iter() {
        wtr.write_record(row).context(CsvWriteSnafu { path })?;
    }
    wtr.flush().context(WritingOutputSnafu { path })?;
    Ok(())
}

pub fn write_scores_csv(
    path: &str,
    rounds: &[(&ApplicationRound, Vec<ScoredApplication>)],
) -> EvalResult<()> {
    let mut rows = vec![score_header()];
    for (round, applications) in rounds.iter() {
        rows.extend(score_rows(round, applications));
    }
    write_rows(path, &rows)?;
    info!("write_scores_csv: {} rows written to {}", rows.len() - 1, path);
    Ok(())
}

/// Each round starts with its own header, since the groups differ between rounds.
pub fn write_summary_csv(
    path: &str,
    rounds: &[(&ApplicationRound, Vec<ScoredApplication>)],
    settings: &ScoringSettings,
) -> EvalResult<()> {
    let mut rows = Vec::new();
    for (round, applications) in rounds.iter() {
        rows.push(summary_header(round));
        rows.extend(summary_rows(round, applications, settings));
    }
    write_rows(path, &rows)?;
    info!("write_summary_csv: summary written to {}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use application_scoring::builder::Builder;

    fn round() -> ApplicationRound {
        let alice = Evaluator::new(EvaluatorId(1), "Org A", "Alice", "Anders", "alice");
        let mut builder = Builder::new(RoundId(1), "Call")
            .group(GroupId(1), "Impact", "IMP", None, Some(3.0))
            .unwrap()
            .group(GroupId(2), "Budget", "BUD", None, None)
            .unwrap()
            .criterion(CriterionId(1), "Reach", Some(GroupId(1)), 1.0)
            .unwrap()
            .criterion(CriterionId(2), "Cost", Some(GroupId(2)), 1.0)
            .unwrap()
            .application(ApplicationId(1), "Solar")
            .unwrap()
            .application(ApplicationId(2), "Wind")
            .unwrap();
        builder
            .add_score(ApplicationId(1), CriterionId(1), &alice, 3.0)
            .unwrap();
        builder
            .add_score(ApplicationId(1), CriterionId(2), &alice, 2.5)
            .unwrap();
        builder
            .add_comment(ApplicationId(1), GroupId(1), &alice, "Good, but vague")
            .unwrap();
        builder
            .add_comment(ApplicationId(1), GroupId(2), &alice, "Too expensive")
            .unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn scores_then_comments() {
        let round = round();
        let scored = add_application_scores(&round, &round.applications);
        let rows = score_rows(&round, &scored);
        assert_eq!(rows.len(), 4);
        assert_eq!(
            rows[0],
            vec!["Solar", "Impact", "Reach", "Org A", "Alice", "Anders", "alice", "3", ""]
        );
        assert_eq!(rows[1][7], "2.5");
        assert_eq!(rows[3][1], "Budget");
        assert_eq!(rows[3][8], "Too expensive");
    }

    #[test]
    fn comments_follow_the_scores_of_their_application() {
        let mut round = round();
        let bob = Evaluator::new(EvaluatorId(2), "Org B", "Bo", "Berg", "bob");
        round.applications[1].scores.push(Score {
            id: ScoreId(10),
            score: 4.0,
            criterion: CriterionId(2),
            evaluator: bob.clone(),
        });
        round.applications[1].comments.push(Comment {
            id: CommentId(10),
            comment: "Cheap".to_string(),
            criterion_group: GroupId(2),
            evaluator: bob,
        });
        let scored = add_application_scores(&round, &round.applications);
        let rows = score_rows(&round, &scored);
        let layout: Vec<(&str, &str, &str)> = rows
            .iter()
            .map(|r| (r[0].as_str(), r[7].as_str(), r[8].as_str()))
            .collect();
        assert_eq!(
            layout,
            vec![
                ("Solar", "3", ""),
                ("Solar", "2.5", ""),
                ("Solar", "", "Good, but vague"),
                ("Solar", "", "Too expensive"),
                ("Wind", "4", ""),
                ("Wind", "", "Cheap"),
            ]
        );
    }

    #[test]
    fn summary_with_threshold_groups() {
        let round = round();
        let scored = add_application_scores(&round, &round.applications);
        let settings = ScoringSettings::DEFAULT_SETTINGS;
        assert_eq!(
            summary_header(&round),
            vec!["Application number", "Id", "Impact", "Budget", "Total score", "Approved", "Comments"]
        );
        let rows = summary_rows(&round, &scored, &settings);
        // (3 + 2.5) / 2 * 4
        assert_eq!(rows[0][2], "3");
        assert_eq!(rows[0][3], "");
        assert_eq!(rows[0][4], "11.0");
        assert_eq!(
            rows[0][6],
            "Alice Anders - Impact: Good, but vague\nAlice Anders - Budget: Too expensive"
        );
        assert_eq!(rows[1], vec!["Wind", "", "", "", "", "false", ""]);
    }

    #[test]
    fn exported_scores_read_back() {
        let round = round();
        let scored = add_application_scores(&round, &round.applications);
        let path = format!(
            "{}/evalscore_exported_scores.csv",
            std::env::temp_dir().display()
        );
        write_scores_csv(&path, &[(&round, scored)]).unwrap();
        let rows = read_csv_scores(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].entry.criterion, "Reach");
        assert_eq!(rows[1].score, 2.5);
        assert_eq!(rows[1].entry.username, "alice");
    }
}
