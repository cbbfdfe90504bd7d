// Records for the JSON documents read by evalscore.
// They follow the format of the evaluation REST API and of the UI settings file.

use crate::evaluation::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: u32,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub organization: Option<String>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub id: u32,
    pub score: f64,
    pub criterion: u32,
    pub evaluator: UserRecord,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: u32,
    pub comment: String,
    pub criterion_group: u32,
    pub evaluator: UserRecord,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub id: u32,
    pub name: String,
    // A string or a number, depending on the import.
    pub application_id: Option<JSValue>,
    #[serde(default)]
    pub scores: Vec<ScoreRecord>,
    #[serde(default)]
    pub comments: Vec<CommentRecord>,
    pub approved: Option<bool>,
    #[serde(default)]
    pub evaluating_organizations: Vec<JSValue>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CriterionRecord {
    pub id: u32,
    pub name: String,
    pub group: Option<u32>,
    #[serde(default)]
    pub weight: f64,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CriterionGroupRecord {
    pub id: u32,
    pub name: String,
    pub abbr: Option<String>,
    pub parent: Option<u32>,
    pub threshold: Option<f64>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RoundRecord {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub criteria: Vec<CriterionRecord>,
    #[serde(default)]
    pub criterion_groups: Vec<CriterionGroupRecord>,
    #[serde(default)]
    pub applications: Vec<ApplicationRecord>,
    #[serde(default)]
    pub submitted_organizations: Vec<String>,
    pub scoring_model: Option<String>,
    pub scoring_completed: Option<bool>,
}

/// The round file holds either one round or the list returned by the API.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoundsDocument {
    Many(Vec<RoundRecord>),
    One(RoundRecord),
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SettingsRecord {
    #[serde(rename = "serverRoot")]
    pub server_root: Option<String>,
    #[serde(rename = "maxScore")]
    pub max_score: Option<u32>,
    #[serde(rename = "finalScoreMultiplier")]
    pub final_score_multiplier: Option<f64>,
    #[serde(rename = "showScoresFromOtherUsers")]
    pub show_scores_from_other_users: Option<bool>,
    #[serde(rename = "allowSubmit")]
    pub allow_submit: Option<bool>,
}

impl SettingsRecord {
    pub fn to_settings(&self) -> ScoringSettings {
        let default = ScoringSettings::DEFAULT_SETTINGS;
        ScoringSettings {
            max_score: self.max_score.unwrap_or(default.max_score),
            final_score_multiplier: self
                .final_score_multiplier
                .unwrap_or(default.final_score_multiplier),
            show_scores_from_other_users: self
                .show_scores_from_other_users
                .unwrap_or(default.show_scores_from_other_users),
            allow_submit: self.allow_submit.unwrap_or(default.allow_submit),
        }
    }
}

impl UserRecord {
    pub fn to_evaluator(&self) -> Evaluator {
        Evaluator {
            id: EvaluatorId(self.id),
            organization: self.organization.clone().unwrap_or_default(),
            first_name: self.first_name.clone().unwrap_or_default(),
            last_name: self.last_name.clone().unwrap_or_default(),
            username: self.username.clone(),
        }
    }
}

fn js_to_string(v: &JSValue) -> String {
    match v {
        JSValue::String(s) => s.clone(),
        x => x.to_string(),
    }
}

fn read_scoring_model(round_name: &str, model: &Option<String>) -> ScoringModel {
    match model.as_deref() {
        None | Some("Organizations average") => ScoringModel::OrganizationsAverage,
        Some("Evaluators average") => ScoringModel::EvaluatorsAverage,
        Some(x) => {
            warn!(
                "round {:?}: unknown scoring model {:?}, using organizations average",
                round_name, x
            );
            ScoringModel::OrganizationsAverage
        }
    }
}

impl ApplicationRecord {
    pub fn to_application(&self) -> Application {
        Application {
            id: ApplicationId(self.id),
            name: self.name.clone(),
            application_id: self.application_id.as_ref().and_then(|v| match v {
                JSValue::Null => None,
                x => Some(js_to_string(x)),
            }),
            scores: self
                .scores
                .iter()
                .map(|s| Score {
                    id: ScoreId(s.id),
                    score: s.score,
                    criterion: CriterionId(s.criterion),
                    evaluator: s.evaluator.to_evaluator(),
                })
                .collect(),
            comments: self
                .comments
                .iter()
                .map(|c| Comment {
                    id: CommentId(c.id),
                    comment: c.comment.clone(),
                    criterion_group: GroupId(c.criterion_group),
                    evaluator: c.evaluator.to_evaluator(),
                })
                .collect(),
            approved: self.approved.unwrap_or(false),
            evaluating_organizations: self
                .evaluating_organizations
                .iter()
                .map(js_to_string)
                .collect(),
        }
    }
}

impl RoundRecord {
    /// Converts the record and checks the structure of the round.
    pub fn to_round(&self) -> EvalResult<ApplicationRound> {
        let round = ApplicationRound {
            id: RoundId(self.id),
            name: self.name.clone(),
            criteria: self
                .criteria
                .iter()
                .map(|c| Criterion {
                    id: CriterionId(c.id),
                    name: c.name.clone(),
                    group: c.group.map(GroupId),
                    weight: c.weight,
                })
                .collect(),
            criterion_groups: self
                .criterion_groups
                .iter()
                .map(|g| CriterionGroup {
                    id: GroupId(g.id),
                    name: g.name.clone(),
                    abbr: g.abbr.clone().unwrap_or_default(),
                    parent: g.parent.map(GroupId),
                    threshold: g.threshold,
                })
                .collect(),
            applications: self
                .applications
                .iter()
                .map(|a| a.to_application())
                .collect(),
            submitted_organizations: self.submitted_organizations.clone(),
            scoring_model: read_scoring_model(&self.name, &self.scoring_model),
            scoring_completed: self.scoring_completed.unwrap_or(false),
        };
        validate_round(&round).context(InvalidRoundSnafu {
            name: self.name.clone(),
        })?;
        Ok(round)
    }
}

pub fn read_rounds(path: &str) -> EvalResult<Vec<ApplicationRound>> {
    info!("Attempting to read round file {:?}", path);
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let doc: RoundsDocument =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    let records = match doc {
        RoundsDocument::Many(l) => l,
        RoundsDocument::One(r) => vec![r],
    };
    debug!("read_rounds: {} rounds in {:?}", records.len(), path);
    records.iter().map(|r| r.to_round()).collect()
}

pub fn read_settings(path: &str) -> EvalResult<ScoringSettings> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let record: SettingsRecord =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    debug!("read_settings: {:?}", record);
    Ok(record.to_settings())
}

pub fn read_summary(path: &str) -> EvalResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })
}
