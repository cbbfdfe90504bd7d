// ********* Identifiers ***********

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Display;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
        pub struct $name(pub u32);

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(RoundId);
id_type!(GroupId);
id_type!(CriterionId);
id_type!(ApplicationId);
id_type!(ScoreId);
id_type!(CommentId);
id_type!(
    /// The user account of an evaluator.
    EvaluatorId
);

// ********* Input data structures ***********

/// A user scoring applications on behalf of an organization.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Evaluator {
    pub id: EvaluatorId,
    pub organization: String,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
}

impl Evaluator {
    pub fn new(
        id: EvaluatorId,
        organization: &str,
        first_name: &str,
        last_name: &str,
        username: &str,
    ) -> Evaluator {
        Evaluator {
            id,
            organization: organization.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            username: username.to_string(),
        }
    }

    /// "First Last" when both names are filled in, the username otherwise.
    pub fn display_name(&self) -> String {
        if !self.first_name.is_empty() && !self.last_name.is_empty() {
            format!("{} {}", self.first_name, self.last_name)
        } else {
            self.username.clone()
        }
    }
}

/// One evaluator's rating of one application against one criterion.
#[derive(PartialEq, Debug, Clone)]
pub struct Score {
    pub id: ScoreId,
    pub score: f64,
    pub criterion: CriterionId,
    pub evaluator: Evaluator,
}

/// A free-text remark, attached to a criterion group rather than a criterion.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Comment {
    pub id: CommentId,
    pub comment: String,
    pub criterion_group: GroupId,
    pub evaluator: Evaluator,
}

#[derive(PartialEq, Debug, Clone)]
pub struct Criterion {
    pub id: CriterionId,
    pub name: String,
    /// Criteria without a group are scored but never part of a group score.
    pub group: Option<GroupId>,
    pub weight: f64,
}

/// A node in the tree of criterion groups.
///
/// Groups with a threshold are the only ones that receive an aggregate score.
#[derive(PartialEq, Debug, Clone)]
pub struct CriterionGroup {
    pub id: GroupId,
    pub name: String,
    pub abbr: String,
    pub parent: Option<GroupId>,
    pub threshold: Option<f64>,
}

impl CriterionGroup {
    /// A threshold of 0 is the same as no threshold.
    pub fn is_threshold_group(&self) -> bool {
        matches!(self.threshold, Some(t) if t != 0.0)
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct Application {
    pub id: ApplicationId,
    pub name: String,
    /// Identifier used by the applicant-facing systems, if any.
    pub application_id: Option<String>,
    pub scores: Vec<Score>,
    pub comments: Vec<Comment>,
    pub approved: bool,
    pub evaluating_organizations: Vec<String>,
}

impl Application {
    pub fn new(id: ApplicationId, name: &str) -> Application {
        Application {
            id,
            name: name.to_string(),
            application_id: None,
            scores: Vec::new(),
            comments: Vec::new(),
            approved: false,
            evaluating_organizations: Vec::new(),
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct ApplicationRound {
    pub id: RoundId,
    pub name: String,
    pub criteria: Vec<Criterion>,
    pub criterion_groups: Vec<CriterionGroup>,
    pub applications: Vec<Application>,
    /// Organizations that have locked in their scores for this round.
    pub submitted_organizations: Vec<String>,
    pub scoring_model: ScoringModel,
    pub scoring_completed: bool,
}

impl ApplicationRound {
    pub fn has_submitted(&self, organization: &str) -> bool {
        self.submitted_organizations
            .iter()
            .any(|o| o.as_str() == organization)
    }

    /// Whether evaluators of this organization may still add scores and comments.
    pub fn accepts_scores_from(&self, organization: &str) -> bool {
        !self.has_submitted(organization)
    }

    /// Approving applications becomes possible once at least one organization
    /// has submitted, or when the round has been closed by an administrator.
    pub fn approval_open(&self) -> bool {
        self.scoring_completed || !self.submitted_organizations.is_empty()
    }

    pub fn threshold_groups(&self) -> Vec<&CriterionGroup> {
        self.criterion_groups
            .iter()
            .filter(|g| g.is_threshold_group())
            .collect()
    }

    pub fn root_groups(&self) -> Vec<&CriterionGroup> {
        self.criterion_groups
            .iter()
            .filter(|g| g.parent.is_none())
            .collect()
    }

    pub fn group(&self, id: GroupId) -> Option<&CriterionGroup> {
        self.criterion_groups.iter().find(|g| g.id == id)
    }

    pub fn criterion(&self, id: CriterionId) -> Option<&Criterion> {
        self.criteria.iter().find(|c| c.id == id)
    }
}

// ******** Output data structures *********

/// The overall score and the per-group scores computed from a set of scores.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct ScoreBreakdown {
    /// `None` when no usable aggregate exists.
    pub score: Option<f64>,
    /// Only threshold groups with at least one scored criterion are present.
    pub group_scores: BTreeMap<GroupId, f64>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct EvaluatorScores {
    pub display_name: String,
    pub organization: String,
    pub breakdown: ScoreBreakdown,
}

/// The derived scoring fields of an application.
///
/// This is a projection of the application's scores: it is always recomputed
/// as a whole, never patched.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct ScoreSummary {
    pub score: Option<f64>,
    /// Every criterion of the round has at least one score.
    /// Unset when the application has no scores at all.
    pub scored: Option<bool>,
    pub group_scores: BTreeMap<GroupId, f64>,
    pub scores_by_organization: BTreeMap<String, ScoreBreakdown>,
    pub scores_by_evaluator: BTreeMap<EvaluatorId, EvaluatorScores>,
}

impl ScoreSummary {
    pub fn is_scored(&self) -> bool {
        self.scored.unwrap_or(false)
    }

    /// The partial scores to display, labelled according to the scoring model.
    pub fn breakdowns(&self, model: ScoringModel) -> Vec<(String, &ScoreBreakdown)> {
        match model {
            ScoringModel::OrganizationsAverage => self
                .scores_by_organization
                .iter()
                .map(|(org, b)| (org.clone(), b))
                .collect(),
            ScoringModel::EvaluatorsAverage => self
                .scores_by_evaluator
                .values()
                .map(|es| (es.display_name.clone(), &es.breakdown))
                .collect(),
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct ScoredApplication {
    pub application: Application,
    pub summary: ScoreSummary,
}

/// Outcome of comparing a group score with the threshold of its group.
#[derive(PartialEq, Debug, Clone)]
pub struct GroupVerdict {
    pub group: GroupId,
    pub abbr: String,
    pub threshold: f64,
    pub score: Option<f64>,
    pub below_threshold: bool,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub struct RoundProgress {
    pub scored: usize,
    pub total: usize,
}

impl RoundProgress {
    pub fn is_complete(&self) -> bool {
        self.scored == self.total
    }
}

/// Errors in the structure of a round. The aggregation itself never fails.
#[derive(PartialEq, Debug, Clone)]
pub enum ScoringErrors {
    DuplicateGroup(GroupId),
    DuplicateCriterion(CriterionId),
    DuplicateApplication(ApplicationId),
    UnknownParentGroup { group: GroupId, parent: GroupId },
    UnknownCriterionGroup { criterion: CriterionId, group: GroupId },
    GroupCycle(GroupId),
    InvalidWeight { criterion: CriterionId, weight: f64 },
    UnknownApplication(ApplicationId),
    UnknownCriterion(CriterionId),
}

impl Error for ScoringErrors {}

impl Display for ScoringErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScoringErrors::DuplicateGroup(id) => write!(f, "duplicate criterion group {}", id),
            ScoringErrors::DuplicateCriterion(id) => write!(f, "duplicate criterion {}", id),
            ScoringErrors::DuplicateApplication(id) => write!(f, "duplicate application {}", id),
            ScoringErrors::UnknownParentGroup { group, parent } => {
                write!(f, "group {} has unknown parent group {}", group, parent)
            }
            ScoringErrors::UnknownCriterionGroup { criterion, group } => {
                write!(f, "criterion {} belongs to unknown group {}", criterion, group)
            }
            ScoringErrors::GroupCycle(id) => {
                write!(f, "criterion group {} is its own ancestor", id)
            }
            ScoringErrors::InvalidWeight { criterion, weight } => {
                write!(f, "criterion {} has invalid weight {}", criterion, weight)
            }
            ScoringErrors::UnknownApplication(id) => write!(f, "unknown application {}", id),
            ScoringErrors::UnknownCriterion(id) => write!(f, "unknown criterion {}", id),
        }
    }
}

// ********* Configuration **********

/// Which partial scores are shown next to the overall score of an application.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub enum ScoringModel {
    #[default]
    OrganizationsAverage,
    EvaluatorsAverage,
}

/// The order in which applications of a round are listed.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ApplicationOrder {
    Name,
    /// Best score first. Applications without a score count as 0.
    Score,
    /// Applications with the fewest scores first.
    Unevaluated,
}

#[derive(PartialEq, Debug, Clone)]
pub struct ScoringSettings {
    /// Upper bound of an individual score.
    pub max_score: u32,
    /// The total score shown to users is the weighted average times this factor.
    pub final_score_multiplier: f64,
    pub show_scores_from_other_users: bool,
    pub allow_submit: bool,
}

impl ScoringSettings {
    pub const DEFAULT_SETTINGS: ScoringSettings = ScoringSettings {
        max_score: 5,
        final_score_multiplier: 4.0,
        show_scores_from_other_users: true,
        allow_submit: true,
    };
}

impl Default for ScoringSettings {
    fn default() -> Self {
        ScoringSettings::DEFAULT_SETTINGS
    }
}
