mod config;
pub mod builder;
pub mod manual;
pub mod palette;

use log::{debug, info, warn};

use std::collections::{BTreeMap, HashMap, HashSet};

pub use crate::config::*;
pub use crate::palette::OrganizationPalette;

// **** Private structures ****

/// Lookup tables shared by all the applications of a round.
struct RoundIndex<'a> {
    weights: HashMap<CriterionId, f64>,
    // Every threshold group, with all the criteria of its subtree.
    threshold_groups: Vec<(&'a CriterionGroup, HashSet<CriterionId>)>,
}

impl<'a> RoundIndex<'a> {
    fn new(round: &'a ApplicationRound) -> RoundIndex<'a> {
        RoundIndex::with_groups(round, &round.threshold_groups())
    }

    fn with_groups(round: &'a ApplicationRound, groups: &[&'a CriterionGroup]) -> RoundIndex<'a> {
        let weights: HashMap<CriterionId, f64> =
            round.criteria.iter().map(|c| (c.id, c.weight)).collect();
        let threshold_groups = groups
            .iter()
            .map(|g| {
                let criteria: HashSet<CriterionId> = resolve_criteria_for_group(round, g)
                    .iter()
                    .map(|c| c.id)
                    .collect();
                debug!(
                    "RoundIndex: group {} ({}) covers criteria {:?}",
                    g.id, g.abbr, criteria
                );
                (*g, criteria)
            })
            .collect();
        RoundIndex {
            weights,
            threshold_groups,
        }
    }

    fn weight_of(&self, criterion: CriterionId) -> Option<f64> {
        self.weights.get(&criterion).copied()
    }

    fn breakdown(&self, scores: &[&Score]) -> ScoreBreakdown {
        ScoreBreakdown {
            score: weighted_average(scores.iter().copied(), |cid| self.weight_of(cid)),
            group_scores: self.group_scores(scores),
        }
    }

    fn group_scores(&self, scores: &[&Score]) -> BTreeMap<GroupId, f64> {
        let mut res: BTreeMap<GroupId, f64> = BTreeMap::new();
        for (group, criteria) in self.threshold_groups.iter() {
            let g_scores: Vec<&Score> = scores
                .iter()
                .copied()
                .filter(|s| criteria.contains(&s.criterion))
                .collect();
            if g_scores.is_empty() {
                continue;
            }
            if let Some(avg) = weighted_average(g_scores, |cid| self.weight_of(cid)) {
                res.insert(group.id, avg);
            }
        }
        res
    }

    fn summarize(&self, application: &Application) -> ScoreSummary {
        if application.scores.is_empty() {
            return ScoreSummary::default();
        }
        let scores = latest_scores(&application.scores);

        let covered: HashSet<CriterionId> = scores
            .iter()
            .map(|s| s.criterion)
            .filter(|cid| self.weights.contains_key(cid))
            .collect();
        let overall = self.breakdown(&scores);

        let mut by_organization: BTreeMap<&str, Vec<&Score>> = BTreeMap::new();
        let mut by_evaluator: BTreeMap<EvaluatorId, Vec<&Score>> = BTreeMap::new();
        for s in scores.iter().copied() {
            by_organization
                .entry(s.evaluator.organization.as_str())
                .or_default()
                .push(s);
            by_evaluator.entry(s.evaluator.id).or_default().push(s);
        }

        let scores_by_organization: BTreeMap<String, ScoreBreakdown> = by_organization
            .iter()
            .map(|(org, o_scores)| (org.to_string(), self.breakdown(o_scores)))
            .collect();

        let scores_by_evaluator: BTreeMap<EvaluatorId, EvaluatorScores> = by_evaluator
            .iter()
            .map(|(eid, e_scores)| {
                // Non-empty by construction.
                let evaluator = &e_scores[0].evaluator;
                let es = EvaluatorScores {
                    display_name: evaluator.display_name(),
                    organization: evaluator.organization.clone(),
                    breakdown: self.breakdown(e_scores),
                };
                (*eid, es)
            })
            .collect();

        ScoreSummary {
            score: overall.score,
            scored: Some(!covered.is_empty() && covered.len() == self.weights.len()),
            group_scores: overall.group_scores,
            scores_by_organization,
            scores_by_evaluator,
        }
    }
}

// **** Aggregation ****

/// All the criteria in the subtree of the given group: the ones assigned
/// directly to it, then the ones of its descendants, depth first.
///
/// The group tree is walked with an explicit stack. A group is never
/// visited twice, so the walk stops even if the tree contains a cycle.
pub fn resolve_criteria_for_group<'a>(
    round: &'a ApplicationRound,
    group: &CriterionGroup,
) -> Vec<&'a Criterion> {
    let mut children: HashMap<GroupId, Vec<GroupId>> = HashMap::new();
    for g in round.criterion_groups.iter() {
        if let Some(parent) = g.parent {
            children.entry(parent).or_default().push(g.id);
        }
    }

    let mut visited: HashSet<GroupId> = HashSet::new();
    let mut pending: Vec<GroupId> = vec![group.id];
    let mut subtree: Vec<GroupId> = Vec::new();
    while let Some(gid) = pending.pop() {
        if !visited.insert(gid) {
            warn!(
                "resolve_criteria_for_group: group {} reached twice from group {}",
                gid, group.id
            );
            continue;
        }
        subtree.push(gid);
        if let Some(cs) = children.get(&gid) {
            // Reversed so that the first child is processed first.
            pending.extend(cs.iter().rev());
        }
    }

    subtree
        .iter()
        .flat_map(|gid| {
            round
                .criteria
                .iter()
                .filter(move |c| c.group == Some(*gid))
        })
        .collect()
}

/// The weighted average of a set of scores.
///
/// Within each criterion, the scores are first averaged per organization, and
/// the organization averages are averaged again. An organization with many
/// evaluators therefore weighs as much as an organization with a single one.
/// The criterion averages are then combined using the criterion weights.
///
/// Only the criteria that have a score take part in the average. Scores for
/// which `weight_of` returns `None` are ignored.
///
/// Returns `None` when there is no score, or when all the scored criteria
/// have a zero weight.
///
/// ```
/// use application_scoring::*;
///
/// let alice = Evaluator::new(EvaluatorId(1), "Org A", "Alice", "Anders", "alice");
/// let scores = vec![
///     Score { id: ScoreId(1), score: 4.0, criterion: CriterionId(1), evaluator: alice.clone() },
///     Score { id: ScoreId(2), score: 8.0, criterion: CriterionId(2), evaluator: alice },
/// ];
/// let avg = weighted_average(&scores, |cid| Some(if cid == CriterionId(1) { 1.0 } else { 3.0 }));
/// assert_eq!(avg, Some(7.0));
/// ```
pub fn weighted_average<'s, I, F>(scores: I, weight_of: F) -> Option<f64>
where
    I: IntoIterator<Item = &'s Score>,
    F: Fn(CriterionId) -> Option<f64>,
{
    let mut by_criterion: BTreeMap<CriterionId, BTreeMap<&'s str, Vec<f64>>> = BTreeMap::new();
    for s in scores {
        by_criterion
            .entry(s.criterion)
            .or_default()
            .entry(s.evaluator.organization.as_str())
            .or_default()
            .push(s.score);
    }

    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;
    for (cid, org_scores) in by_criterion.iter() {
        let weight = match weight_of(*cid) {
            Some(w) => w,
            None => {
                debug!("weighted_average: ignoring scores for unknown criterion {}", cid);
                continue;
            }
        };
        let org_means: Vec<f64> = org_scores.values().map(|v| mean(v)).collect();
        weighted_sum += mean(&org_means) * weight;
        total_weight += weight;
    }

    if total_weight == 0.0 {
        return None;
    }
    let res = weighted_sum / total_weight;
    if res.is_finite() {
        Some(res)
    } else {
        None
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// The weighted average of each threshold group, over the scores of the
/// criteria in the group's subtree. Groups without any such score are absent.
pub fn compute_group_scores(
    scores: &[&Score],
    threshold_groups: &[&CriterionGroup],
    round: &ApplicationRound,
) -> BTreeMap<GroupId, f64> {
    RoundIndex::with_groups(round, threshold_groups).group_scores(scores)
}

/// Keeps the last score of every (evaluator, criterion) pair, in the original order.
fn latest_scores(scores: &[Score]) -> Vec<&Score> {
    let mut last_idx: HashMap<(EvaluatorId, CriterionId), usize> = HashMap::new();
    for (idx, s) in scores.iter().enumerate() {
        last_idx.insert((s.evaluator.id, s.criterion), idx);
    }
    if last_idx.len() < scores.len() {
        debug!(
            "latest_scores: dropping {} superseded scores",
            scores.len() - last_idx.len()
        );
    }
    scores
        .iter()
        .enumerate()
        .filter(|(idx, s)| last_idx.get(&(s.evaluator.id, s.criterion)) == Some(idx))
        .map(|(_, s)| s)
        .collect()
}

/// Computes the derived scoring fields of a single application.
///
/// This is the entry point after reloading one application.
pub fn score_application(round: &ApplicationRound, application: &Application) -> ScoreSummary {
    RoundIndex::new(round).summarize(application)
}

/// Computes the derived scoring fields of the given applications.
///
/// Arguments:
/// * `round` provides the criteria and the criterion groups. Its own list of
/// applications is not read.
/// * `applications` the applications to score, usually `round.applications`.
///
/// The applications are returned in the same order, paired with their summary.
pub fn add_application_scores(
    round: &ApplicationRound,
    applications: &[Application],
) -> Vec<ScoredApplication> {
    info!(
        "add_application_scores: round {:?}: {} applications, {} criteria, {} threshold groups",
        round.name,
        applications.len(),
        round.criteria.len(),
        round.threshold_groups().len()
    );
    let index = RoundIndex::new(round);
    applications
        .iter()
        .map(|app| {
            let summary = index.summarize(app);
            debug!(
                "add_application_scores: application {} ({:?}): score {:?} scored {:?}",
                app.id, app.name, summary.score, summary.scored
            );
            ScoredApplication {
                application: app.clone(),
                summary,
            }
        })
        .collect()
}

/// Scores all the applications of every round.
pub fn add_scores(rounds: &[ApplicationRound]) -> Vec<Vec<ScoredApplication>> {
    rounds
        .iter()
        .map(|r| add_application_scores(r, &r.applications))
        .collect()
}

/// Summaries of the applications of a round, indexed by application.
///
/// Refreshing an application replaces its previous summary, so the most
/// recent reload of an application always wins.
#[derive(Debug, Clone, Default)]
pub struct ScoreBoard {
    summaries: BTreeMap<ApplicationId, ScoreSummary>,
}

impl ScoreBoard {
    pub fn new() -> ScoreBoard {
        ScoreBoard::default()
    }

    pub fn refresh(&mut self, round: &ApplicationRound, applications: &[Application]) {
        let index = RoundIndex::new(round);
        for app in applications.iter() {
            self.summaries.insert(app.id, index.summarize(app));
        }
    }

    pub fn get(&self, application: ApplicationId) -> Option<&ScoreSummary> {
        self.summaries.get(&application)
    }

    pub fn remove(&mut self, application: ApplicationId) -> Option<ScoreSummary> {
        self.summaries.remove(&application)
    }

    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }
}

// **** Presentation helpers ****

/// Compares every group score with the threshold of its group, in the order
/// of the groups in the round.
pub fn group_verdicts(
    round: &ApplicationRound,
    group_scores: &BTreeMap<GroupId, f64>,
) -> Vec<GroupVerdict> {
    round
        .criterion_groups
        .iter()
        .filter(|g| g.is_threshold_group())
        .filter_map(|g| {
            let threshold = g.threshold?;
            let score = group_scores.get(&g.id).copied();
            Some(GroupVerdict {
                group: g.id,
                abbr: g.abbr.clone(),
                threshold,
                score,
                below_threshold: score.map(|s| s < threshold).unwrap_or(false),
            })
        })
        .collect()
}

/// The final score, as displayed to users.
pub fn total_score(summary: &ScoreSummary, settings: &ScoringSettings) -> Option<f64> {
    summary.score.map(|s| s * settings.final_score_multiplier)
}

/// The final score with 3 significant digits. A score of 0 is shown as `0`.
pub fn format_total_score(summary: &ScoreSummary, settings: &ScoringSettings) -> Option<String> {
    total_score(summary, settings).map(|s| {
        if s == 0.0 {
            "0".to_string()
        } else {
            to_precision(s, 3)
        }
    })
}

/// Formats a number with the given number of significant digits.
///
/// This follows the conventions of `Number.prototype.toPrecision` in
/// JavaScript, so that exported values read the same as the ones displayed
/// in the browser: `14` becomes `"14.0"` and `1234` becomes `"1.23e+3"`.
pub fn to_precision(value: f64, digits: usize) -> String {
    let digits = digits.max(1);
    if !value.is_finite() {
        return value.to_string();
    }
    if value == 0.0 {
        return format!("{:.*}", digits - 1, 0.0);
    }
    // The exponent after rounding: 9.99 with 2 digits is 1.0e1.
    let scientific = format!("{:.*e}", digits - 1, value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };
    if exponent < -6 || exponent >= digits as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{}", mantissa, sign, exponent.abs())
    } else {
        let decimals = (digits as i32 - 1 - exponent).max(0) as usize;
        format!("{:.*}", decimals, value)
    }
}

/// Sorts the applications in place. The sort is stable.
pub fn order_applications(applications: &mut [ScoredApplication], order: ApplicationOrder) {
    match order {
        ApplicationOrder::Name => {
            applications.sort_by(|a, b| a.application.name.cmp(&b.application.name))
        }
        ApplicationOrder::Score => applications.sort_by(|a, b| {
            let sa = a.summary.score.unwrap_or(0.0);
            let sb = b.summary.score.unwrap_or(0.0);
            sb.total_cmp(&sa)
        }),
        ApplicationOrder::Unevaluated => {
            applications.sort_by_key(|a| a.application.scores.len())
        }
    }
}

pub fn round_progress(applications: &[ScoredApplication]) -> RoundProgress {
    RoundProgress {
        scored: applications
            .iter()
            .filter(|a| a.summary.is_scored())
            .count(),
        total: applications.len(),
    }
}

/// Whether an organization can lock in its scores for the round: it has not
/// submitted yet, and every application is fully scored.
pub fn can_submit(
    round: &ApplicationRound,
    organization: &str,
    applications: &[ScoredApplication],
    settings: &ScoringSettings,
) -> bool {
    settings.allow_submit
        && round.accepts_scores_from(organization)
        && round_progress(applications).is_complete()
}

// **** Validation ****

/// Checks the structure of a round.
///
/// Scores that refer to unknown criteria are not an error: the aggregation
/// ignores them.
pub fn validate_round(round: &ApplicationRound) -> Result<(), ScoringErrors> {
    let mut group_ids: HashSet<GroupId> = HashSet::new();
    for g in round.criterion_groups.iter() {
        if !group_ids.insert(g.id) {
            return Err(ScoringErrors::DuplicateGroup(g.id));
        }
    }
    let parents: HashMap<GroupId, Option<GroupId>> = round
        .criterion_groups
        .iter()
        .map(|g| (g.id, g.parent))
        .collect();
    for g in round.criterion_groups.iter() {
        if let Some(parent) = g.parent {
            if !group_ids.contains(&parent) {
                return Err(ScoringErrors::UnknownParentGroup {
                    group: g.id,
                    parent,
                });
            }
        }
        // Walking up from any group must reach a root within as many steps
        // as there are groups.
        let mut cur = g.parent;
        let mut steps = 0;
        while let Some(p) = cur {
            steps += 1;
            if p == g.id || steps > group_ids.len() {
                return Err(ScoringErrors::GroupCycle(g.id));
            }
            cur = parents.get(&p).copied().flatten();
        }
    }

    let mut criterion_ids: HashSet<CriterionId> = HashSet::new();
    for c in round.criteria.iter() {
        if !criterion_ids.insert(c.id) {
            return Err(ScoringErrors::DuplicateCriterion(c.id));
        }
        if let Some(group) = c.group {
            if !group_ids.contains(&group) {
                return Err(ScoringErrors::UnknownCriterionGroup {
                    criterion: c.id,
                    group,
                });
            }
        }
        if !c.weight.is_finite() || c.weight < 0.0 {
            return Err(ScoringErrors::InvalidWeight {
                criterion: c.id,
                weight: c.weight,
            });
        }
    }

    let mut application_ids: HashSet<ApplicationId> = HashSet::new();
    for a in round.applications.iter() {
        if !application_ids.insert(a.id) {
            return Err(ScoringErrors::DuplicateApplication(a.id));
        }
    }
    Ok(())
}
