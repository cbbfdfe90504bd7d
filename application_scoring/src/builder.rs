pub use crate::config::*;

/// A builder for assembling a round.
///
/// Groups may be declared in any order: the tree is only checked by `build`.
///
/// ```
/// use application_scoring::builder::Builder;
/// use application_scoring::*;
///
/// let mut builder = Builder::new(RoundId(1), "Spring call")
///     .group(GroupId(1), "Impact", "IMP", None, Some(3.0))?
///     .criterion(CriterionId(1), "Reach", Some(GroupId(1)), 1.0)?
///     .application(ApplicationId(1), "Solar schools")?;
///
/// let alice = Evaluator::new(EvaluatorId(1), "Org A", "Alice", "Anders", "alice");
/// builder.add_score(ApplicationId(1), CriterionId(1), &alice, 4.0)?;
///
/// let round = builder.build()?;
/// let summary = score_application(&round, &round.applications[0]);
/// assert_eq!(summary.score, Some(4.0));
/// # Ok::<(), ScoringErrors>(())
/// ```
pub struct Builder {
    pub(crate) _round: ApplicationRound,
    _next_score: u32,
    _next_comment: u32,
}

impl Builder {
    pub fn new(id: RoundId, name: &str) -> Builder {
        Builder {
            _round: ApplicationRound {
                id,
                name: name.to_string(),
                criteria: Vec::new(),
                criterion_groups: Vec::new(),
                applications: Vec::new(),
                submitted_organizations: Vec::new(),
                scoring_model: ScoringModel::default(),
                scoring_completed: false,
            },
            _next_score: 1,
            _next_comment: 1,
        }
    }

    pub fn scoring_model(mut self, model: ScoringModel) -> Builder {
        self._round.scoring_model = model;
        self
    }

    pub fn submitted(mut self, organization: &str) -> Builder {
        self._round
            .submitted_organizations
            .push(organization.to_string());
        self
    }

    pub fn group(
        mut self,
        id: GroupId,
        name: &str,
        abbr: &str,
        parent: Option<GroupId>,
        threshold: Option<f64>,
    ) -> Result<Builder, ScoringErrors> {
        if self._round.group(id).is_some() {
            return Err(ScoringErrors::DuplicateGroup(id));
        }
        self._round.criterion_groups.push(CriterionGroup {
            id,
            name: name.to_string(),
            abbr: abbr.to_string(),
            parent,
            threshold,
        });
        Ok(self)
    }

    pub fn criterion(
        mut self,
        id: CriterionId,
        name: &str,
        group: Option<GroupId>,
        weight: f64,
    ) -> Result<Builder, ScoringErrors> {
        if self._round.criterion(id).is_some() {
            return Err(ScoringErrors::DuplicateCriterion(id));
        }
        self._round.criteria.push(Criterion {
            id,
            name: name.to_string(),
            group,
            weight,
        });
        Ok(self)
    }

    pub fn application(mut self, id: ApplicationId, name: &str) -> Result<Builder, ScoringErrors> {
        if self._round.applications.iter().any(|a| a.id == id) {
            return Err(ScoringErrors::DuplicateApplication(id));
        }
        self._round.applications.push(Application::new(id, name));
        Ok(self)
    }

    /// Adds a score to an application declared earlier.
    ///
    /// The criterion must be known. A later score of the same evaluator for
    /// the same criterion supersedes this one.
    pub fn add_score(
        &mut self,
        application: ApplicationId,
        criterion: CriterionId,
        evaluator: &Evaluator,
        score: f64,
    ) -> Result<(), ScoringErrors> {
        if self._round.criterion(criterion).is_none() {
            return Err(ScoringErrors::UnknownCriterion(criterion));
        }
        let id = ScoreId(self._next_score);
        let app = self.application_mut(application)?;
        app.scores.push(Score {
            id,
            score,
            criterion,
            evaluator: evaluator.clone(),
        });
        self._next_score += 1;
        Ok(())
    }

    pub fn add_comment(
        &mut self,
        application: ApplicationId,
        group: GroupId,
        evaluator: &Evaluator,
        comment: &str,
    ) -> Result<(), ScoringErrors> {
        let id = CommentId(self._next_comment);
        let app = self.application_mut(application)?;
        app.comments.push(Comment {
            id,
            comment: comment.to_string(),
            criterion_group: group,
            evaluator: evaluator.clone(),
        });
        self._next_comment += 1;
        Ok(())
    }

    fn application_mut(&mut self, id: ApplicationId) -> Result<&mut Application, ScoringErrors> {
        self._round
            .applications
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(ScoringErrors::UnknownApplication(id))
    }

    /// Checks the round and returns it.
    pub fn build(self) -> Result<ApplicationRound, ScoringErrors> {
        crate::validate_round(&self._round)?;
        Ok(self._round)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_duplicates() {
        let res = Builder::new(RoundId(1), "r")
            .group(GroupId(1), "a", "A", None, None)
            .unwrap()
            .group(GroupId(1), "b", "B", None, None);
        assert!(matches!(res, Err(ScoringErrors::DuplicateGroup(GroupId(1)))));
    }

    #[test]
    fn rejects_scores_for_unknown_targets() {
        let mut b = Builder::new(RoundId(1), "r")
            .criterion(CriterionId(1), "c", None, 1.0)
            .unwrap();
        let e = Evaluator::new(EvaluatorId(1), "Org", "", "", "e");
        assert_eq!(
            b.add_score(ApplicationId(7), CriterionId(1), &e, 1.0),
            Err(ScoringErrors::UnknownApplication(ApplicationId(7)))
        );
        assert_eq!(
            b.add_score(ApplicationId(7), CriterionId(2), &e, 1.0),
            Err(ScoringErrors::UnknownCriterion(CriterionId(2)))
        );
    }

    #[test]
    fn parents_are_checked_at_build_time() {
        let b = Builder::new(RoundId(1), "r")
            .group(GroupId(2), "child", "C", Some(GroupId(1)), None)
            .unwrap();
        assert_eq!(
            b.build(),
            Err(ScoringErrors::UnknownParentGroup {
                group: GroupId(2),
                parent: GroupId(1)
            })
        );

        let round = Builder::new(RoundId(1), "r")
            .group(GroupId(2), "child", "C", Some(GroupId(1)), None)
            .unwrap()
            .group(GroupId(1), "parent", "P", None, None)
            .unwrap()
            .submitted("Org A")
            .scoring_model(ScoringModel::EvaluatorsAverage)
            .build()
            .unwrap();
        assert_eq!(round.root_groups().len(), 1);
        assert!(round.has_submitted("Org A"));
        assert_eq!(round.scoring_model, ScoringModel::EvaluatorsAverage);
    }

    #[test]
    fn comments_are_attached() {
        let mut b = Builder::new(RoundId(1), "r")
            .group(GroupId(1), "g", "G", None, None)
            .unwrap()
            .application(ApplicationId(1), "app")
            .unwrap();
        let e = Evaluator::new(EvaluatorId(1), "Org", "", "", "e");
        b.add_comment(ApplicationId(1), GroupId(1), &e, "Solid plan")
            .unwrap();
        b.add_comment(ApplicationId(1), GroupId(1), &e, "Budget unclear")
            .unwrap();
        let round = b.build().unwrap();
        let comments = &round.applications[0].comments;
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[1].id, CommentId(2));
    }
}
