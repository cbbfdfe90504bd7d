/*!

This is the long-form manual for `application_scoring` and `evalscore`.

## How scores are aggregated

A round defines a tree of criterion groups and a list of weighted criteria.
Every criterion belongs to at most one group. Evaluators, each working for an
organization, give a numeric score to an application for some criteria.

The score of an application is computed in three steps:
1. For each criterion, the scores are averaged per organization.
2. The organization averages are averaged, which gives one score per criterion.
   Each organization counts once, however many of its evaluators scored.
3. The criterion scores are combined with the weights of the criteria. Criteria
   without any score are left out entirely: they do not count as zero.

An evaluator who scores the same criterion twice only keeps the last score.

Groups that have a `threshold` also receive a score: the same weighted average,
restricted to the criteria of the group and of all its subgroups. A group score
below the threshold of its group is flagged in the output.
A threshold of `0` counts as no threshold.

The same computation is repeated with the scores of each organization alone and
of each evaluator alone.

An application is `scored` when every criterion of the round has at least one
score. An application without scores has no score at all (not zero).

## Input formats

### Round file (`--input`)

A JSON document with a round, or a list of rounds, in the format of the
evaluation REST API:

```json
{
  "id": 1,
  "name": "Innovation call",
  "scoring_model": "Organizations average",
  "submitted_organizations": [],
  "criterion_groups": [
    {"id": 1, "name": "Impact", "abbr": "IMP", "parent": null, "threshold": 3}
  ],
  "criteria": [
    {"id": 10, "name": "Reach", "group": 1, "weight": 1}
  ],
  "applications": [
    {
      "id": 1,
      "name": "Solar schools",
      "scores": [
        {"id": 1, "score": 4, "criterion": 10,
         "evaluator": {"id": 100, "username": "alice", "first_name": "Alice",
                       "last_name": "Anders", "organization": "Org A"}}
      ],
      "comments": []
    }
  ]
}
```

`scoring_model` is either `Organizations average` (the default) or
`Evaluators average`. It selects which partial scores are listed first.

### Settings file (`--settings`)

```json
{"maxScore": 5, "finalScoreMultiplier": 4, "showScoresFromOtherUsers": true, "allowSubmit": true}
```

The total score of an application is its score times `finalScoreMultiplier`.

### Score sheets (`--scores`)

A `csv` or `xlsx` file with one score per row, as produced by the score export.
The first row holds the column names. The columns `Application`, `Criterion`,
`Organization`, `First name`, `Last name` and `Score` are required; `Username`
is optional. Applications and criteria are matched by name. Rows without a
score (comment rows) are skipped.

When a score sheet is provided, it replaces the scores found in the round file.

## Outputs

* `--out` the JSON summary of every round (`stdout` prints it).
* `--reference` a previous summary; the run fails if the summaries differ.
* `--export-scores` a CSV file with one row per score and per comment.
* `--export-summary` a CSV file with one row per application.

*/
