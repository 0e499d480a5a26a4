//! Cascade classification of structural errors
//!
//! A single defect inside a `oneOf` makes every other alternative fail as
//! well, so raw evaluation output buries the real problem under errors from
//! branches the author never meant. The classifier groups errors by the
//! disjunction that produced them, decides per group which errors describe
//! the defect, and moves the rest to the suppressed list.
//!
//! Copyright (c) 2025 Rulekit Team
//! Licensed under the Apache-2.0 license

use crate::validation::error::{BranchFrame, ErrorKind, ValidationError};
use crate::validation::path::JsonPath;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Outcome of [`classify`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    /// Errors that describe the defects, in input order
    pub kept: Vec<ValidationError>,
    /// Cascade errors, in input order, each annotated with the reason
    pub suppressed: Vec<ValidationError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct GroupKey {
    enclosing: Vec<BranchFrame>,
    anchor: JsonPath,
    schema_path: String,
}

#[derive(Debug)]
struct Group {
    key: GroupKey,
    anchor_error: Option<usize>,
    /// Branch index to the errors raised anywhere inside that branch
    members: BTreeMap<usize, Vec<usize>>,
}

impl Group {
    fn depth(&self) -> usize {
        self.key.enclosing.len()
    }

    /// The frame that places an error directly or transitively in `branch`
    fn frame(&self, branch: usize) -> BranchFrame {
        BranchFrame::new(self.key.anchor.clone(), self.key.schema_path.clone(), branch)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    /// Keep this branch, drop the anchor and the other branches
    KeepBranch(usize),
    /// Drop the anchor and every branch; a more specific error survives
    SuppressAll,
    /// Keep exactly this error of the group
    Representative(usize),
}

impl Decision {
    fn reason(&self) -> &'static str {
        match self {
            Decision::KeepBranch(_) => "alternative-branch",
            Decision::SuppressAll => "specific-error",
            Decision::Representative(_) => "representative",
        }
    }
}

/// Split `errors` into kept and suppressed errors.
///
/// Errors raised outside every disjunction are kept unchanged. The result
/// is deterministic, and classifying `kept` again returns it as is.
pub fn classify(errors: Vec<ValidationError>) -> Classification {
    if errors.is_empty() {
        return Classification::default();
    }

    let groups = collect_groups(&errors);
    let index: HashMap<&GroupKey, usize> = groups.iter().enumerate().map(|(i, g)| (&g.key, i)).collect();
    let decisions: Vec<Decision> = groups.iter().map(|group| decide(group, &errors)).collect();

    let mut verdicts: Vec<Option<Value>> = errors
        .iter()
        .enumerate()
        .map(|(position, error)| verdict(position, error, &groups, &index, &decisions))
        .collect();

    suppress_duplicates(&errors, &mut verdicts);

    if verdicts.iter().all(Option::is_some) {
        let fallback = errors
            .iter()
            .position(|e| e.is_disjunction() && e.branches.is_empty())
            .unwrap_or(0);
        verdicts[fallback] = None;
    }

    let mut classification = Classification::default();
    for (error, verdict) in errors.into_iter().zip(verdicts) {
        match verdict {
            None => classification.kept.push(error),
            Some(details) => classification.suppressed.push(annotate(error, details)),
        }
    }

    debug!(
        groups = groups.len(),
        kept = classification.kept.len(),
        suppressed = classification.suppressed.len(),
        "Classified validation errors"
    );
    classification
}

fn collect_groups(errors: &[ValidationError]) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    let mut lookup: HashMap<GroupKey, usize> = HashMap::new();

    let mut slot = |key: GroupKey, groups: &mut Vec<Group>| -> usize {
        *lookup.entry(key.clone()).or_insert_with(|| {
            groups.push(Group {
                key,
                anchor_error: None,
                members: BTreeMap::new(),
            });
            groups.len() - 1
        })
    };

    for (position, error) in errors.iter().enumerate() {
        for (depth, frame) in error.branches.iter().enumerate() {
            let key = GroupKey {
                enclosing: error.branches[..depth].to_vec(),
                anchor: frame.anchor.clone(),
                schema_path: frame.schema_path.clone(),
            };
            let group = slot(key, &mut groups);
            groups[group].members.entry(frame.index).or_default().push(position);
        }

        if let Some(schema_path) = error.schema_path.as_ref().filter(|_| error.is_disjunction()) {
            let key = GroupKey {
                enclosing: error.branches.clone(),
                anchor: error.path.clone(),
                schema_path: schema_path.clone(),
            };
            let group = slot(key, &mut groups);
            groups[group].anchor_error.get_or_insert(position);
        }
    }

    groups
}

/// Whether `error` sits directly in `branch` of `group`, not in a nested
/// disjunction
fn directly_in(error: &ValidationError, group: &Group, branch: usize) -> bool {
    error.branches.len() == group.depth() + 1 && error.innermost_branch() == Some(&group.frame(branch))
}

fn is_rejected(group: &Group, branch: usize, members: &[usize], errors: &[ValidationError]) -> bool {
    let anchor = &group.key.anchor;
    members.iter().map(|&i| &errors[i]).any(|error| {
        if !directly_in(error, group, branch) {
            return false;
        }
        match error.kind {
            ErrorKind::ConstantViolation => error.path == *anchor || error.path.is_child_of(anchor),
            ErrorKind::TypeMismatch => error.path == *anchor,
            _ => false,
        }
    })
}

fn decide(group: &Group, errors: &[ValidationError]) -> Decision {
    let intended = group
        .members
        .iter()
        .filter(|(branch, members)| !is_rejected(group, **branch, members, errors))
        .min_by_key(|(_, members)| members.len());
    if let Some((branch, _)) = intended {
        return Decision::KeepBranch(*branch);
    }

    let anchor = &group.key.anchor;
    let has_specific = errors.iter().any(|error| {
        !error.is_disjunction()
            && error.branches == group.key.enclosing
            && error.path.starts_with(anchor)
            && error.path != *anchor
    });
    if has_specific {
        return Decision::SuppressAll;
    }

    let discriminator_enum = group.members.iter().find_map(|(branch, members)| {
        members.iter().copied().find(|&i| {
            let error = &errors[i];
            error.kind == ErrorKind::EnumViolation && directly_in(error, group, *branch) && error.path.is_child_of(anchor)
        })
    });
    let representative = discriminator_enum
        .or(group.anchor_error)
        .or_else(|| group.members.values().flatten().copied().min())
        .unwrap_or(0);
    Decision::Representative(representative)
}

/// `None` when the error is kept, otherwise the suppression details
fn verdict(
    position: usize,
    error: &ValidationError,
    groups: &[Group],
    index: &HashMap<&GroupKey, usize>,
    decisions: &[Decision],
) -> Option<Value> {
    for (depth, frame) in error.branches.iter().enumerate() {
        let key = GroupKey {
            enclosing: error.branches[..depth].to_vec(),
            anchor: frame.anchor.clone(),
            schema_path: frame.schema_path.clone(),
        };
        let Some(&group) = index.get(&key) else {
            continue;
        };
        let decision = decisions[group];
        let allowed = match decision {
            Decision::KeepBranch(branch) => frame.index == branch,
            Decision::SuppressAll => false,
            Decision::Representative(chosen) => chosen == position,
        };
        if !allowed {
            return Some(json!({
                "suppressedBy": decision.reason(),
                "anchor": groups[group].key.anchor.to_string(),
                "branch": frame.index,
            }));
        }
    }

    if !error.is_disjunction() {
        return None;
    }
    let schema_path = error.schema_path.as_ref()?;
    let key = GroupKey {
        enclosing: error.branches.clone(),
        anchor: error.path.clone(),
        schema_path: schema_path.clone(),
    };
    let group = *index.get(&key)?;
    let reason = match decisions[group] {
        Decision::Representative(chosen) if chosen == position => return None,
        Decision::KeepBranch(_) => "resolved-disjunction",
        other => other.reason(),
    };
    Some(json!({
        "suppressedBy": reason,
        "anchor": error.path.to_string(),
    }))
}

/// A kept branch error repeating a kept error raised outside that branch
/// (same kind, same path) adds nothing; the outer one stays.
fn suppress_duplicates(errors: &[ValidationError], verdicts: &mut [Option<Value>]) {
    for position in 0..errors.len() {
        let error = &errors[position];
        if error.branches.is_empty() || verdicts[position].is_some() {
            continue;
        }
        let outer = errors.iter().enumerate().find(|(other, candidate)| {
            *other != position
                && verdicts[*other].is_none()
                && candidate.kind == error.kind
                && candidate.path == error.path
                && candidate.branches.len() < error.branches.len()
                && error.branches.starts_with(&candidate.branches)
        });
        if let Some((_, outer)) = outer {
            let frame = &error.branches[outer.branches.len()];
            verdicts[position] = Some(json!({
                "suppressedBy": "duplicate",
                "anchor": frame.anchor.to_string(),
                "branch": frame.index,
            }));
        }
    }
}

fn annotate(mut error: ValidationError, details: Value) -> ValidationError {
    let merged = match (error.details.take(), details) {
        (Some(Value::Object(mut existing)), Value::Object(added)) => {
            existing.extend(added);
            Value::Object(existing)
        }
        (_, details) => details,
    };
    error.details = Some(merged);
    error
}

/// Suppression reason recorded on a suppressed error, if any
pub fn suppression_reason(error: &ValidationError) -> Option<&str> {
    error
        .details
        .as_ref()
        .and_then(Value::as_object)
        .and_then(|details| details.get("suppressedBy"))
        .and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(text: &str) -> JsonPath {
        text.parse().unwrap()
    }

    fn frame(anchor: &str, index: usize) -> BranchFrame {
        BranchFrame::new(path(anchor), format!("#/{}/oneOf", anchor), index)
    }

    fn anchor(at: &str, enclosing: Vec<BranchFrame>) -> ValidationError {
        ValidationError::new(ErrorKind::DisjunctionViolation, path(at), "no match")
            .with_schema_path(format!("#/{}/oneOf", at))
            .with_branches(enclosing)
    }

    fn member(kind: ErrorKind, at: &str, branches: Vec<BranchFrame>) -> ValidationError {
        ValidationError::new(kind, path(at), "member").with_branches(branches)
    }

    fn kept_summary(classification: &Classification) -> Vec<(ErrorKind, String)> {
        classification.kept.iter().map(|e| (e.kind, e.path.to_string())).collect()
    }

    #[test]
    fn test_errors_outside_disjunctions_pass_through() {
        let errors = vec![
            member(ErrorKind::RequiredMissing, "id", vec![]),
            member(ErrorKind::PatternViolation, "name", vec![]),
        ];
        let classification = classify(errors.clone());
        assert_eq!(classification.kept, errors);
        assert!(classification.suppressed.is_empty());
        assert_eq!(classify(Vec::new()), Classification::default());
    }

    #[test]
    fn test_intended_branch_wins() {
        let errors = vec![
            anchor("definition", vec![]),
            member(ErrorKind::RequiredMissing, "definition.value", vec![frame("definition", 0)]),
            member(ErrorKind::ConstantViolation, "definition.type", vec![frame("definition", 1)]),
            member(ErrorKind::ConstantViolation, "definition.type", vec![frame("definition", 2)]),
        ];
        let classification = classify(errors);
        assert_eq!(
            kept_summary(&classification),
            vec![(ErrorKind::RequiredMissing, "definition.value".to_string())]
        );
        assert_eq!(classification.suppressed.len(), 3);
        assert_eq!(suppression_reason(&classification.suppressed[0]), Some("resolved-disjunction"));
        assert_eq!(suppression_reason(&classification.suppressed[1]), Some("alternative-branch"));
        assert_eq!(
            classification.suppressed[1].details.as_ref().unwrap()["anchor"],
            json!("definition")
        );
    }

    #[test]
    fn test_fewest_errors_then_first_branch() {
        let errors = vec![
            anchor("x", vec![]),
            member(ErrorKind::RequiredMissing, "x.a", vec![frame("x", 0)]),
            member(ErrorKind::RequiredMissing, "x.b", vec![frame("x", 0)]),
            member(ErrorKind::RequiredMissing, "x.c", vec![frame("x", 1)]),
            member(ErrorKind::RequiredMissing, "x.d", vec![frame("x", 2)]),
        ];
        let classification = classify(errors);
        assert_eq!(kept_summary(&classification), vec![(ErrorKind::RequiredMissing, "x.c".to_string())]);
    }

    #[test]
    fn test_specific_error_suppresses_whole_group() {
        let errors = vec![
            member(ErrorKind::EnumViolation, "definition.type", vec![]),
            anchor("definition", vec![]),
            member(ErrorKind::ConstantViolation, "definition.type", vec![frame("definition", 0)]),
            member(ErrorKind::ConstantViolation, "definition.type", vec![frame("definition", 1)]),
        ];
        let classification = classify(errors);
        assert_eq!(
            kept_summary(&classification),
            vec![(ErrorKind::EnumViolation, "definition.type".to_string())]
        );
        assert!(classification
            .suppressed
            .iter()
            .all(|e| suppression_reason(e) == Some("specific-error")));
    }

    #[test]
    fn test_representative_prefers_discriminator_enum() {
        let errors = vec![
            anchor("when", vec![]),
            member(ErrorKind::ConstantViolation, "when.type", vec![frame("when", 0)]),
            member(ErrorKind::EnumViolation, "when.type", vec![frame("when", 1)]),
            member(ErrorKind::ConstantViolation, "when.type", vec![frame("when", 1)]),
        ];
        let classification = classify(errors);
        assert_eq!(kept_summary(&classification), vec![(ErrorKind::EnumViolation, "when.type".to_string())]);

        let errors = vec![
            anchor("when", vec![]),
            member(ErrorKind::TypeMismatch, "when", vec![frame("when", 0)]),
            member(ErrorKind::TypeMismatch, "when", vec![frame("when", 1)]),
        ];
        let classification = classify(errors);
        assert_eq!(
            kept_summary(&classification),
            vec![(ErrorKind::DisjunctionViolation, "when".to_string())]
        );
    }

    #[test]
    fn test_nested_groups_follow_the_chain() {
        let outer = frame("", 0);
        let errors = vec![
            anchor("", vec![]),
            member(ErrorKind::ConstantViolation, "structure", vec![frame("", 1)]),
            anchor("definition", vec![outer.clone()]),
            member(
                ErrorKind::RequiredMissing,
                "definition.value",
                vec![outer.clone(), frame("definition", 0)],
            ),
            member(
                ErrorKind::ConstantViolation,
                "definition.type",
                vec![outer.clone(), frame("definition", 1)],
            ),
        ];
        let classification = classify(errors);
        assert_eq!(
            kept_summary(&classification),
            vec![(ErrorKind::RequiredMissing, "definition.value".to_string())]
        );
    }

    #[test]
    fn test_never_empty_and_idempotent() {
        let errors = vec![
            anchor("", vec![]),
            member(ErrorKind::ConstantViolation, "structure", vec![frame("", 0)]),
            member(ErrorKind::ConstantViolation, "structure", vec![frame("", 1)]),
        ];
        let first = classify(errors);
        assert_eq!(kept_summary(&first), vec![(ErrorKind::DisjunctionViolation, "".to_string())]);

        let second = classify(first.kept.clone());
        assert_eq!(second.kept, first.kept);
        assert!(second.suppressed.is_empty());
    }

    #[test]
    fn test_branch_copy_of_outer_error_is_a_duplicate() {
        let errors = vec![
            member(ErrorKind::TypeMismatch, "definition", vec![]),
            anchor("", vec![]),
            member(ErrorKind::TypeMismatch, "definition", vec![frame("", 0)]),
            member(ErrorKind::ConstantViolation, "structure", vec![frame("", 1)]),
        ];
        let classification = classify(errors);
        assert_eq!(
            kept_summary(&classification),
            vec![(ErrorKind::TypeMismatch, "definition".to_string())]
        );
        assert!(classification.kept[0].branches.is_empty());

        let duplicate = classification
            .suppressed
            .iter()
            .find(|e| suppression_reason(e) == Some("duplicate"))
            .unwrap();
        assert_eq!(duplicate.branches, vec![frame("", 0)]);
        assert_eq!(duplicate.details.as_ref().unwrap()["anchor"], json!(""));
        assert_eq!(duplicate.details.as_ref().unwrap()["branch"], json!(0));

        let again = classify(classification.kept.clone());
        assert_eq!(again.kept, classification.kept);
    }

    #[test]
    fn test_same_path_different_kind_is_not_a_duplicate() {
        let errors = vec![
            member(ErrorKind::PatternViolation, "x.name", vec![]),
            anchor("x", vec![]),
            member(ErrorKind::RequiredMissing, "x.name", vec![frame("x", 0)]),
            member(ErrorKind::ConstantViolation, "x.type", vec![frame("x", 1)]),
        ];
        let classification = classify(errors);
        assert_eq!(
            kept_summary(&classification),
            vec![
                (ErrorKind::PatternViolation, "x.name".to_string()),
                (ErrorKind::RequiredMissing, "x.name".to_string())
            ]
        );
    }

    #[test]
    fn test_ambiguous_anchor_is_kept() {
        let ambiguous = anchor("definition", vec![]).with_code("validation.one-of.ambiguous");
        let classification = classify(vec![ambiguous.clone()]);
        assert_eq!(classification.kept, vec![ambiguous]);
    }
}
