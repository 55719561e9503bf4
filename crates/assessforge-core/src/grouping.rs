//! Shared-resource grouping.
//!
//! Questions carry their own passage/audio reference. Groups are keyed by the
//! exact reference value and kept in first-encounter order (walking questions
//! by `order`), so the canonical pick is a single stable scan for the largest
//! group with ties going to the earliest group.

use std::collections::HashMap;

use serde::Serialize;

use crate::model::Question;

/// Which shared resource to group by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Passage,
    Audio,
}

impl ResourceKind {
    fn reference(self, question: &Question) -> Option<&str> {
        let value = match self {
            ResourceKind::Passage => question.passage.as_deref(),
            ResourceKind::Audio => question.audio_url.as_deref(),
        };
        value.filter(|v| !v.trim().is_empty())
    }
}

/// Questions sharing one exact resource reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceGroup {
    pub kind: ResourceKind,
    pub reference: String,
    /// Member question ids in `order` sequence.
    pub question_ids: Vec<String>,
}

impl ResourceGroup {
    pub fn len(&self) -> usize {
        self.question_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.question_ids.is_empty()
    }
}

/// Partition questions by their `kind` reference. Questions without one are
/// left out.
pub fn group_by_resource<'a, I>(questions: I, kind: ResourceKind) -> Vec<ResourceGroup>
where
    I: IntoIterator<Item = &'a Question>,
{
    let mut sorted: Vec<&Question> = questions.into_iter().collect();
    sorted.sort_by_key(|q| q.order);

    let mut groups: Vec<ResourceGroup> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for question in sorted {
        let Some(reference) = kind.reference(question) else {
            continue;
        };
        match index.get(reference) {
            Some(&i) => groups[i].question_ids.push(question.id.clone()),
            None => {
                index.insert(reference, groups.len());
                groups.push(ResourceGroup {
                    kind,
                    reference: reference.to_string(),
                    question_ids: vec![question.id.clone()],
                });
            }
        }
    }

    groups
}

/// The largest group, earliest-first on ties. `None` when nothing is grouped.
pub fn canonical_group(groups: &[ResourceGroup]) -> Option<&ResourceGroup> {
    let mut best: Option<&ResourceGroup> = None;
    for group in groups {
        if best.map_or(true, |b| group.len() > b.len()) {
            best = Some(group);
        }
    }
    best
}

/// Canonical reference value for `kind`, if any question carries one.
pub fn canonical_reference<'a, I>(questions: I, kind: ResourceKind) -> Option<String>
where
    I: IntoIterator<Item = &'a Question>,
{
    let groups = group_by_resource(questions, kind);
    let canonical = canonical_group(&groups).map(|g| g.reference.clone());
    if let Some(reference) = &canonical {
        tracing::debug!(
            ?kind,
            groups = groups.len(),
            reference = %truncate(reference, 40),
            "selected canonical resource"
        );
    }
    canonical
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        text.chars().take(max_chars).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionKind;

    fn with_passages(passages: &[Option<&str>]) -> Vec<Question> {
        passages
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let mut q = Question::new(QuestionKind::Essay, format!("q{i}"));
                q.id = format!("q{}", i + 1);
                q.order = i as u32 + 1;
                q.passage = p.map(str::to_string);
                q
            })
            .collect()
    }

    #[test]
    fn majority_passage_wins() {
        let qs = with_passages(&[Some("A"), Some("A"), Some("B")]);
        assert_eq!(
            canonical_reference(&qs, ResourceKind::Passage).as_deref(),
            Some("A")
        );
    }

    #[test]
    fn tie_goes_to_first_seen() {
        let qs = with_passages(&[Some("A"), Some("B")]);
        assert_eq!(
            canonical_reference(&qs, ResourceKind::Passage).as_deref(),
            Some("A")
        );
    }

    #[test]
    fn first_seen_follows_order_not_storage() {
        let mut qs = with_passages(&[Some("A"), Some("B")]);
        qs[0].order = 2;
        qs[1].order = 1;
        assert_eq!(
            canonical_reference(&qs, ResourceKind::Passage).as_deref(),
            Some("B")
        );
    }

    #[test]
    fn later_majority_beats_earlier_minority() {
        let qs = with_passages(&[Some("A"), Some("B"), None, Some("B")]);
        let groups = group_by_resource(&qs, ResourceKind::Passage);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].question_ids, vec!["q2", "q4"]);
        assert_eq!(canonical_group(&groups).unwrap().reference, "B");
    }

    #[test]
    fn ungrouped_questions_yield_no_canonical() {
        let qs = with_passages(&[None, Some(""), None]);
        assert!(group_by_resource(&qs, ResourceKind::Passage).is_empty());
        assert_eq!(canonical_reference(&qs, ResourceKind::Passage), None);
    }

    #[test]
    fn audio_grouping_is_independent_of_passages() {
        let mut qs = with_passages(&[Some("A"), Some("A")]);
        qs[1].audio_url = Some("https://cdn/x.mp3".into());
        assert_eq!(
            canonical_reference(&qs, ResourceKind::Audio).as_deref(),
            Some("https://cdn/x.mp3")
        );
    }
}
