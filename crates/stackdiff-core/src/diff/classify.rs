//! Resolution of filtered resource differences into a [`ChangeSummary`].

use crate::diff::model::{ChangeSummary, DestructiveChange, ResourceDifference, ResourceImpact};
use std::collections::BTreeMap;

/// Classify surviving resource differences of one stack.
///
/// Pure function of its input. Removals always yield a `WILL_DESTROY`
/// destructive change, whatever impact the engine reported.
pub fn classify(stack_name: &str, resources: &BTreeMap<String, ResourceDifference>) -> ChangeSummary {
    let mut summary = ChangeSummary::default();

    for (logical_id, diff) in resources {
        if diff.is_removal() {
            summary.removed_resources += 1;
            summary.destructive_changes.push(DestructiveChange {
                stack_name: stack_name.to_string(),
                logical_id: logical_id.clone(),
                impact: ResourceImpact::WillDestroy,
            });
        } else if diff.is_addition() {
            summary.created_resources += 1;
        } else if diff.is_update() {
            summary.updated_resources += 1;
            if let Some(impact) = diff.change_impact.filter(|i| i.is_destructive()) {
                summary.destructive_changes.push(DestructiveChange {
                    stack_name: stack_name.to_string(),
                    logical_id: logical_id.clone(),
                    impact,
                });
            }
        }
    }

    summary.refresh_has_changes();
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn resources(entries: Vec<(&str, ResourceDifference)>) -> BTreeMap<String, ResourceDifference> {
        entries
            .into_iter()
            .map(|(id, diff)| (id.to_string(), diff))
            .collect()
    }

    #[test]
    fn test_empty_diff_has_no_changes() {
        let summary = classify("Root", &BTreeMap::new());
        assert_eq!(summary, ChangeSummary::default());
    }

    #[test]
    fn test_update_with_replace_is_destructive() {
        let diff = ResourceDifference::update(
            json!({"Type": "AWS::RDS::DBInstance"}),
            json!({"Type": "AWS::RDS::DBInstance"}),
            BTreeMap::new(),
            BTreeMap::new(),
            Some(ResourceImpact::WillReplace),
        );
        let summary = classify("Db", &resources(vec![("Database", diff)]));
        assert_eq!(summary.updated_resources, 1);
        assert_eq!(summary.destructive_changes.len(), 1);
        assert_eq!(summary.destructive_changes[0].impact, ResourceImpact::WillReplace);
    }

    #[test]
    fn test_plain_update_is_not_destructive() {
        let diff = ResourceDifference::update(
            json!({"Type": "AWS::SQS::Queue"}),
            json!({"Type": "AWS::SQS::Queue"}),
            BTreeMap::new(),
            BTreeMap::new(),
            Some(ResourceImpact::WillUpdate),
        );
        let summary = classify("Root", &resources(vec![("Queue", diff)]));
        assert!(summary.destructive_changes.is_empty());
        assert!(summary.has_changes);
    }

    // Regression: a single nonzero counter is enough for has_changes.
    #[test]
    fn test_has_changes_with_only_one_counter() {
        let diff = ResourceDifference::addition(json!({"Type": "AWS::S3::Bucket"}));
        let summary = classify("Root", &resources(vec![("Bucket", diff)]));
        assert_eq!(summary.created_resources, 1);
        assert_eq!(summary.updated_resources, 0);
        assert_eq!(summary.removed_resources, 0);
        assert!(summary.has_changes);
    }

    fn impact_strategy() -> impl Strategy<Value = Option<ResourceImpact>> {
        prop_oneof![
            Just(None),
            Just(Some(ResourceImpact::NoChange)),
            Just(Some(ResourceImpact::WillUpdate)),
            Just(Some(ResourceImpact::WillOrphan)),
            Just(Some(ResourceImpact::WillReplace)),
        ]
    }

    proptest! {
        #[test]
        fn prop_every_removal_is_will_destroy(impacts in proptest::collection::vec(impact_strategy(), 0..8)) {
            let map: BTreeMap<String, ResourceDifference> = impacts
                .iter()
                .enumerate()
                .map(|(i, impact)| {
                    (
                        format!("Res{i}"),
                        ResourceDifference::removal(json!({"Type": "AWS::SQS::Queue"}), *impact),
                    )
                })
                .collect();
            let summary = classify("Root", &map);
            prop_assert_eq!(summary.removed_resources, impacts.len());
            prop_assert_eq!(summary.destructive_changes.len(), impacts.len());
            prop_assert!(summary
                .destructive_changes
                .iter()
                .all(|c| c.impact == ResourceImpact::WillDestroy));
            prop_assert_eq!(summary.has_changes, !impacts.is_empty());
        }
    }
}
