use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::assignment::candidate::{CandidateOrder, CandidateQuery};
use crate::domain::group::{CampaignId, Group, GroupId};
use crate::domain::lead::Shift;
use crate::domain::normalize_tag;

/// One entry of a worker's priority list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriorityStrategy {
    /// `group:<id>`: only that group's campaigns. Applies only when the group
    /// is one of the worker's own groups and has campaigns; otherwise it is
    /// skipped like an unmatched strategy.
    Group(GroupId),
    WithAttachments,
    FromQueue,
    RecentFirst,
    OldestFirst,
    MorningShift,
    EveningShift,
    NotResponding,
}

/// What a strategy asks the store to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StrategyPlan {
    Pool(CandidateQuery),
    OwnQueue,
}

/// The groups a worker belongs to and the union of their campaigns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerScope {
    pub groups: Vec<Group>,
    pub campaigns: BTreeSet<CampaignId>,
}

impl WorkerScope {
    pub fn new(groups: Vec<Group>) -> Self {
        let campaigns =
            groups.iter().flat_map(|group| group.campaigns.iter().cloned()).collect();
        Self { groups, campaigns }
    }

    pub fn group(&self, id: &GroupId) -> Option<&Group> {
        self.groups.iter().find(|group| &group.id == id)
    }

    pub fn works_shift(&self, shift: Shift) -> bool {
        self.groups.iter().any(|group| group.shift.covers(shift))
    }
}

impl PriorityStrategy {
    pub fn parse(tag: &str) -> Option<Self> {
        let trimmed = tag.trim();
        if let Some((prefix, group_id)) = trimmed.split_once(':') {
            let group_id = group_id.trim();
            if normalize_tag(prefix) == "group" && !group_id.is_empty() {
                return Some(Self::Group(GroupId(group_id.to_string())));
            }
            return None;
        }

        match normalize_tag(trimmed).as_str() {
            "withattachments" => Some(Self::WithAttachments),
            "fromqueue" => Some(Self::FromQueue),
            "recentfirst" => Some(Self::RecentFirst),
            "oldestfirst" => Some(Self::OldestFirst),
            "morningshift" => Some(Self::MorningShift),
            "eveningshift" => Some(Self::EveningShift),
            "notresponding" => Some(Self::NotResponding),
            _ => None,
        }
    }

    pub fn tag(&self) -> String {
        match self {
            Self::Group(group_id) => format!("group:{group_id}"),
            Self::WithAttachments => "withAttachments".to_string(),
            Self::FromQueue => "fromQueue".to_string(),
            Self::RecentFirst => "recentFirst".to_string(),
            Self::OldestFirst => "oldestFirst".to_string(),
            Self::MorningShift => "morningShift".to_string(),
            Self::EveningShift => "eveningShift".to_string(),
            Self::NotResponding => "notResponding".to_string(),
        }
    }

    /// Dispatch table from strategy to lookup. `None` means the strategy does
    /// not apply to this worker and evaluation moves on.
    pub fn plan(&self, scope: &WorkerScope) -> Option<StrategyPlan> {
        let base = || CandidateQuery::base(scope.campaigns.clone());

        let plan = match self {
            Self::Group(group_id) => {
                let group = scope.group(group_id)?;
                let campaigns: BTreeSet<CampaignId> = group.campaigns.iter().cloned().collect();
                if campaigns.is_empty() {
                    return None;
                }
                StrategyPlan::Pool(CandidateQuery::base(campaigns))
            }
            Self::WithAttachments => {
                StrategyPlan::Pool(base().with_attachments().ordered(CandidateOrder::Any))
            }
            Self::FromQueue => StrategyPlan::OwnQueue,
            Self::RecentFirst => StrategyPlan::Pool(base().ordered(CandidateOrder::RecentFirst)),
            Self::OldestFirst => StrategyPlan::Pool(base()),
            Self::MorningShift => shift_plan(scope, Shift::Morning)?,
            Self::EveningShift => shift_plan(scope, Shift::Evening)?,
            Self::NotResponding => StrategyPlan::Pool(base().not_responding()),
        };

        Some(plan)
    }
}

fn shift_plan(scope: &WorkerScope, shift: Shift) -> Option<StrategyPlan> {
    scope
        .works_shift(shift)
        .then(|| StrategyPlan::Pool(CandidateQuery::base(scope.campaigns.clone()).on_shift(shift)))
}

/// Parses a priority list, dropping unrecognized tags.
pub fn parse_priorities(tags: &[String]) -> Vec<PriorityStrategy> {
    tags.iter()
        .filter_map(|tag| {
            let parsed = PriorityStrategy::parse(tag);
            if parsed.is_none() {
                debug!(event_name = "lead.assignment.unknown_strategy", tag = %tag, "skipping tag");
            }
            parsed
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{parse_priorities, PriorityStrategy, StrategyPlan, WorkerScope};
    use crate::assignment::candidate::{CandidateOrder, StateFilter};
    use crate::domain::group::{CampaignId, Group, GroupId, ShiftAffinity};
    use crate::domain::lead::Shift;

    fn group(id: &str, shift: ShiftAffinity, campaigns: &[&str]) -> Group {
        Group {
            id: GroupId(id.to_string()),
            name: id.to_string(),
            shift,
            campaigns: campaigns.iter().map(|id| CampaignId(id.to_string())).collect(),
        }
    }

    fn pool(plan: Option<StrategyPlan>) -> super::CandidateQuery {
        match plan {
            Some(StrategyPlan::Pool(query)) => query,
            other => panic!("expected pool plan, got {other:?}"),
        }
    }

    #[test]
    fn parses_known_tags_in_any_spelling() {
        assert_eq!(PriorityStrategy::parse("oldestFirst"), Some(PriorityStrategy::OldestFirst));
        assert_eq!(PriorityStrategy::parse("recent_first"), Some(PriorityStrategy::RecentFirst));
        assert_eq!(PriorityStrategy::parse("FROMQUEUE"), Some(PriorityStrategy::FromQueue));
        assert_eq!(
            PriorityStrategy::parse("group:G5"),
            Some(PriorityStrategy::Group(GroupId("G5".to_string())))
        );
        assert_eq!(PriorityStrategy::parse("group:"), None);
        assert_eq!(PriorityStrategy::parse("vipFirst"), None);
    }

    #[test]
    fn unknown_tags_are_skipped_and_order_is_kept() {
        let tags = ["vipFirst", "withAttachments", "", "oldestFirst"]
            .iter()
            .map(|tag| tag.to_string())
            .collect::<Vec<_>>();

        assert_eq!(
            parse_priorities(&tags),
            vec![PriorityStrategy::WithAttachments, PriorityStrategy::OldestFirst]
        );
    }

    #[test]
    fn tags_round_trip_through_parse() {
        let strategies = [
            PriorityStrategy::Group(GroupId("G1".to_string())),
            PriorityStrategy::WithAttachments,
            PriorityStrategy::FromQueue,
            PriorityStrategy::RecentFirst,
            PriorityStrategy::OldestFirst,
            PriorityStrategy::MorningShift,
            PriorityStrategy::EveningShift,
            PriorityStrategy::NotResponding,
        ];
        for strategy in strategies {
            assert_eq!(PriorityStrategy::parse(&strategy.tag()), Some(strategy));
        }
    }

    #[test]
    fn group_strategy_narrows_to_that_groups_campaigns() {
        let scope = WorkerScope::new(vec![
            group("G1", ShiftAffinity::All, &["C1", "C2"]),
            group("G2", ShiftAffinity::All, &["C3"]),
            group("G3", ShiftAffinity::All, &[]),
        ]);

        let query = pool(PriorityStrategy::Group(GroupId("G2".to_string())).plan(&scope));
        assert_eq!(query.campaigns.len(), 1);
        assert!(query.campaigns.contains(&CampaignId("C3".to_string())));
        assert_eq!(query.order, CandidateOrder::OldestFirst);

        assert_eq!(PriorityStrategy::Group(GroupId("G7".to_string())).plan(&scope), None);
        assert_eq!(PriorityStrategy::Group(GroupId("G3".to_string())).plan(&scope), None);
    }

    #[test]
    fn shift_strategies_need_a_matching_group() {
        let morning_only = WorkerScope::new(vec![group("G1", ShiftAffinity::Morning, &["C1"])]);

        let query = pool(PriorityStrategy::MorningShift.plan(&morning_only));
        assert_eq!(query.shift, Some(Shift::Morning));
        assert_eq!(PriorityStrategy::EveningShift.plan(&morning_only), None);

        let all_day = WorkerScope::new(vec![group("G2", ShiftAffinity::All, &["C1"])]);
        assert!(PriorityStrategy::EveningShift.plan(&all_day).is_some());
    }

    #[test]
    fn queue_and_not_responding_plans() {
        let scope = WorkerScope::new(vec![group("G1", ShiftAffinity::All, &["C1"])]);

        assert_eq!(PriorityStrategy::FromQueue.plan(&scope), Some(StrategyPlan::OwnQueue));
        let query = pool(PriorityStrategy::NotResponding.plan(&scope));
        assert_eq!(query.states, StateFilter::NotResponding);
        assert_eq!(query.order, CandidateOrder::OldestFirst);
    }
}
