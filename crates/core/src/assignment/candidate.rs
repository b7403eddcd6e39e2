use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::group::CampaignId;
use crate::domain::lead::{Lead, LeadState, Shift};

/// Which lead states a pool query accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateFilter {
    /// Never typed, or typed `NoContesta`.
    Open,
    /// Only leads already typed `NoContesta`.
    NotResponding,
}

impl StateFilter {
    pub fn admits(&self, state: Option<LeadState>) -> bool {
        match self {
            Self::Open => state.map_or(true, |state| state.is_open()),
            Self::NotResponding => state == Some(LeadState::NoContesta),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateOrder {
    /// Least recently updated first.
    OldestFirst,
    RecentFirst,
    /// No preference; stores may return any admitted lead.
    Any,
}

/// Declarative description of one pool lookup. Both store adapters evaluate
/// the same predicate: the in-memory one through [`CandidateQuery::pick`],
/// the SQL one by translating the fields into a `WHERE`/`ORDER BY`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateQuery {
    pub campaigns: BTreeSet<CampaignId>,
    pub states: StateFilter,
    /// `None` means the lead must carry no shift tag.
    pub shift: Option<Shift>,
    pub require_attachments: bool,
    pub order: CandidateOrder,
}

impl CandidateQuery {
    /// The base eligibility filter: campaign in scope, open state, no
    /// holder, no shift; oldest first.
    pub fn base(campaigns: BTreeSet<CampaignId>) -> Self {
        Self {
            campaigns,
            states: StateFilter::Open,
            shift: None,
            require_attachments: false,
            order: CandidateOrder::OldestFirst,
        }
    }

    pub fn ordered(mut self, order: CandidateOrder) -> Self {
        self.order = order;
        self
    }

    pub fn on_shift(mut self, shift: Shift) -> Self {
        self.shift = Some(shift);
        self
    }

    pub fn not_responding(mut self) -> Self {
        self.states = StateFilter::NotResponding;
        self
    }

    pub fn with_attachments(mut self) -> Self {
        self.require_attachments = true;
        self
    }

    pub fn admits(&self, lead: &Lead, has_attachments: bool) -> bool {
        let in_campaign = lead
            .campaign_id
            .as_ref()
            .map(|campaign| self.campaigns.contains(campaign))
            .unwrap_or(false);

        lead.holder.is_none()
            && in_campaign
            && self.states.admits(lead.state)
            && lead.shift == self.shift
            && (has_attachments || !self.require_attachments)
    }

    /// Picks the winning lead among `(lead, has_attachments)` pairs. Ties on
    /// the timestamp fall back to the lead id so the choice is stable.
    pub fn pick<'a, I>(&self, candidates: I) -> Option<&'a Lead>
    where
        I: IntoIterator<Item = (&'a Lead, bool)>,
    {
        let order = self.order;
        candidates
            .into_iter()
            .filter(|(lead, has_attachments)| self.admits(lead, *has_attachments))
            .map(|(lead, _)| lead)
            .min_by(|left, right| compare(order, left, right))
    }
}

fn compare(order: CandidateOrder, left: &Lead, right: &Lead) -> Ordering {
    let by_time = match order {
        CandidateOrder::OldestFirst => left.updated_at.cmp(&right.updated_at),
        CandidateOrder::RecentFirst => right.updated_at.cmp(&left.updated_at),
        CandidateOrder::Any => Ordering::Equal,
    };
    by_time.then_with(|| left.id.cmp(&right.id))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::{DateTime, TimeZone, Utc};

    use super::{CandidateOrder, CandidateQuery};
    use crate::domain::group::CampaignId;
    use crate::domain::lead::{Lead, LeadId, LeadState, Shift};
    use crate::domain::worker::WorkerId;

    fn at(month: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, month, 1, 0, 0, 0).single().expect("valid timestamp")
    }

    fn lead(id: &str, campaign: &str, month: u32) -> Lead {
        Lead {
            id: LeadId(id.to_string()),
            external_id: format!("EXT-{id}"),
            full_name: format!("Contact {id}"),
            phone: None,
            email: None,
            state: None,
            shift: None,
            campaign_id: Some(CampaignId(campaign.to_string())),
            holder: None,
            created_at: at(1),
            updated_at: at(month),
        }
    }

    fn campaigns(ids: &[&str]) -> BTreeSet<CampaignId> {
        ids.iter().map(|id| CampaignId(id.to_string())).collect()
    }

    #[test]
    fn base_filter_rejects_out_of_scope_held_resolved_and_shifted_leads() {
        let query = CandidateQuery::base(campaigns(&["C1"]));

        let mut other_campaign = lead("L1", "C2", 1);
        assert!(!query.admits(&other_campaign, false));
        other_campaign.campaign_id = None;
        assert!(!query.admits(&other_campaign, false));

        let mut held = lead("L2", "C1", 1);
        held.holder = Some(WorkerId("W-9".to_string()));
        assert!(!query.admits(&held, false));

        let mut sold = lead("L3", "C1", 1);
        sold.state = Some(LeadState::Venta);
        assert!(!query.admits(&sold, false));

        let mut shifted = lead("L4", "C1", 1);
        shifted.shift = Some(Shift::Morning);
        assert!(!query.admits(&shifted, false));

        let mut unanswered = lead("L5", "C1", 1);
        unanswered.state = Some(LeadState::NoContesta);
        assert!(query.admits(&unanswered, false));
    }

    #[test]
    fn ordering_follows_last_update() {
        let leads = [lead("L1", "C1", 1), lead("L2", "C1", 2), lead("L3", "C1", 3)];
        let oldest = CandidateQuery::base(campaigns(&["C1"]));
        let recent = oldest.clone().ordered(CandidateOrder::RecentFirst);

        let candidates = || leads.iter().map(|lead| (lead, false));
        assert_eq!(oldest.pick(candidates()).map(|lead| lead.id.0.as_str()), Some("L1"));
        assert_eq!(recent.pick(candidates()).map(|lead| lead.id.0.as_str()), Some("L3"));
    }

    #[test]
    fn equal_timestamps_break_on_lead_id() {
        let leads = [lead("L9", "C1", 1), lead("L2", "C1", 1)];
        let query = CandidateQuery::base(campaigns(&["C1"]));

        let picked = query.pick(leads.iter().map(|lead| (lead, false)));
        assert_eq!(picked.map(|lead| lead.id.0.as_str()), Some("L2"));
    }

    #[test]
    fn attachment_and_shift_refinements_narrow_the_pool() {
        let plain = lead("L1", "C1", 1);
        let mut evening = lead("L2", "C1", 2);
        evening.shift = Some(Shift::Evening);

        let with_docs = CandidateQuery::base(campaigns(&["C1"])).with_attachments();
        assert!(!with_docs.admits(&plain, false));
        assert!(with_docs.admits(&plain, true));

        let evening_query = CandidateQuery::base(campaigns(&["C1"])).on_shift(Shift::Evening);
        assert!(!evening_query.admits(&plain, false));
        assert!(evening_query.admits(&evening, false));
    }

    #[test]
    fn not_responding_only_admits_unanswered_leads() {
        let fresh = lead("L1", "C1", 1);
        let mut unanswered = lead("L2", "C1", 2);
        unanswered.state = Some(LeadState::NoContesta);

        let query = CandidateQuery::base(campaigns(&["C1"])).not_responding();
        assert!(!query.admits(&fresh, false));
        assert!(query.admits(&unanswered, false));
    }
}
