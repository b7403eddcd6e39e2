use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use tracing::info;

use leadflow_core::domain::group::{Campaign, CampaignId, Group, GroupId, ShiftAffinity};
use leadflow_core::domain::lead::{Lead, LeadDocument, LeadDocumentId, LeadId};
use leadflow_core::domain::queue::{LeadQueueEntry, LeadQueueEntryId};
use leadflow_core::domain::worker::{Worker, WorkerId};
use leadflow_core::errors::ApplicationError;
use leadflow_core::ports::LeadStore;

use crate::repositories::{LeadSeeder, RepositoryError};

/// Deterministic demo floor: one admin, one manager and a handful of agents
/// spread over two campaigns.
///
/// - `W1` (group `G5`, campaign `C1`, `oldestFirst`) sees `L1` before `L2`.
/// - `W2` holds `L3`.
/// - `W6` drains a queue of `LA`, `LB`, `LC`.
/// - `M1` manages `G1`, linked to `C9`; `W5` (group `G7`) holds `L6` in `C9`.
pub struct DemoDataset;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SeedResult {
    pub campaigns: usize,
    pub groups: usize,
    pub leads: usize,
    pub workers: usize,
    pub queue_entries: usize,
}

struct SeedWorker {
    id: &'static str,
    group_id: &'static str,
    parent_group_id: Option<&'static str>,
    is_manager: bool,
    priorities: &'static [&'static str],
    current_lead: Option<&'static str>,
    memberships: &'static [&'static str],
}

const CAMPAIGNS: &[(&str, &str)] = &[("C1", "Residential fibre"), ("C9", "Business mobile")];

const GROUPS: &[(&str, &str, ShiftAffinity, &[&str])] = &[
    ("admin", "Administrators", ShiftAffinity::All, &[]),
    ("G1", "Enterprise desk", ShiftAffinity::All, &["C9"]),
    ("G5", "Morning residential", ShiftAffinity::Morning, &["C1"]),
    ("G7", "Field sales", ShiftAffinity::All, &["C1", "C9"]),
];

/// `(id, campaign, month updated in 2024)`
const LEADS: &[(&str, &str, u32)] = &[
    ("L1", "C1", 1),
    ("L2", "C1", 2),
    ("L3", "C1", 3),
    ("L6", "C9", 3),
    ("LA", "C1", 4),
    ("LB", "C1", 4),
    ("LC", "C1", 4),
];

const WORKERS: &[SeedWorker] = &[
    SeedWorker {
        id: "ADMIN",
        group_id: "admin",
        parent_group_id: None,
        is_manager: true,
        priorities: &[],
        current_lead: None,
        memberships: &["admin"],
    },
    SeedWorker {
        id: "M1",
        group_id: "G1",
        parent_group_id: None,
        is_manager: true,
        priorities: &[],
        current_lead: None,
        memberships: &["G1"],
    },
    SeedWorker {
        id: "W1",
        group_id: "G5",
        parent_group_id: Some("G1"),
        is_manager: false,
        priorities: &["oldestFirst"],
        current_lead: None,
        memberships: &["G5"],
    },
    SeedWorker {
        id: "W2",
        group_id: "G5",
        parent_group_id: Some("G1"),
        is_manager: false,
        priorities: &["oldestFirst"],
        current_lead: Some("L3"),
        memberships: &["G5"],
    },
    SeedWorker {
        id: "W5",
        group_id: "G7",
        parent_group_id: None,
        is_manager: false,
        priorities: &["recentFirst"],
        current_lead: Some("L6"),
        memberships: &["G7"],
    },
    SeedWorker {
        id: "W6",
        group_id: "G5",
        parent_group_id: Some("G1"),
        is_manager: false,
        priorities: &["fromQueue", "oldestFirst"],
        current_lead: None,
        memberships: &["G5"],
    },
];

const ADMIN_WORKER_ID: &str = "ADMIN";

const QUEUE: &[(&str, &str, u32)] = &[("W6", "LA", 1), ("W6", "LB", 2), ("W6", "LC", 3)];

/// Leads that carry an attachment.
const DOCUMENTS: &[(&str, &str)] = &[("D-L2", "L2")];

impl DemoDataset {
    /// The dataset counts as present once its admin worker exists.
    pub async fn is_loaded(store: &dyn LeadStore) -> Result<bool, ApplicationError> {
        Ok(store.find_worker(&WorkerId(ADMIN_WORKER_ID.to_string())).await?.is_some())
    }

    pub async fn load(target: &dyn LeadSeeder) -> Result<SeedResult, RepositoryError> {
        for (id, name) in CAMPAIGNS {
            target
                .seed_campaign(&Campaign { id: CampaignId(id.to_string()), name: name.to_string() })
                .await?;
        }

        for (id, name, shift, campaigns) in GROUPS {
            target
                .seed_group(&Group {
                    id: GroupId(id.to_string()),
                    name: name.to_string(),
                    shift: *shift,
                    campaigns: campaigns.iter().map(|id| CampaignId(id.to_string())).collect(),
                })
                .await?;
        }

        for (index, (id, campaign, month)) in LEADS.iter().enumerate() {
            let updated_at = at(*month)?;
            target
                .seed_lead(&Lead {
                    id: LeadId(id.to_string()),
                    external_id: format!("EXT-{id}"),
                    full_name: format!("Contact {id}"),
                    phone: Some(format!("+34600000{index:03}")),
                    email: None,
                    state: None,
                    shift: None,
                    campaign_id: Some(CampaignId(campaign.to_string())),
                    holder: None,
                    created_at: at(1)?,
                    updated_at,
                })
                .await?;
        }

        for (id, lead_id) in DOCUMENTS {
            target
                .seed_document(&LeadDocument {
                    id: LeadDocumentId(id.to_string()),
                    lead_id: LeadId(lead_id.to_string()),
                    file_name: format!("{lead_id}-contract.pdf"),
                    uploaded_at: at(2)?,
                })
                .await?;
        }

        for seed in WORKERS {
            let memberships =
                seed.memberships.iter().map(|id| GroupId(id.to_string())).collect::<Vec<_>>();
            target.seed_worker(&seed.to_worker(), &memberships).await?;
        }

        for (worker_id, lead_id, position) in QUEUE {
            target
                .seed_queue_entry(&LeadQueueEntry {
                    id: LeadQueueEntryId(format!("Q-{worker_id}-{position}")),
                    worker_id: WorkerId(worker_id.to_string()),
                    lead_id: LeadId(lead_id.to_string()),
                    position: *position,
                    created_at: at(4)?,
                })
                .await?;
        }

        let seeded = SeedResult {
            campaigns: CAMPAIGNS.len(),
            groups: GROUPS.len(),
            leads: LEADS.len(),
            workers: WORKERS.len(),
            queue_entries: QUEUE.len(),
        };
        info!(
            event_name = "db.seed.demo_loaded",
            leads = seeded.leads,
            workers = seeded.workers,
            queue_entries = seeded.queue_entries,
            "demo dataset loaded"
        );
        Ok(seeded)
    }
}

impl SeedWorker {
    fn to_worker(&self) -> Worker {
        Worker {
            id: WorkerId(self.id.to_string()),
            name: format!("Agent {}", self.id),
            group_id: GroupId(self.group_id.to_string()),
            parent_group_id: self.parent_group_id.map(|id| GroupId(id.to_string())),
            is_manager: self.is_manager,
            priorities: self.priorities.iter().map(|tag| tag.to_string()).collect(),
            current_lead: self.current_lead.map(|id| LeadId(id.to_string())),
        }
    }
}

fn at(month: u32) -> Result<DateTime<Utc>, RepositoryError> {
    Utc.with_ymd_and_hms(2024, month, 1, 9, 0, 0)
        .single()
        .ok_or_else(|| RepositoryError::Decode(format!("invalid fixture month {month}")))
}

#[cfg(test)]
mod tests {
    use leadflow_core::domain::lead::LeadId;
    use leadflow_core::domain::worker::WorkerId;
    use leadflow_core::ports::LeadStore;

    use super::DemoDataset;
    use crate::repositories::InMemoryLeadStore;

    #[tokio::test]
    async fn demo_dataset_reports_what_it_seeded() {
        let store = InMemoryLeadStore::new();
        assert!(!DemoDataset::is_loaded(&store).await.expect("probe"));

        let seeded = DemoDataset::load(&store).await.expect("seed");

        assert!(DemoDataset::is_loaded(&store).await.expect("probe"));
        assert_eq!((seeded.campaigns, seeded.groups, seeded.leads), (2, 4, 7));
        assert_eq!((seeded.workers, seeded.queue_entries), (6, 3));

        let held = store.find_lead(&LeadId("L3".to_string())).await.expect("read");
        assert_eq!(held.and_then(|lead| lead.holder), Some(WorkerId("W2".to_string())));
    }
}
