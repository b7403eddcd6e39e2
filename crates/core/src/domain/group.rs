use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::lead::Shift;
use crate::domain::normalize_tag;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub String);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CampaignId(pub String);

impl fmt::Display for CampaignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftAffinity {
    Morning,
    Evening,
    All,
}

impl ShiftAffinity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Evening => "evening",
            Self::All => "all",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match normalize_tag(value).as_str() {
            "morning" => Some(Self::Morning),
            "evening" => Some(Self::Evening),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    pub fn covers(&self, shift: Shift) -> bool {
        match self {
            Self::All => true,
            Self::Morning => shift == Shift::Morning,
            Self::Evening => shift == Shift::Evening,
        }
    }
}

/// A team of workers and the campaigns it is allowed to dial.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub shift: ShiftAffinity,
    pub campaigns: Vec<CampaignId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::ShiftAffinity;
    use crate::domain::lead::Shift;

    #[test]
    fn all_affinity_covers_both_shifts() {
        assert!(ShiftAffinity::All.covers(Shift::Morning));
        assert!(ShiftAffinity::All.covers(Shift::Evening));
        assert!(ShiftAffinity::Morning.covers(Shift::Morning));
        assert!(!ShiftAffinity::Morning.covers(Shift::Evening));
    }
}
