//! Resource kind and the per-domain selection shapes.

use serde::{Deserialize, Serialize};

/// One of the three independent reservation domains.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Hotel,
    Car,
    Train,
}

impl ResourceKind {
    pub fn all() -> [ResourceKind; 3] {
        [ResourceKind::Hotel, ResourceKind::Car, ResourceKind::Train]
    }

    /// Stable lower-case name, used in routing keys, table namespacing, and
    /// service URLs (`config::ParticipantUrls`).
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Hotel => "hotel",
            ResourceKind::Car => "car",
            ResourceKind::Train => "train",
        }
    }

    /// Whether this domain books a date range (hotel/car) or a single unit
    /// with no date dimension (train).
    pub fn has_date_range(&self) -> bool {
        !matches!(self, ResourceKind::Train)
    }
}

impl core::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hotel" => Ok(ResourceKind::Hotel),
            "car" => Ok(ResourceKind::Car),
            "train" => Ok(ResourceKind::Train),
            other => Err(format!("unknown resource kind: {other}")),
        }
    }
}
