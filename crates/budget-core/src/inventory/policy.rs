use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::BudgetError;

/// Inventory costing method. One selection applies to every valuation pass
/// of a budget run (raw materials and finished goods alike).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostingPolicy {
    /// Last in, first out: the period's inflow is charged to consumption first.
    Lifo,
    /// First in, first out: the opening balance is charged to consumption first.
    Fifo,
    /// One blended unit cost for consumption and ending balance.
    WeightedAverage,
}

/// The two cost layers of a valuation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotSource {
    /// Stock on hand at the start of the period.
    Opening,
    /// Purchases or production of the period.
    Incoming,
}

impl CostingPolicy {
    pub const ALL: [CostingPolicy; 3] = [
        CostingPolicy::Lifo,
        CostingPolicy::Fifo,
        CostingPolicy::WeightedAverage,
    ];

    /// Order in which lots are drawn down. `None` for weighted average,
    /// which blends both layers instead of drawing them in sequence.
    pub fn consumption_order(&self) -> Option<[LotSource; 2]> {
        match self {
            CostingPolicy::Lifo => Some([LotSource::Incoming, LotSource::Opening]),
            CostingPolicy::Fifo => Some([LotSource::Opening, LotSource::Incoming]),
            CostingPolicy::WeightedAverage => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CostingPolicy::Lifo => "LIFO",
            CostingPolicy::Fifo => "FIFO",
            CostingPolicy::WeightedAverage => "Weighted Average",
        }
    }
}

impl fmt::Display for CostingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CostingPolicy::Lifo => write!(f, "lifo"),
            CostingPolicy::Fifo => write!(f, "fifo"),
            CostingPolicy::WeightedAverage => write!(f, "weighted_average"),
        }
    }
}

impl FromStr for CostingPolicy {
    type Err = BudgetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lifo" => Ok(CostingPolicy::Lifo),
            "fifo" => Ok(CostingPolicy::Fifo),
            "weighted_average" | "weighted-average" | "average" | "wavg" => {
                Ok(CostingPolicy::WeightedAverage)
            }
            other => Err(BudgetError::InvalidInput {
                field: "policy".into(),
                reason: format!(
                    "Unknown costing policy '{other}' (expected lifo, fifo or weighted_average)"
                ),
            }),
        }
    }
}
