// src/aggregate.rs
//
// Pure aggregation over history entries already filtered to one analysis id.
// Order-independent: plain sum/divide, equal weight regardless of recency.
use serde::Serialize;

use crate::models::{PriceEstimateEntry, TryOnHistoryItem};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceAverages {
    pub count: usize,
    #[serde(rename = "avgMin")]
    pub avg_min: f64,
    #[serde(rename = "avgSuggested")]
    pub avg_suggested: f64,
    #[serde(rename = "avgMax")]
    pub avg_max: f64,
}

pub fn compute_item_averages(entries: &[PriceEstimateEntry]) -> Option<PriceAverages> {
    if entries.is_empty() {
        return None;
    }
    let n = entries.len() as f64;
    let (min, suggested, max) = entries.iter().fold((0.0, 0.0, 0.0), |acc, e| {
        (
            acc.0 + e.min_price,
            acc.1 + e.suggested_price,
            acc.2 + e.max_price,
        )
    });
    Some(PriceAverages {
        count: entries.len(),
        avg_min: min / n,
        avg_suggested: suggested / n,
        avg_max: max / n,
    })
}

/// Cumulative try-on spend and generation time for one item. Totals, not
/// means: the question answered is "how much has this item cost so far".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TryOnTotals {
    pub count: usize,
    #[serde(rename = "totalCostUSD")]
    pub total_cost_usd: f64,
    #[serde(rename = "totalCostBRL")]
    pub total_cost_brl: f64,
    #[serde(rename = "totalElapsedMs")]
    pub total_elapsed_ms: u64,
}

pub fn compute_tryon_totals(entries: &[TryOnHistoryItem]) -> TryOnTotals {
    entries.iter().fold(
        TryOnTotals {
            count: 0,
            total_cost_usd: 0.0,
            total_cost_brl: 0.0,
            total_elapsed_ms: 0,
        },
        |mut acc, e| {
            acc.count += 1;
            acc.total_cost_usd += e.estimated_cost_usd;
            acc.total_cost_brl += e.estimated_cost_brl;
            acc.total_elapsed_ms += e.elapsed_ms;
            acc
        },
    )
}
