//! Audit history: one summary record per completed run, kept in a capped
//! FIFO list in the injected store.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{round2, AnalysisResult};
use crate::storage::{append_capped, clear_list, load_list, Storage};

pub const HISTORY_KEY: &str = "shipaudit.audit_history";
pub const MAX_HISTORY_RECORDS: usize = 50;

/// Overcharge attributed to each issue family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OverchargeByType {
    pub weight: f64,
    pub zone: f64,
    pub duplicate: f64,
    pub cod: f64,
    pub rto: f64,
    pub other: f64,
}

impl OverchargeByType {
    pub fn total(&self) -> f64 {
        self.weight + self.zone + self.duplicate + self.cod + self.rto + self.other
    }

    fn bucket_mut(&mut self, label: &str) -> &mut f64 {
        let label = label.to_lowercase();
        if label.contains("weight") {
            &mut self.weight
        } else if label.contains("zone") {
            &mut self.zone
        } else if label.contains("duplicate") {
            &mut self.duplicate
        } else if label.contains("cod") {
            &mut self.cod
        } else if label.contains("rto") {
            &mut self.rto
        } else {
            &mut self.other
        }
    }

    fn rounded(self) -> Self {
        Self {
            weight: round2(self.weight),
            zone: round2(self.zone),
            duplicate: round2(self.duplicate),
            cod: round2(self.cod),
            rto: round2(self.rto),
            other: round2(self.other),
        }
    }
}

/// Attribute each discrepancy's difference to buckets. A discrepancy with
/// several labels contributes an equal share to each label's bucket; this
/// is not weighted by which check caused how much of the difference.
pub fn categorize(result: &AnalysisResult) -> OverchargeByType {
    let mut buckets = OverchargeByType::default();
    for d in &result.discrepancies {
        let labels: Vec<&str> = d.labels().collect();
        if labels.is_empty() {
            buckets.other += d.difference;
            continue;
        }
        let share = d.difference / labels.len() as f64;
        for label in labels {
            *buckets.bucket_mut(label) += share;
        }
    }
    buckets.rounded()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub provider: String,
    pub file_name: String,
    pub total_rows: usize,
    pub total_billed: f64,
    pub total_overcharge: f64,
    pub discrepancy_count: usize,
    pub overcharge_by_type: OverchargeByType,
}

impl AuditRecord {
    pub fn from_result(
        result: &AnalysisResult,
        provider: &str,
        file_name: &str,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: at,
            provider: provider.to_string(),
            file_name: file_name.to_string(),
            total_rows: result.total_rows,
            total_billed: round2(result.total_billed),
            total_overcharge: result.total_overcharge,
            discrepancy_count: result.discrepancies.len(),
            overcharge_by_type: categorize(result),
        }
    }
}

/// Aggregate of all recorded runs for one provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderSummary {
    pub provider: String,
    pub runs: usize,
    pub total_billed: f64,
    pub total_overcharge: f64,
    pub last_audited: DateTime<Utc>,
}

pub struct AuditHistory<S: Storage> {
    store: S,
}

impl<S: Storage> AuditHistory<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Append a record. Never fails: an unavailable or full store only
    /// costs the history entry.
    pub fn record(&mut self, record: AuditRecord) {
        log::debug!("recording audit {} for {}", record.id, record.provider);
        append_capped(&mut self.store, HISTORY_KEY, [record], MAX_HISTORY_RECORDS);
    }

    /// All records, oldest first.
    pub fn load(&self) -> Vec<AuditRecord> {
        load_list(&self.store, HISTORY_KEY)
    }

    pub fn clear(&mut self) {
        clear_list(&mut self.store, HISTORY_KEY);
    }

    /// Per-provider totals, sorted by provider name.
    pub fn provider_summaries(&self) -> Vec<ProviderSummary> {
        let mut by_provider: BTreeMap<String, ProviderSummary> = BTreeMap::new();
        for r in self.load() {
            let entry = by_provider
                .entry(r.provider.clone())
                .or_insert_with(|| ProviderSummary {
                    provider: r.provider.clone(),
                    runs: 0,
                    total_billed: 0.0,
                    total_overcharge: 0.0,
                    last_audited: r.timestamp,
                });
            entry.runs += 1;
            entry.total_billed += r.total_billed;
            entry.total_overcharge += r.total_overcharge;
            entry.last_audited = entry.last_audited.max(r.timestamp);
        }
        by_provider
            .into_values()
            .map(|mut s| {
                s.total_billed = round2(s.total_billed);
                s.total_overcharge = round2(s.total_overcharge);
                s
            })
            .collect()
    }
}
