//! Scan history and dashboard statistics
//!
//! The history list is seeded with fixed entries and lives only in memory.
//! There is no persistence layer.

use crate::core::report::{Confidence, Severity};
use crate::core::session::ImageRef;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// One past scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRecord {
    pub id: String,
    pub taken_at: NaiveDateTime,
    pub condition: String,
    pub severity: Severity,
    pub confidence: Confidence,
    pub thumbnail: ImageRef,
}

impl ScanRecord {
    fn seeded(
        id: &str,
        date: (i32, u32, u32),
        time: (u32, u32),
        condition: &str,
        severity: Severity,
        confidence: u32,
        thumbnail: &str,
    ) -> Option<Self> {
        let date = NaiveDate::from_ymd_opt(date.0, date.1, date.2)?;
        let time = NaiveTime::from_hms_opt(time.0, time.1, 0)?;
        Some(Self {
            id: id.to_string(),
            taken_at: date.and_time(time),
            condition: condition.to_string(),
            severity,
            confidence: Confidence::new(confidence),
            thumbnail: ImageRef::new(thumbnail),
        })
    }

    /// Date as shown in the list, e.g. `2024-01-15`
    pub fn date_label(&self) -> String {
        self.taken_at.format("%Y-%m-%d").to_string()
    }

    /// Time as shown in the list, e.g. `2:15 PM`
    pub fn time_label(&self) -> String {
        self.taken_at.format("%-I:%M %p").to_string()
    }

    pub fn is_healthy(&self) -> bool {
        self.severity == Severity::None
    }
}

/// Totals shown above the history list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistorySummary {
    pub total: usize,
    pub healthy: usize,
}

/// In-memory list of past scans, newest first
#[derive(Debug, Clone, Default)]
pub struct ScanHistory {
    records: Vec<ScanRecord>,
}

impl ScanHistory {
    pub fn new(mut records: Vec<ScanRecord>) -> Self {
        records.sort_by(|a, b| b.taken_at.cmp(&a.taken_at));
        Self { records }
    }

    /// The fixed history the app ships with
    pub fn seeded() -> Self {
        const PEXELS: &str = "https://images.pexels.com/photos";
        let records = [
            ScanRecord::seeded(
                "1",
                (2024, 1, 15),
                (10, 30),
                "Healthy Skin",
                Severity::None,
                95,
                &format!("{PEXELS}/3845457/pexels-photo-3845457.jpeg?auto=compress&cs=tinysrgb&w=150"),
            ),
            ScanRecord::seeded(
                "2",
                (2024, 1, 12),
                (14, 15),
                "Mild Eczema",
                Severity::Mild,
                87,
                &format!("{PEXELS}/5938519/pexels-photo-5938519.jpeg?auto=compress&cs=tinysrgb&w=150"),
            ),
            ScanRecord::seeded(
                "3",
                (2024, 1, 10),
                (9, 45),
                "Dry Skin",
                Severity::Mild,
                92,
                &format!("{PEXELS}/4154552/pexels-photo-4154552.jpeg?auto=compress&cs=tinysrgb&w=150"),
            ),
            ScanRecord::seeded(
                "4",
                (2024, 1, 8),
                (16, 20),
                "Normal Skin",
                Severity::None,
                98,
                &format!("{PEXELS}/5938242/pexels-photo-5938242.jpeg?auto=compress&cs=tinysrgb&w=150"),
            ),
            ScanRecord::seeded(
                "5",
                (2024, 1, 5),
                (11, 10),
                "Minor Irritation",
                Severity::Mild,
                83,
                &format!("{PEXELS}/3845456/pexels-photo-3845456.jpeg?auto=compress&cs=tinysrgb&w=150"),
            ),
        ];
        Self::new(records.into_iter().flatten().collect())
    }

    pub fn records(&self) -> &[ScanRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The `n` most recent scans (home screen list)
    pub fn recent(&self, n: usize) -> &[ScanRecord] {
        &self.records[..n.min(self.records.len())]
    }

    pub fn by_severity(&self, severity: Severity) -> Vec<&ScanRecord> {
        self.records
            .iter()
            .filter(|r| r.severity == severity)
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<&ScanRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn summary(&self) -> HistorySummary {
        HistorySummary {
            total: self.records.len(),
            healthy: self.records.iter().filter(|r| r.is_healthy()).count(),
        }
    }
}

/// Tiles on the home dashboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_scans: usize,
    pub accuracy: Confidence,
    pub reliability: Confidence,
}

impl DashboardStats {
    /// Published figures; the scan count is the advertised lifetime total,
    /// not the length of the local history.
    pub fn published() -> Self {
        Self {
            total_scans: 12,
            accuracy: Confidence::new(94),
            reliability: Confidence::new(99),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_history_is_newest_first() {
        let history = ScanHistory::seeded();
        assert_eq!(history.len(), 5);
        let ids: Vec<_> = history.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn test_summary_counts_healthy() {
        let summary = ScanHistory::seeded().summary();
        assert_eq!(summary.total, 5);
        assert_eq!(summary.healthy, 2);
    }

    #[test]
    fn test_recent_is_bounded() {
        let history = ScanHistory::seeded();
        assert_eq!(history.recent(3).len(), 3);
        assert_eq!(history.recent(3)[0].condition, "Healthy Skin");
        assert_eq!(history.recent(50).len(), 5);
        assert!(ScanHistory::default().recent(3).is_empty());
    }

    #[test]
    fn test_labels() {
        let history = ScanHistory::seeded();
        let record = history.get("2").unwrap();
        assert_eq!(record.date_label(), "2024-01-12");
        assert_eq!(record.time_label(), "2:15 PM");
    }

    #[test]
    fn test_filter_by_severity() {
        let history = ScanHistory::seeded();
        assert_eq!(history.by_severity(Severity::Mild).len(), 3);
        assert!(history.by_severity(Severity::Severe).is_empty());
    }
}
