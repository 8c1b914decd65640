use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::db::ResponseStore;
use crate::error::ReportError;
use crate::models::{Field, SurveyResponse, TrendPoint};
use crate::range::{to_local_day, DateRange};

pub type FieldCounts = BTreeMap<String, usize>;

pub const TREND_DAYS: usize = 7;

pub fn count_by(rows: &[SurveyResponse], field: Field) -> FieldCounts {
    let mut counts = FieldCounts::new();
    for row in rows {
        *counts.entry(row.value(field).to_string()).or_insert(0) += 1;
    }
    counts
}

/// Per-local-day counts for the newest `limit` days that have rows, oldest first.
/// Days without rows are skipped rather than reported as zero.
pub fn daily_trend(rows: &[SurveyResponse], limit: usize) -> Vec<TrendPoint> {
    let mut days: BTreeMap<chrono::NaiveDate, usize> = BTreeMap::new();
    for row in rows {
        *days.entry(to_local_day(row.created_at)).or_insert(0) += 1;
    }

    let mut trend: Vec<TrendPoint> = days
        .into_iter()
        .rev()
        .take(limit)
        .map(|(day, count)| TrendPoint { day, count })
        .collect();
    trend.reverse();
    trend
}

pub fn top_n(counts: &FieldCounts, n: usize) -> Vec<(String, usize)> {
    let mut entries: Vec<(String, usize)> = counts
        .iter()
        .map(|(label, count)| (label.clone(), *count))
        .collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    entries.truncate(n);
    entries
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateReport {
    pub range: DateRange,
    pub counts: Vec<(Field, FieldCounts)>,
    pub trend: Vec<TrendPoint>,
    pub rows: Vec<SurveyResponse>,
}

impl AggregateReport {
    pub fn from_rows(range: DateRange, rows: Vec<SurveyResponse>) -> Self {
        let counts = Field::ALL
            .into_iter()
            .map(|field| (field, count_by(&rows, field)))
            .collect();
        let trend = daily_trend(&rows, TREND_DAYS);

        Self {
            range,
            counts,
            trend,
            rows,
        }
    }

    pub fn total(&self) -> usize {
        self.rows.len()
    }
}

pub struct Aggregator<'a> {
    store: &'a dyn ResponseStore,
}

impl<'a> Aggregator<'a> {
    pub fn new(store: &'a dyn ResponseStore) -> Self {
        Self { store }
    }

    pub async fn rows(
        &self,
        range: Option<&DateRange>,
    ) -> Result<Vec<SurveyResponse>, ReportError> {
        let rows = match range {
            Some(range) => {
                let (start, end) = range.utc_bounds()?;
                self.store
                    .fetch_between(start, end)
                    .await?
                    .into_iter()
                    .filter(|row| range.contains(row.created_at))
                    .collect()
            }
            None => self.store.fetch_all().await?,
        };
        debug!(rows = rows.len(), "aggregation input loaded");
        Ok(rows)
    }

    pub async fn counts_by_field(
        &self,
        field: Field,
        range: Option<&DateRange>,
    ) -> Result<FieldCounts, ReportError> {
        Ok(count_by(&self.rows(range).await?, field))
    }

    pub async fn daily_trend(&self, limit: usize) -> Result<Vec<TrendPoint>, ReportError> {
        Ok(daily_trend(&self.rows(None).await?, limit))
    }

    pub async fn report(&self, range: DateRange) -> Result<AggregateReport, ReportError> {
        let rows = self.rows(Some(&range)).await?;
        Ok(AggregateReport::from_rows(range, rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{response, MemoryStore};
    use chrono::{Duration, TimeZone, Utc};

    fn spread_rows() -> Vec<SurveyResponse> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let devices = ["Phone", "Laptop", "Phone", "Tablet-free", "Phone", "Laptop"];
        (0..30)
            .map(|i| {
                response(
                    i + 1,
                    devices[i as usize % devices.len()],
                    base + Duration::hours(i * 13),
                )
            })
            .collect()
    }

    #[test]
    fn counts_sum_to_row_count_for_every_field() {
        let rows = spread_rows();
        for field in Field::ALL {
            let counts = count_by(&rows, field);
            assert_eq!(counts.values().sum::<usize>(), rows.len(), "{field}");
        }
    }

    #[test]
    fn unseen_labels_are_absent_not_zero() {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let rows = vec![response(1, "Phone", base), response(2, "Laptop", base)];
        let counts = count_by(&rows, Field::Device);

        assert!(!counts.contains_key("Tablet"));
        assert_eq!(counts.get("Phone"), Some(&1));
        assert!(count_by(&[], Field::Device).is_empty());
    }

    #[test]
    fn unexpected_labels_are_counted_like_any_other() {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let rows = vec![
            response(1, "Smart fridge", base),
            response(2, "Smart fridge", base),
        ];
        assert_eq!(count_by(&rows, Field::Device).get("Smart fridge"), Some(&2));
    }

    #[test]
    fn trend_is_bounded_sorted_and_unique() {
        let trend = daily_trend(&spread_rows(), 7);

        assert!(trend.len() <= 7);
        assert!(trend.windows(2).all(|w| w[0].day < w[1].day));
        assert_eq!(trend.len(), 7);
    }

    #[test]
    fn trend_keeps_newest_days_and_skips_empty_ones() {
        let d = |day: u32, hour: u32| Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap();
        let rows = vec![
            response(1, "Phone", d(1, 9)),
            response(2, "Phone", d(1, 10)),
            // 21:00 UTC on the 3rd is the 4th locally
            response(3, "Phone", d(3, 21)),
            response(4, "Phone", d(6, 9)),
        ];

        let trend = daily_trend(&rows, 2);
        let days: Vec<String> = trend.iter().map(|p| p.day.to_string()).collect();
        assert_eq!(days, vec!["2024-03-04", "2024-03-06"]);

        let all = daily_trend(&rows, 7);
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].count, 2);
    }

    #[test]
    fn top_n_breaks_ties_in_label_order() {
        let counts: FieldCounts = [("A", 5), ("B", 5), ("C", 5), ("D", 3)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        let top = top_n(&counts, 3);
        let labels: Vec<&str> = top.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, vec!["A", "B", "C"]);
        assert_eq!(top.iter().map(|(_, c)| c).sum::<usize>(), 15);
    }

    #[test]
    fn top_n_handles_short_and_empty_inputs() {
        assert!(top_n(&FieldCounts::new(), 3).is_empty());

        let counts: FieldCounts = [("x".to_string(), 1), ("y".to_string(), 4)].into();
        assert_eq!(top_n(&counts, 3), vec![("y".to_string(), 4), ("x".to_string(), 1)]);
    }

    #[tokio::test]
    async fn single_day_range_uses_local_days() {
        let store = MemoryStore::with_rows(vec![
            response(1, "Phone", Utc.with_ymd_and_hms(2024, 1, 9, 20, 0, 0).unwrap()),
            response(2, "Laptop", Utc.with_ymd_and_hms(2024, 1, 9, 21, 0, 0).unwrap()),
            response(3, "Phone", Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap()),
            response(4, "Phone", Utc.with_ymd_and_hms(2024, 1, 10, 21, 0, 0).unwrap()),
        ]);
        let aggregator = Aggregator::new(&store);
        let range = DateRange::parse("2024-01-10", "2024-01-10").unwrap();

        let rows = aggregator.rows(Some(&range)).await.unwrap();
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 3]);

        let counts = aggregator
            .counts_by_field(Field::Device, Some(&range))
            .await
            .unwrap();
        assert_eq!(counts.get("Laptop"), Some(&1));
        assert_eq!(counts.get("Phone"), Some(&1));

        let everything = aggregator.counts_by_field(Field::Device, None).await.unwrap();
        assert_eq!(everything.get("Phone"), Some(&3));
    }

    #[tokio::test]
    async fn report_collects_all_ten_fields() {
        let store = MemoryStore::with_rows(spread_rows());
        let range = DateRange::parse("2024-01-01", "2024-01-31").unwrap();
        let report = Aggregator::new(&store).report(range).await.unwrap();

        assert_eq!(report.counts.len(), 10);
        assert_eq!(report.total(), 30);
        assert!(report
            .rows
            .windows(2)
            .all(|w| w[0].created_at <= w[1].created_at));
    }
}
