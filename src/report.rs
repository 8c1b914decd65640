use std::collections::BTreeMap;
use std::fmt::Write;

use serde::Serialize;

use crate::aggregate::{count_by, daily_trend, top_n, FieldCounts, TREND_DAYS};
use crate::db::ResponseStore;
use crate::error::ReportError;
use crate::models::{Field, SurveyResponse, TrendPoint};

pub const LATEST_LIMIT: usize = 10;
pub const KPI_SIZE: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct Kpis {
    pub top_device: Vec<(String, usize)>,
    pub top_stage: Vec<(String, usize)>,
    pub top_preference: Vec<(String, usize)>,
    pub top_satisfaction: Vec<(String, usize)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub total: usize,
    pub counts: BTreeMap<Field, FieldCounts>,
    pub trend: Vec<TrendPoint>,
    pub latest: Vec<SurveyResponse>,
    pub kpis: Kpis,
}

impl Dashboard {
    pub fn from_rows(rows: &[SurveyResponse]) -> Self {
        let counts: BTreeMap<Field, FieldCounts> = Field::ALL
            .into_iter()
            .map(|field| (field, count_by(rows, field)))
            .collect();

        let top = |field: Field| {
            counts
                .get(&field)
                .map(|c| top_n(c, KPI_SIZE))
                .unwrap_or_default()
        };
        let kpis = Kpis {
            top_device: top(Field::Device),
            top_stage: top(Field::EducationStage),
            top_preference: top(Field::StudyPreference),
            top_satisfaction: top(Field::Satisfaction),
        };

        let mut latest = rows.to_vec();
        latest.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        latest.truncate(LATEST_LIMIT);

        Self {
            total: rows.len(),
            trend: daily_trend(rows, TREND_DAYS),
            counts,
            latest,
            kpis,
        }
    }
}

pub async fn build_dashboard(store: &dyn ResponseStore) -> Result<Dashboard, ReportError> {
    let rows = store.fetch_all().await?;
    Ok(Dashboard::from_rows(&rows))
}

fn write_top(output: &mut String, title: &str, entries: &[(String, usize)]) {
    if entries.is_empty() {
        let _ = writeln!(output, "- {title}: no responses yet");
        return;
    }
    let joined: Vec<String> = entries
        .iter()
        .map(|(label, count)| format!("{label} ({count})"))
        .collect();
    let _ = writeln!(output, "- {title}: {}", joined.join(", "));
}

pub fn render_summary(dashboard: &Dashboard) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Survey Dashboard");
    let _ = writeln!(output, "Total responses: {}", dashboard.total);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Highlights");
    write_top(&mut output, "Top devices", &dashboard.kpis.top_device);
    write_top(&mut output, "Top stages", &dashboard.kpis.top_stage);
    write_top(&mut output, "Top preferences", &dashboard.kpis.top_preference);
    write_top(&mut output, "Top satisfaction", &dashboard.kpis.top_satisfaction);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Last {TREND_DAYS} Active Days");
    if dashboard.trend.is_empty() {
        let _ = writeln!(output, "No responses recorded yet.");
    } else {
        for point in &dashboard.trend {
            let _ = writeln!(output, "- {}: {}", point.day, point.count);
        }
    }

    for (field, counts) in &dashboard.counts {
        let _ = writeln!(output);
        let _ = writeln!(output, "## {field}");
        if counts.is_empty() {
            let _ = writeln!(output, "No data.");
            continue;
        }
        for (label, count) in top_n(counts, counts.len()) {
            let _ = writeln!(output, "- {label}: {count}");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Latest Responses");
    if dashboard.latest.is_empty() {
        let _ = writeln!(output, "No responses recorded yet.");
    } else {
        for response in &dashboard.latest {
            let _ = writeln!(
                output,
                "- #{} {} on {} ({}, {})",
                response.id,
                response.student_name,
                response.created_at.format("%Y-%m-%d %H:%M"),
                response.education_stage,
                response.device
            );
        }
    }

    output
}
