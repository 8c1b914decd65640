use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, info};

use crate::models::{NewSurveyResponse, SurveyResponse};

/// Read and append access to stored survey rows.
///
/// Every read returns rows ordered by `created_at` ascending (ties by `id`).
#[async_trait]
pub trait ResponseStore: Send + Sync {
    async fn insert(
        &self,
        response: &NewSurveyResponse,
        created_at: DateTime<Utc>,
    ) -> anyhow::Result<SurveyResponse>;

    async fn fetch_all(&self) -> anyhow::Result<Vec<SurveyResponse>>;

    /// Rows with `start <= created_at < end`.
    async fn fetch_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<SurveyResponse>>;
}

const SELECT_COLUMNS: &str = "SELECT id, student_name, gender, education_stage, satisfaction, \
     understanding_help, device, internet_quality, platform_ease, teacher_interaction, \
     study_preference, continue_elearning, created_at \
     FROM survey_reports.responses";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn from_row(row: &PgRow) -> anyhow::Result<SurveyResponse> {
    Ok(SurveyResponse {
        id: row.try_get("id")?,
        student_name: row.try_get("student_name")?,
        gender: row.try_get("gender")?,
        education_stage: row.try_get("education_stage")?,
        satisfaction: row.try_get("satisfaction")?,
        understanding_help: row.try_get("understanding_help")?,
        device: row.try_get("device")?,
        internet_quality: row.try_get("internet_quality")?,
        platform_ease: row.try_get("platform_ease")?,
        teacher_interaction: row.try_get("teacher_interaction")?,
        study_preference: row.try_get("study_preference")?,
        continue_elearning: row.try_get("continue_elearning")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl ResponseStore for PgPool {
    async fn insert(
        &self,
        response: &NewSurveyResponse,
        created_at: DateTime<Utc>,
    ) -> anyhow::Result<SurveyResponse> {
        let row = sqlx::query(
            r#"
            INSERT INTO survey_reports.responses
            (student_name, gender, education_stage, satisfaction, understanding_help, device,
             internet_quality, platform_ease, teacher_interaction, study_preference,
             continue_elearning, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id, student_name, gender, education_stage, satisfaction,
                      understanding_help, device, internet_quality, platform_ease,
                      teacher_interaction, study_preference, continue_elearning, created_at
            "#,
        )
        .bind(&response.student_name)
        .bind(&response.gender)
        .bind(&response.education_stage)
        .bind(&response.satisfaction)
        .bind(&response.understanding_help)
        .bind(&response.device)
        .bind(&response.internet_quality)
        .bind(&response.platform_ease)
        .bind(&response.teacher_interaction)
        .bind(&response.study_preference)
        .bind(&response.continue_elearning)
        .bind(created_at)
        .fetch_one(self)
        .await
        .context("failed to insert survey response")?;

        from_row(&row)
    }

    async fn fetch_all(&self) -> anyhow::Result<Vec<SurveyResponse>> {
        let query = format!("{SELECT_COLUMNS} ORDER BY created_at ASC, id ASC");
        let rows = sqlx::query(&query)
            .fetch_all(self)
            .await
            .context("failed to load survey responses")?;
        debug!(rows = rows.len(), "loaded all responses");
        rows.iter().map(from_row).collect()
    }

    async fn fetch_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<SurveyResponse>> {
        let query = format!(
            "{SELECT_COLUMNS} WHERE created_at >= $1 AND created_at < $2 \
             ORDER BY created_at ASC, id ASC"
        );
        let rows = sqlx::query(&query)
            .bind(start)
            .bind(end)
            .fetch_all(self)
            .await
            .context("failed to load survey responses for range")?;
        debug!(rows = rows.len(), %start, %end, "loaded responses for range");
        rows.iter().map(from_row).collect()
    }
}

fn answer(
    student_name: &str,
    gender: &str,
    education_stage: &str,
    satisfaction: &str,
    understanding_help: &str,
    device: &str,
    internet_quality: &str,
) -> NewSurveyResponse {
    NewSurveyResponse {
        student_name: student_name.to_string(),
        gender: gender.to_string(),
        education_stage: education_stage.to_string(),
        satisfaction: satisfaction.to_string(),
        understanding_help: understanding_help.to_string(),
        device: device.to_string(),
        internet_quality: internet_quality.to_string(),
        platform_ease: "سهلة".to_string(),
        teacher_interaction: "جيد".to_string(),
        study_preference: "مدمج".to_string(),
        continue_elearning: "نعم".to_string(),
    }
}

pub async fn seed(store: &dyn ResponseStore) -> anyhow::Result<usize> {
    let answers = vec![
        (0, answer("علي حسن", "ذكر", "إعدادية", "راضٍ", "نعم", "هاتف", "جيدة")),
        (0, answer("مريم كاظم", "أنثى", "جامعة", "راضٍ جداً", "نعم", "حاسوب", "ممتازة")),
        (1, answer("زيد عباس", "ذكر", "متوسطة", "محايد", "أحياناً", "هاتف", "ضعيفة")),
        (2, answer("نور جاسم", "أنثى", "إعدادية", "غير راضٍ", "لا", "جهاز لوحي", "جيدة")),
        (2, answer("حسين علي", "ذكر", "جامعة", "راضٍ", "نعم", "حاسوب", "جيدة")),
        (4, answer("سارة محمد", "أنثى", "متوسطة", "راضٍ", "أحياناً", "هاتف", "ضعيفة")),
        (6, answer("يوسف أحمد", "ذكر", "إعدادية", "محايد", "نعم", "هاتف", "جيدة")),
    ];

    let now = Utc::now();
    let mut inserted = 0usize;
    for (days_ago, response) in answers {
        store
            .insert(&response, now - Duration::days(days_ago))
            .await?;
        inserted += 1;
    }

    info!(inserted, "seeded survey responses");
    Ok(inserted)
}

pub async fn import_csv(
    store: &dyn ResponseStore,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        student_name: String,
        gender: String,
        education_stage: String,
        satisfaction: String,
        understanding_help: String,
        device: String,
        internet_quality: String,
        platform_ease: String,
        teacher_interaction: String,
        study_preference: String,
        continue_elearning: String,
        created_at: Option<DateTime<Utc>>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        // header is line 1
        let line = index + 2;
        let row = result.with_context(|| format!("line {line}: malformed row"))?;
        let response = NewSurveyResponse {
            student_name: row.student_name,
            gender: row.gender,
            education_stage: row.education_stage,
            satisfaction: row.satisfaction,
            understanding_help: row.understanding_help,
            device: row.device,
            internet_quality: row.internet_quality,
            platform_ease: row.platform_ease,
            teacher_interaction: row.teacher_interaction,
            study_preference: row.study_preference,
            continue_elearning: row.continue_elearning,
        }
        .validate()
            .map_err(|e| anyhow::anyhow!("line {line}: {e}"))?;

        store
            .insert(&response, row.created_at.unwrap_or_else(Utc::now))
            .await?;
        inserted += 1;
    }

    info!(inserted, path = %csv_path.display(), "imported survey responses");
    Ok(inserted)
}


#[cfg(test)]
mod tests {
    use super::testing::MemoryStore;
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn seed_inserts_every_sample() {
        let store = MemoryStore::default();
        let inserted = seed(&store).await.unwrap();
        assert_eq!(inserted, store.fetch_all().await.unwrap().len());
    }

    #[tokio::test]
    async fn import_reads_rows_and_timestamps() {
        let path = std::env::temp_dir().join(format!("survey-import-{}.csv", std::process::id()));
        {
            let mut file = std::fs::File::create(&path).unwrap();
            writeln!(
                file,
                "student_name,gender,education_stage,satisfaction,understanding_help,device,\
                 internet_quality,platform_ease,teacher_interaction,study_preference,\
                 continue_elearning,created_at"
            )
            .unwrap();
            writeln!(
                file,
                " Ali ,male,college,happy,yes,Phone,good,easy,good,online,yes,2024-01-10T21:00:00Z"
            )
            .unwrap();
            writeln!(
                file,
                "Mona,female,school,neutral,no,Laptop,poor,hard,weak,class,no,"
            )
            .unwrap();
        }

        let store = MemoryStore::default();
        let inserted = import_csv(&store, &path).await.unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(inserted, 2);
        let rows = store.fetch_all().await.unwrap();
        assert_eq!(rows[0].student_name, "Ali");
        assert_eq!(rows[0].created_at.to_rfc3339(), "2024-01-10T21:00:00+00:00");
        assert_eq!(rows[1].device, "Laptop");
    }

    #[tokio::test]
    async fn import_stops_at_blank_answer() {
        let path = std::env::temp_dir().join(format!("survey-blank-{}.csv", std::process::id()));
        std::fs::write(
            &path,
            "student_name,gender,education_stage,satisfaction,understanding_help,device,\
             internet_quality,platform_ease,teacher_interaction,study_preference,\
             continue_elearning,created_at\n\
             Ali,male,college,happy,yes,,good,easy,good,online,yes,\n",
        )
        .unwrap();

        let store = MemoryStore::default();
        let err = import_csv(&store, &path).await.unwrap_err();
        std::fs::remove_file(&path).ok();

        assert!(err.to_string().contains("line 2"));
        assert!(err.to_string().contains("device"));
        assert!(store.fetch_all().await.unwrap().is_empty());
    }
}
