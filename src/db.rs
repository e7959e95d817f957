use anyhow::Context;
use chrono::NaiveDate;
use serde_json::{json, Value};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::ingest::{self, AttemptRow};
use crate::models::{SessionBatch, SessionContext};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

struct NewAttempt<'a> {
    source_key: &'a str,
    session_id: Uuid,
    participant_id: Uuid,
    test_id: Uuid,
    status: &'a str,
    raw_score: Option<f64>,
    scaled_score: Option<f64>,
    percentile: Option<f64>,
    time_spent_seconds: Option<f64>,
    traits: Option<Value>,
}

async fn upsert_participant(pool: &PgPool, full_name: &str, email: &str) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO assessment_analytics.participants (id, full_name, email)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO UPDATE
        SET full_name = EXCLUDED.full_name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(full_name)
    .bind(email)
    .fetch_one(pool)
    .await?
    .get("id");
    Ok(id)
}

async fn upsert_session(
    pool: &PgPool,
    code: &str,
    name: Option<&str>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO assessment_analytics.sessions (id, code, name, start_date, end_date)
        VALUES ($1, $2, COALESCE($3, $2), $4, $5)
        ON CONFLICT (code) DO UPDATE
        SET name = COALESCE($3, assessment_analytics.sessions.name),
            start_date = COALESCE(EXCLUDED.start_date, assessment_analytics.sessions.start_date),
            end_date = COALESCE(EXCLUDED.end_date, assessment_analytics.sessions.end_date)
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(code)
    .bind(name)
    .bind(start_date)
    .bind(end_date)
    .fetch_one(pool)
    .await?
    .get("id");
    Ok(id)
}

async fn upsert_test_module(
    pool: &PgPool,
    name: &str,
    time_limit_minutes: Option<i32>,
) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO assessment_analytics.test_modules (id, name, time_limit_minutes)
        VALUES ($1, $2, $3)
        ON CONFLICT (name) DO UPDATE
        SET time_limit_minutes = COALESCE(
            EXCLUDED.time_limit_minutes,
            assessment_analytics.test_modules.time_limit_minutes
        )
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(time_limit_minutes)
    .fetch_one(pool)
    .await?
    .get("id");
    Ok(id)
}

async fn insert_attempt(pool: &PgPool, attempt: NewAttempt<'_>) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO assessment_analytics.attempts
        (id, session_id, participant_id, test_id, status, raw_score, scaled_score,
         percentile, time_spent_seconds, traits, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(attempt.session_id)
    .bind(attempt.participant_id)
    .bind(attempt.test_id)
    .bind(attempt.status)
    .bind(attempt.raw_score)
    .bind(attempt.scaled_score)
    .bind(attempt.percentile)
    .bind(attempt.time_spent_seconds)
    .bind(attempt.traits.map(Json))
    .bind(attempt.source_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let session_id = upsert_session(
        pool,
        "GRAD-2026",
        Some("Graduate Intake 2026"),
        NaiveDate::from_ymd_opt(2026, 2, 2),
        NaiveDate::from_ymd_opt(2026, 2, 6),
    )
    .await?;
    let numerical = upsert_test_module(pool, "Numerical Reasoning", Some(30)).await?;
    let personality = upsert_test_module(pool, "Work Personality Inventory", Some(45)).await?;

    let participants = vec![
        ("Avery Lee", "avery.lee@example.com", 91.0, 88.0, 1500.0, [86, 92, 74, 38]),
        ("Jules Moreno", "jules.moreno@example.com", 76.0, 68.0, 2100.0, [71, 64, 82, 55]),
        ("Kiara Patel", "kiara.patel@example.com", 64.0, 52.0, 2700.0, [48, 81, 57, 66]),
        ("Noor Haddad", "noor.haddad@example.com", 47.0, 21.0, 3300.0, [35, 44, 29, 72]),
        ("Tomas Berg", "tomas.berg@example.com", 83.0, 79.0, 1800.0, [90, 58, 77, 18]),
    ];
    let trait_names = ["Analytical Thinking", "Teamwork", "Resilience", "Attention to Detail"];

    for (full_name, email, scaled, percentile, seconds, trait_scores) in participants {
        let participant_id = upsert_participant(pool, full_name, email).await?;
        let traits: Vec<Value> = trait_names
            .iter()
            .zip(trait_scores)
            .map(|(name, score)| json!({ "name": name, "category": "Work Style", "score": score }))
            .collect();

        let numerical_key = format!("seed-{email}-numerical");
        insert_attempt(
            pool,
            NewAttempt {
                source_key: &numerical_key,
                session_id,
                participant_id,
                test_id: numerical,
                status: ingest::COMPLETED_STATUS,
                raw_score: Some((scaled * 0.4_f64).round()),
                scaled_score: Some(scaled),
                percentile: Some(percentile),
                time_spent_seconds: Some(seconds * 0.5),
                traits: None,
            },
        )
        .await?;

        let personality_key = format!("seed-{email}-personality");
        insert_attempt(
            pool,
            NewAttempt {
                source_key: &personality_key,
                session_id,
                participant_id,
                test_id: personality,
                status: ingest::COMPLETED_STATUS,
                raw_score: None,
                scaled_score: Some(scaled - 4.0),
                percentile: Some(percentile),
                time_spent_seconds: Some(seconds),
                traits: Some(Value::Array(traits)),
            },
        )
        .await?;
    }

    Ok(())
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        full_name: String,
        email: String,
        session_code: String,
        session_name: Option<String>,
        test_name: String,
        time_limit_minutes: Option<i32>,
        status: String,
        raw_score: Option<f64>,
        scaled_score: Option<f64>,
        percentile: Option<f64>,
        time_spent_seconds: Option<f64>,
        traits: Option<String>,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let participant_id = upsert_participant(pool, &row.full_name, &row.email).await?;
        let session_id =
            upsert_session(pool, &row.session_code, row.session_name.as_deref(), None, None).await?;
        let test_id = upsert_test_module(pool, &row.test_name, row.time_limit_minutes).await?;

        // Kept verbatim when it is not JSON; ingestion decides what to do with it.
        let traits = row
            .traits
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| serde_json::from_str::<Value>(&raw).unwrap_or(Value::String(raw)));

        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let created = insert_attempt(
            pool,
            NewAttempt {
                source_key: &source_key,
                session_id,
                participant_id,
                test_id,
                status: row.status.trim(),
                raw_score: row.raw_score,
                scaled_score: row.scaled_score,
                percentile: row.percentile,
                time_spent_seconds: row.time_spent_seconds,
                traits,
            },
        )
        .await?;

        if created {
            inserted += 1;
        }
    }

    info!(inserted, path = %csv_path.display(), "attempt import finished");
    Ok(inserted)
}

/// Loads one session and folds its attempts into participant records.
pub async fn fetch_session_batch(pool: &PgPool, session_code: &str) -> anyhow::Result<SessionBatch> {
    let session_row = sqlx::query(
        "SELECT id, code, name, start_date, end_date \
         FROM assessment_analytics.sessions WHERE code = $1",
    )
    .bind(session_code)
    .fetch_optional(pool)
    .await?
    .with_context(|| format!("session {session_code} not found"))?;

    let session = SessionContext {
        session_id: session_row.get("id"),
        name: session_row.get("name"),
        code: session_row.get("code"),
        start_date: session_row.get("start_date"),
        end_date: session_row.get("end_date"),
    };

    let records = sqlx::query(
        "SELECT p.id AS participant_id, p.full_name, p.email, \
         t.id AS test_id, t.name AS test_name, t.time_limit_minutes, \
         a.status, a.raw_score, a.scaled_score, a.percentile, a.time_spent_seconds, a.traits \
         FROM assessment_analytics.attempts a \
         JOIN assessment_analytics.participants p ON p.id = a.participant_id \
         JOIN assessment_analytics.test_modules t ON t.id = a.test_id \
         WHERE a.session_id = $1 \
         ORDER BY p.full_name, p.id, a.recorded_at, a.id",
    )
    .bind(session.session_id)
    .fetch_all(pool)
    .await?;

    let mut rows = Vec::with_capacity(records.len());
    for row in records {
        let traits: Option<Json<Value>> = row.get("traits");
        rows.push(AttemptRow {
            user_id: row.get("participant_id"),
            full_name: row.get("full_name"),
            email: row.get("email"),
            test_id: row.get("test_id"),
            test_name: row.get("test_name"),
            time_limit_minutes: row.get("time_limit_minutes"),
            status: row.get("status"),
            raw_score: row.get("raw_score"),
            scaled_score: row.get("scaled_score"),
            percentile: row.get("percentile"),
            time_spent_seconds: row.get("time_spent_seconds"),
            traits: traits.map(|Json(value)| value),
        });
    }

    let participants = ingest::aggregate_attempts(&rows);
    debug!(
        session = %session.code,
        attempts = rows.len(),
        participants = participants.len(),
        "session batch loaded"
    );

    Ok(SessionBatch {
        session,
        participants,
    })
}
