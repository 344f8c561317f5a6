use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};

use crate::models::{ArtistId, MetricObservation, MetricSnapshot};

/// Read side used by the crossings endpoint.
#[async_trait]
pub trait MetricRepository: Send + Sync {
    /// Artist roster plus every observation ordered by artist, then date
    /// ascending, taken from one consistent view of the data.
    async fn fetch_snapshot(&self) -> anyhow::Result<MetricSnapshot>;
}

#[derive(Clone)]
pub struct PgMetricRepository {
    pool: PgPool,
}

impl PgMetricRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetricRepository for PgMetricRepository {
    async fn fetch_snapshot(&self) -> anyhow::Result<MetricSnapshot> {
        fetch_snapshot(&self.pool).await
    }
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn fetch_snapshot(pool: &PgPool) -> anyhow::Result<MetricSnapshot> {
    let mut tx = pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
        .execute(&mut *tx)
        .await?;

    let artists: Vec<ArtistId> = sqlx::query("SELECT id FROM artist ORDER BY id ASC")
        .fetch_all(&mut *tx)
        .await
        .context("failed to load artists")?
        .into_iter()
        .map(|row| row.get("id"))
        .collect();

    let rows = sqlx::query(
        "SELECT artist_id, date, value FROM metric ORDER BY artist_id ASC, date ASC",
    )
    .fetch_all(&mut *tx)
    .await
    .context("failed to load metrics")?;

    tx.commit().await?;

    let observations = rows
        .into_iter()
        .map(|row| MetricObservation {
            artist_id: row.get("artist_id"),
            date: row.get("date"),
            value: row.get("value"),
        })
        .collect();

    Ok(MetricSnapshot {
        artists,
        observations,
    })
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    // (artist, daily values starting 2021-03-01); None is a missing reading.
    let series: Vec<(ArtistId, Vec<Option<i64>>)> = vec![
        (1, vec![Some(820), Some(950), Some(1_010), Some(990), Some(1_200)]),
        (2, vec![Some(1_500), Some(1_480), Some(900), None, Some(1_050)]),
        (3, vec![Some(40), Some(55), Some(61), Some(70), Some(72)]),
        (4, vec![]),
    ];
    let start = NaiveDate::from_ymd_opt(2021, 3, 1).context("invalid date")?;

    for (artist_id, values) in series {
        upsert_artist(pool, artist_id).await?;

        for (offset, value) in values.into_iter().enumerate() {
            let date = start + chrono::Duration::days(offset as i64);
            upsert_metric(pool, artist_id, date, value).await?;
        }
    }

    Ok(())
}

#[derive(Debug, serde::Deserialize, PartialEq)]
pub struct CsvRow {
    pub artist_id: ArtistId,
    pub date: NaiveDate,
    pub value: Option<i64>,
}

pub fn read_csv(csv_path: &Path) -> anyhow::Result<Vec<CsvRow>> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;

    let mut rows = Vec::new();
    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        // +2: header line and 1-based numbering
        let row = result.with_context(|| format!("invalid row at line {}", line + 2))?;
        rows.push(row);
    }
    Ok(rows)
}

pub async fn import_csv(pool: &PgPool, csv_path: &Path) -> anyhow::Result<usize> {
    let rows = read_csv(csv_path)?;
    let mut written = 0usize;

    for row in rows {
        upsert_artist(pool, row.artist_id).await?;
        written += upsert_metric(pool, row.artist_id, row.date, row.value).await? as usize;
    }

    Ok(written)
}

async fn upsert_artist(pool: &PgPool, artist_id: ArtistId) -> anyhow::Result<()> {
    sqlx::query("INSERT INTO artist (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
        .bind(artist_id)
        .execute(pool)
        .await?;
    Ok(())
}

async fn upsert_metric(
    pool: &PgPool,
    artist_id: ArtistId,
    date: NaiveDate,
    value: Option<i64>,
) -> anyhow::Result<u64> {
    let result = sqlx::query(
        r#"
        INSERT INTO metric (artist_id, date, value)
        VALUES ($1, $2, $3)
        ON CONFLICT (artist_id, date) DO UPDATE
        SET value = EXCLUDED.value
        "#,
    )
    .bind(artist_id)
    .bind(date)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
