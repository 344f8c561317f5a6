use chrono::NaiveDate;
use serde::Serialize;

pub type ArtistId = i32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricObservation {
    pub artist_id: ArtistId,
    pub date: NaiveDate,
    pub value: Option<i64>,
}

/// Everything a crossings computation needs, read in one consistent pass.
///
/// `observations` are ordered by artist, then by date ascending.
#[derive(Debug, Clone, Default)]
pub struct MetricSnapshot {
    pub artists: Vec<ArtistId>,
    pub observations: Vec<MetricObservation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtistCrossings {
    pub artist_id: ArtistId,
    pub crossings: Vec<NaiveDate>,
}
