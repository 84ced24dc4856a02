use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

pub type SourceId = i64;
pub type ItemId = i64;
pub type JobId = i64;

/// A monitored channel, tracked by address and lifecycle status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: SourceId,
    #[serde(rename = "tg_url")]
    pub address: String,
    #[serde(default)]
    pub title: Option<String>,
    pub status: String,
    #[serde(deserialize_with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Source {
    /// Title when the backend resolved one, otherwise the address.
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(&self.address)
    }

    pub fn is_active(&self) -> bool {
        self.status == "active"
    }

    /// The address as an absolute URL, if it parses as one.
    pub fn external_url(&self) -> Option<Url> {
        Url::parse(self.address.trim()).ok()
    }
}

/// One captured post belonging to a [`Source`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    #[serde(rename = "channel_id")]
    pub source_id: SourceId,
    #[serde(rename = "tg_message_id")]
    pub sequence: i64,
    #[serde(rename = "posted_at", default, deserialize_with = "optional_timestamp")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub views: Option<i64>,
    #[serde(default)]
    pub forwards: Option<i64>,
    #[serde(default)]
    pub replies: Option<i64>,
    #[serde(default)]
    pub reactions: Option<i64>,
}

impl Item {
    /// Sum of the four engagement counters, absent counters count as zero.
    pub fn engagement(&self) -> i64 {
        [self.views, self.forwards, self.replies, self.reactions]
            .iter()
            .map(|c| c.unwrap_or(0))
            .sum()
    }
}

/// One page of items as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItemPage {
    pub items: Vec<Item>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Maps a wire status. Unknown values (including `queued`) are pending.
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "running" => JobStatus::Running,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Pending,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JobStats {
    #[serde(default)]
    pub inserted: Option<u64>,
}

/// Snapshot of the latest background ingestion job for a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    #[serde(default, deserialize_with = "status_or_pending")]
    pub status: JobStatus,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub stats: Option<JobStats>,
}

// The backend sends `null` for jobs that have not been picked up yet.
fn status_or_pending<'de, D>(deserializer: D) -> Result<JobStatus, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .map(|raw| JobStatus::from_wire(&raw))
        .unwrap_or_default())
}

// Accepts RFC 3339 and offset-less ISO 8601, the latter read as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|at| at.and_utc())
        })
}

fn timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp {raw:?}")))
}

fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp {raw:?}"))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(views: Option<i64>, forwards: Option<i64>) -> Item {
        Item {
            id: 1,
            source_id: 1,
            sequence: 1,
            published_at: None,
            text: None,
            views,
            forwards,
            replies: Some(1),
            reactions: Some(3),
        }
    }

    #[test]
    fn engagement_treats_missing_counters_as_zero() {
        assert_eq!(item(Some(10), Some(2)).engagement(), 16);
        assert_eq!(item(None, None).engagement(), 4);
    }

    #[test]
    fn job_status_decodes_unknown_and_null_as_pending() {
        let job: Job =
            serde_json::from_str(r#"{"id":1,"status":"queued","error":null,"stats":null}"#)
                .unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        let job: Job = serde_json::from_str(r#"{"id":2,"status":null}"#).unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        let job: Job = serde_json::from_str(
            r#"{"id":3,"status":"completed","stats":{"inserted":12}}"#,
        )
        .unwrap();
        assert!(job.status.is_terminal());
        assert_eq!(job.stats.unwrap().inserted, Some(12));
    }

    #[test]
    fn timestamps_without_offset_are_utc() {
        let source: Source = serde_json::from_str(
            r#"{"id":4,"tg_url":"https://t.me/durov","title":null,"status":"active","created_at":"2024-05-01T08:00:00.250000"}"#,
        )
        .unwrap();
        assert_eq!(source.created_at.to_rfc3339(), "2024-05-01T08:00:00.250+00:00");

        let item: Item = serde_json::from_str(
            r#"{"id":1,"channel_id":4,"tg_message_id":77,"posted_at":"2024-05-01T10:00:00+02:00","views":null}"#,
        )
        .unwrap();
        assert_eq!(item.published_at.unwrap().to_rfc3339(), "2024-05-01T08:00:00+00:00");
        assert_eq!(item.views, None);
    }

    #[test]
    fn display_title_falls_back_to_address() {
        let source = Source {
            id: 1,
            address: "https://t.me/durov".to_string(),
            title: None,
            status: "pending".to_string(),
            created_at: Utc::now(),
        };
        assert_eq!(source.display_title(), "https://t.me/durov");
        assert_eq!(source.external_url().unwrap().host_str(), Some("t.me"));
    }
}
