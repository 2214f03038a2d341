use super::types::TaskStatus;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::{fs, io, path::PathBuf};

/// Snapshot of a server-side task, as returned by upload and status calls.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TaskRecord {
    #[serde(default)]
    pub task_id: String,
    #[serde(default)]
    pub user_id: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub success: u64,
    #[serde(default)]
    pub failure: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl TaskRecord {
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn result_url(&self) -> Option<&str> {
        self.result_url.as_deref()
    }

    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub const fn is_in_flight(&self) -> bool {
        self.status.is_in_flight()
    }

    /// Numbers not yet checked.
    pub const fn pending(&self) -> u64 {
        self.total
            .saturating_sub(self.success)
            .saturating_sub(self.failure)
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at.as_deref().and_then(parse_timestamp)
    }

    /// # Errors
    ///
    /// Returns the violated rule when the snapshot is internally
    /// inconsistent: an exported task without a result location, a result
    /// location on any other status, or more checked numbers than the
    /// total.
    pub fn validate(&self) -> Result<(), String> {
        let has_url = self.result_url.as_deref().is_some_and(|url| !url.is_empty());

        match (self.status, has_url) {
            (TaskStatus::Exported, false) => {
                return Err("task is exported but has no result_url".to_owned())
            }
            (status, true) if status != TaskStatus::Exported => {
                return Err(format!("task is {status} but carries a result_url"));
            }
            _ => (),
        }

        if self.success.saturating_add(self.failure) > self.total {
            return Err(format!(
                "success ({}) + failure ({}) exceeds total ({})",
                self.success, self.failure, self.total
            ));
        }

        Ok(())
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    // The API has been seen returning naive timestamps, assume UTC
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// What gets uploaded: a line-delimited list of phone numbers.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TaskInput {
    Path(PathBuf),
    Bytes { file_name: String, content: Vec<u8> },
}

impl TaskInput {
    pub const DEFAULT_FILE_NAME: &'static str = "input.txt";

    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    pub fn bytes(file_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self::Bytes {
            file_name: file_name.into(),
            content: content.into(),
        }
    }

    /// Builds the upload body in memory, one number per line. Blank entries
    /// are skipped and surrounding whitespace is trimmed.
    pub fn from_numbers<I, S>(numbers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let content = numbers
            .into_iter()
            .filter_map(|number| {
                let number = number.as_ref().trim();
                (!number.is_empty()).then(|| number.to_owned())
            })
            .collect::<Vec<_>>()
            .join("\n");

        Self::bytes(Self::DEFAULT_FILE_NAME, content)
    }

    /// Resolves the input into the multipart file name and body.
    ///
    /// # Errors
    ///
    /// Fails if the file can't be read.
    pub(crate) fn load(self) -> io::Result<(String, Vec<u8>)> {
        match self {
            Self::Path(path) => {
                let content = fs::read(&path)?;
                let file_name = path
                    .file_name()
                    .map_or_else(
                        || Self::DEFAULT_FILE_NAME.to_owned(),
                        |name| name.to_string_lossy().into_owned(),
                    );
                Ok((file_name, content))
            }
            Self::Bytes { file_name, content } => Ok((file_name, content)),
        }
    }
}

pub(crate) fn has_numbers(content: &[u8]) -> bool {
    content
        .split(|byte| *byte == b'\n')
        .any(|line| line.iter().any(|byte| !byte.is_ascii_whitespace()))
}
