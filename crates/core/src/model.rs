use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The only job status that ends polling.
pub const TERMINAL_STATUS: &str = "COMPLETE";

/// Bearer token obtained from the UAA token endpoint. Held in memory only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub access_token: String,
    pub obtained_at: DateTime<Utc>,
}

impl SessionToken {
    pub fn new(access_token: String) -> Self {
        Self {
            access_token,
            obtained_at: Utc::now(),
        }
    }
}

/// Inbound host event: `{ "payload": { "taskList": [...] } }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InputMessage {
    #[serde(default)]
    pub payload: Value,
}

impl InputMessage {
    pub fn new(payload: Value) -> Self {
        Self { payload }
    }
}

/// One terminal message per submission: the final status body on success,
/// the rendered error otherwise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputMessage {
    pub payload: Value,
}

/// A payload that carries a non-empty `taskList` array.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestRequest {
    body: Value,
}

impl IngestRequest {
    /// Validate a caller payload. The error string describes what was wrong.
    pub fn from_payload(payload: Value) -> Result<Self, String> {
        let tasks = match payload.get("taskList") {
            Some(Value::Array(tasks)) => tasks,
            Some(other) => {
                return Err(format!("taskList must be an array, got {}", json_kind(other)));
            }
            None if payload.is_object() => return Err("payload has no taskList".to_string()),
            None => return Err(format!("payload must be an object, got {}", json_kind(&payload))),
        };
        if tasks.is_empty() {
            return Err("taskList is empty".to_string());
        }
        Ok(Self { body: payload })
    }

    pub fn task_count(&self) -> usize {
        self.body["taskList"].as_array().map_or(0, Vec::len)
    }

    pub fn body(&self) -> &Value {
        &self.body
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Server-assigned identifier returned by a successful submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobHandle {
    pub uuid: String,
}

/// Job state as reported by the status endpoint. Only `COMPLETE` is terminal;
/// every other server string means the job is still running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Complete,
    Other(String),
}

impl JobState {
    pub fn parse(status: &str) -> Self {
        if status == TERMINAL_STATUS {
            JobState::Complete
        } else {
            JobState::Other(status.to_string())
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Complete)
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobState::Complete => TERMINAL_STATUS,
            JobState::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskStatus {
    pub status: String,
}

/// Typed view of the status endpoint body `{ "taskStatusList": [...] }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusReport {
    #[serde(default)]
    pub task_status_list: Vec<TaskStatus>,
}

impl JobStatusReport {
    /// State of the first task; `None` while the server reports no tasks yet.
    pub fn state(&self) -> Option<JobState> {
        self.task_status_list
            .first()
            .map(|task| JobState::parse(&task.status))
    }

    pub fn is_complete(&self) -> bool {
        self.state().is_some_and(|s| s.is_terminal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_non_empty_task_list() {
        let req = IngestRequest::from_payload(json!({"taskList": ["t1", "t2"]})).unwrap();
        assert_eq!(req.task_count(), 2);
        assert_eq!(req.body()["taskList"][0], "t1");
    }

    #[test]
    fn rejects_missing_or_empty_task_list() {
        let err = IngestRequest::from_payload(json!({"tasks": ["t1"]})).unwrap_err();
        assert!(err.contains("no taskList"));

        let err = IngestRequest::from_payload(json!({"taskList": []})).unwrap_err();
        assert!(err.contains("empty"));

        let err = IngestRequest::from_payload(json!({"taskList": "t1"})).unwrap_err();
        assert!(err.contains("a string"));

        let err = IngestRequest::from_payload(Value::Null).unwrap_err();
        assert!(err.contains("null"));
    }

    #[test]
    fn input_message_defaults_missing_payload_to_null() {
        let msg: InputMessage = serde_json::from_str(r#"{"topic":"x"}"#).unwrap();
        assert_eq!(msg.payload, Value::Null);
    }

    #[test]
    fn only_complete_is_terminal() {
        assert!(JobState::parse("COMPLETE").is_terminal());
        assert!(!JobState::parse("complete").is_terminal());
        assert_eq!(JobState::parse("RUNNING"), JobState::Other("RUNNING".into()));
    }

    #[test]
    fn report_uses_first_task_status() {
        let report: JobStatusReport = serde_json::from_value(json!({
            "taskStatusList": [{"status": "COMPLETE"}, {"status": "RUNNING"}]
        }))
        .unwrap();
        assert!(report.is_complete());

        let report: JobStatusReport = serde_json::from_value(json!({
            "taskStatusList": [{"status": "RUNNING"}, {"status": "COMPLETE"}]
        }))
        .unwrap();
        assert!(!report.is_complete());
    }

    #[test]
    fn empty_report_is_still_running() {
        let report: JobStatusReport = serde_json::from_value(json!({})).unwrap();
        assert_eq!(report.state(), None);
        assert!(!report.is_complete());
    }
}
