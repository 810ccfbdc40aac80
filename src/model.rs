use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Watermark value used before anything has been fetched.
pub const EMPTY_WATERMARK: &str = "";

/// Resolved settings for one monitor session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub base_url: String,
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    pub user_agent: String,
    pub start_on_launch: bool,
    pub attach_on_launch: bool,
}

/// Cumulative statistic for one test step or test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub identity: String,
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub count: u64,
    #[serde(default)]
    pub errors: u64,
    pub last: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunState {
    #[default]
    Stopped,
    Running,
}

impl RunState {
    pub fn from_running(running: bool) -> Self {
        if running {
            RunState::Running
        } else {
            RunState::Stopped
        }
    }

    pub fn is_running(self) -> bool {
        self == RunState::Running
    }

    pub fn label(self) -> &'static str {
        match self {
            RunState::Running => "running",
            RunState::Stopped => "stopped",
        }
    }
}

/// One validated `/statistics` response.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsBatch {
    pub results: Vec<ResultSummary>,
    pub running: bool,
}

#[derive(Debug, Deserialize)]
struct WireStatistics {
    #[serde(default)]
    results: Option<Vec<WireSummary>>,
    running: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct WireSummary {
    #[serde(alias = "teststep", alias = "testcase", alias = "name")]
    identity: Option<String>,
    #[serde(alias = "avg_ms", alias = "avg")]
    average: Option<f64>,
    #[serde(alias = "min_ms")]
    min: Option<f64>,
    #[serde(alias = "max_ms")]
    max: Option<f64>,
    count: Option<u64>,
    #[serde(default, alias = "errors")]
    error: Option<u64>,
    last: Option<String>,
}

impl WireSummary {
    fn validate(self, index: usize) -> Result<ResultSummary, String> {
        let identity = match self.identity {
            Some(id) if !id.trim().is_empty() => id,
            _ => return Err(format!("row {index}: missing identity")),
        };
        let number = |field: &str, v: Option<f64>| -> Result<f64, String> {
            match v {
                Some(x) if x.is_finite() => Ok(x),
                Some(_) => Err(format!("row {index} ({identity}): {field} is not finite")),
                None => Err(format!("row {index} ({identity}): missing {field}")),
            }
        };
        let average = number("average", self.average)?;
        let min = number("min", self.min)?;
        let max = number("max", self.max)?;
        let count = self
            .count
            .ok_or_else(|| format!("row {index} ({identity}): missing count"))?;
        let last = self
            .last
            .ok_or_else(|| format!("row {index} ({identity}): missing last"))?;
        Ok(ResultSummary {
            identity,
            average,
            min,
            max,
            count,
            errors: self.error.unwrap_or(0),
            last,
        })
    }
}

impl StatisticsBatch {
    /// Decode and validate a statistics payload. Any bad row rejects the whole batch.
    pub fn from_json(body: &[u8]) -> Result<Self, String> {
        let wire: WireStatistics =
            serde_json::from_slice(body).map_err(|e| format!("invalid JSON: {e}"))?;
        let running = wire.running.ok_or("missing running flag")?;
        let results = wire
            .results
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(i, row)| row.validate(i))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { results, running })
    }
}

/// Owned copy of the store handed to presentation layers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultSnapshot {
    pub captured_utc: String,
    pub run_state: RunState,
    pub watermark: String,
    pub results: Vec<ResultSummary>,
}

/// Runner configuration as returned by `GET /config`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub config: serde_json::Value,
    #[serde(default)]
    pub mtime: serde_json::Value,
}

#[derive(Debug, Clone)]
pub enum MonitorEvent {
    RunStateChanged {
        state: RunState,
    },
    Snapshot {
        // Boxed so the enum stays small; snapshots carry the full row set.
        snapshot: Box<ResultSnapshot>,
    },
    PollFailed {
        error: String,
        running: bool,
    },
    RunFinished {
        snapshot: Box<ResultSnapshot>,
    },
    Info(InfoEvent),
}

/// Structured info events emitted by the controller and consumed by UI/CLI layers.
#[derive(Debug, Clone)]
pub enum InfoEvent {
    Message(String),
    CommandSent { command: &'static str },
    CommandFailed { command: &'static str, error: String },
    StartIgnored,
    StopIgnored,
}

impl InfoEvent {
    /// Render a human-readable message for UI/CLI layers.
    pub fn to_message(&self) -> String {
        match self {
            InfoEvent::Message(msg) => msg.clone(),
            InfoEvent::CommandSent { command } => format!("{command}: accepted by runner"),
            InfoEvent::CommandFailed { command, error } => format!("{command} failed: {error}"),
            InfoEvent::StartIgnored => "Test is already running".to_string(),
            InfoEvent::StopIgnored => "No test is running".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reference_runner_payload() {
        let body = br#"{"results":[{"teststep":"sth","avg_ms":6.666666,"min_ms":2,
            "max_ms":10,"count":3,"error":0,"last":"2016-01-12T10:00:00.123Z"}],"running":false}"#;
        let batch = StatisticsBatch::from_json(body).expect("valid payload");
        assert!(!batch.running);
        assert_eq!(batch.results.len(), 1);
        let row = &batch.results[0];
        assert_eq!(row.identity, "sth");
        assert_eq!(row.min, 2.0);
        assert_eq!(row.max, 10.0);
        assert_eq!(row.count, 3);
        assert_eq!(row.last, "2016-01-12T10:00:00.123Z");
    }

    #[test]
    fn parses_canonical_field_names() {
        let body = br#"{"results":[{"identity":"01","average":1.5,"min":1,"max":2,
            "count":2,"last":"0816"}],"running":true}"#;
        let batch = StatisticsBatch::from_json(body).unwrap();
        assert!(batch.running);
        assert_eq!(batch.results[0].identity, "01");
        assert_eq!(batch.results[0].errors, 0);
    }

    #[test]
    fn null_results_is_an_empty_batch() {
        let batch = StatisticsBatch::from_json(br#"{"results":null,"running":true}"#).unwrap();
        assert!(batch.results.is_empty());
        let batch = StatisticsBatch::from_json(br#"{"running":false}"#).unwrap();
        assert!(batch.results.is_empty());
    }

    #[test]
    fn missing_running_flag_is_rejected() {
        let err = StatisticsBatch::from_json(br#"{"results":[]}"#).unwrap_err();
        assert!(err.contains("running"), "{err}");
    }

    #[test]
    fn one_bad_row_rejects_the_batch() {
        let body = br#"{"results":[
            {"identity":"ok","average":1,"min":1,"max":1,"count":1,"last":"a"},
            {"identity":"broken","average":1,"min":1,"count":1,"last":"b"}
        ],"running":true}"#;
        let err = StatisticsBatch::from_json(body).unwrap_err();
        assert!(err.contains("broken") && err.contains("max"), "{err}");
    }

    #[test]
    fn blank_identity_is_rejected() {
        let body = br#"{"results":[{"identity":"  ","average":1,"min":1,"max":1,
            "count":1,"last":"a"}],"running":true}"#;
        assert!(StatisticsBatch::from_json(body).is_err());
    }

    #[test]
    fn wrong_types_are_rejected() {
        let body = br#"{"results":[{"identity":"a","average":"fast","min":1,"max":1,
            "count":1,"last":"a"}],"running":true}"#;
        assert!(StatisticsBatch::from_json(body).is_err());
        assert!(StatisticsBatch::from_json(b"not json").is_err());
    }

    #[test]
    fn run_state_follows_running_flag() {
        assert_eq!(RunState::from_running(true), RunState::Running);
        assert_eq!(RunState::from_running(false), RunState::Stopped);
        assert_eq!(RunState::default(), RunState::Stopped);
    }
}
