//! Termination detection over the spot metadata endpoints.
//!
//! Two wire formats are supported:
//! - `instance-action`: JSON `{"action": "...", "time": "<RFC3339>"}`
//! - `termination-time`: a bare RFC3339 timestamp
//!
//! Both answer 404 while no termination is scheduled. Presence of a
//! non-zero instant is the only signal; the instant is never compared
//! against the local clock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::client::{MetadataClient, MetadataResponse};
use crate::error::{DetectError, FetchError};

/// Link-local instance metadata service
pub const DEFAULT_BASE_URL: &str = "http://169.254.169.254";

pub const INSTANCE_ACTION_PATH: &str = "/latest/meta-data/spot/instance-action";
pub const TERMINATION_TIME_PATH: &str = "/latest/meta-data/spot/termination-time";

/// Unix timestamp of `0001-01-01T00:00:00Z`, the "unset" instant
const ZERO_INSTANT_SECS: i64 = -62_135_596_800;

fn is_zero_instant(t: &DateTime<Utc>) -> bool {
    t.timestamp() == ZERO_INSTANT_SECS && t.timestamp_subsec_nanos() == 0
}

/// Which endpoint to poll and how to read its body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectorKind {
    /// Structured JSON action record
    #[default]
    InstanceAction,
    /// Plain timestamp probe
    TerminationTime,
}

impl DetectorKind {
    pub const fn path(self) -> &'static str {
        match self {
            Self::InstanceAction => INSTANCE_ACTION_PATH,
            Self::TerminationTime => TERMINATION_TIME_PATH,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::InstanceAction => "instance-action",
            Self::TerminationTime => "termination-time",
        }
    }
}

impl std::fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// `instance-action` payload.
///
/// A missing, null or zero `time` means no action is scheduled; `action`
/// is only meaningful when `time` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InstanceAction {
    pub action: String,
    #[serde(deserialize_with = "deserialize_instant")]
    pub time: Option<DateTime<Utc>>,
}

fn deserialize_instant<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<DateTime<Utc>> = Option::deserialize(deserializer)?;
    Ok(opt.filter(|t| !is_zero_instant(t)))
}

impl InstanceAction {
    pub fn parse(body: &str) -> Result<Self, DetectError> {
        Ok(serde_json::from_str(body)?)
    }

    pub fn is_terminating(&self) -> bool {
        self.time.is_some()
    }
}

/// `termination-time` payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    /// Nothing scheduled (404, empty or non-timestamp body)
    Absent,
    Scheduled(DateTime<Utc>),
}

impl ProbeResult {
    /// Parse a bare RFC3339 body. Anything that doesn't parse is `Absent`.
    pub fn parse(body: &str) -> Self {
        match DateTime::parse_from_rfc3339(body.trim()) {
            Ok(t) => {
                let t = t.with_timezone(&Utc);
                if is_zero_instant(&t) {
                    Self::Absent
                } else {
                    Self::Scheduled(t)
                }
            }
            Err(_) => Self::Absent,
        }
    }
}

/// Metadata attached to a terminating decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub time: DateTime<Utc>,
    /// Only reported by the `instance-action` endpoint
    pub action: Option<String>,
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let time = self.time.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true);
        match &self.action {
            Some(action) => write!(f, "{time} {action}"),
            None => write!(f, "{time}"),
        }
    }
}

/// Outcome of one check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    NotTerminating,
    Terminating(Notice),
}

impl From<InstanceAction> for Decision {
    fn from(ia: InstanceAction) -> Self {
        match ia.time {
            Some(time) => Self::Terminating(Notice {
                time,
                action: Some(ia.action).filter(|a| !a.is_empty()),
            }),
            None => Self::NotTerminating,
        }
    }
}

impl From<ProbeResult> for Decision {
    fn from(probe: ProbeResult) -> Self {
        match probe {
            ProbeResult::Scheduled(time) => Self::Terminating(Notice { time, action: None }),
            ProbeResult::Absent => Self::NotTerminating,
        }
    }
}

/// Reject statuses that are neither success nor the steady-state 404
fn expect_status(resp: &MetadataResponse) -> Result<(), FetchError> {
    if resp.is_success() || resp.is_not_found() {
        Ok(())
    } else {
        Err(FetchError::Status {
            status: resp.status,
            body: resp.body.clone(),
        })
    }
}

/// Interpret an `instance-action` response.
///
/// 404 is the zero value (not terminating); a success body must be valid JSON.
pub fn interpret_instance_action(resp: &MetadataResponse) -> Result<Decision, DetectError> {
    expect_status(resp)?;
    if resp.is_not_found() {
        return Ok(Decision::NotTerminating);
    }
    InstanceAction::parse(&resp.body).map(Decision::from)
}

/// Interpret a `termination-time` response.
///
/// Error pages are never parsed; a success body that isn't a timestamp is
/// the steady state, not an error.
pub fn interpret_termination_time(resp: &MetadataResponse) -> Result<Decision, DetectError> {
    expect_status(resp)?;
    if resp.is_not_found() {
        return Ok(Decision::NotTerminating);
    }
    Ok(ProbeResult::parse(&resp.body).into())
}

/// Termination detector: one endpoint, one interpretation
#[derive(Debug, Clone)]
pub struct Detector {
    kind: DetectorKind,
    client: MetadataClient,
    url: String,
}

impl Detector {
    /// Detector for `kind`'s well-known path under `base_url`
    pub fn new(kind: DetectorKind, client: MetadataClient, base_url: &str) -> Self {
        let url = format!("{}{}", base_url.trim_end_matches('/'), kind.path());
        Self::with_url(kind, client, url)
    }

    /// Detector polling an explicit URL
    pub fn with_url(kind: DetectorKind, client: MetadataClient, url: impl Into<String>) -> Self {
        Self {
            kind,
            client,
            url: url.into(),
        }
    }

    pub fn kind(&self) -> DetectorKind {
        self.kind
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch once and decide.
    ///
    /// Blocks for at most the client timeout plus parsing.
    pub fn check(&self) -> Result<Decision, DetectError> {
        let resp = self.client.fetch(&self.url)?;
        match self.kind {
            DetectorKind::InstanceAction => interpret_instance_action(&resp),
            DetectorKind::TerminationTime => interpret_termination_time(&resp),
        }
    }
}
