//! Processing workflows recorded in a result file.
//!
//! Every processing run leaves a row in `Workflows` and a log in
//! `WorkflowMessages`. Both tables are optional; a file without them has no
//! workflows.

use chrono::{DateTime, NaiveDateTime};
use serde::Serialize;

/// .NET ticks (100 ns since 0001-01-01) at the Unix epoch.
const DOTNET_UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;
const TICKS_PER_SECOND: i64 = 10_000_000;

/// One processing run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Workflow {
    pub id: i64,
    pub guid: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub workflow_type: Option<String>,
    pub level: Option<i64>,
    pub version: Option<i64>,
    pub start_date: Option<NaiveDateTime>,
    pub state: Option<i64>,
    pub study: Option<String>,
    pub user: Option<String>,
    pub software: Option<String>,
    pub machine: Option<String>,
    /// Workflow definition as stored, processing nodes included.
    #[serde(skip)]
    pub xml: Option<String>,
    /// Log of the run, in table order.
    pub messages: Vec<WorkflowMessage>,
}

/// A log message written while a workflow ran.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkflowMessage {
    pub id: i64,
    pub workflow_id: i64,
    pub level: Option<i64>,
    pub node_name: Option<String>,
    /// UTC time, to the second.
    pub time: Option<NaiveDateTime>,
    pub kind: Option<i64>,
    pub message: Option<String>,
}

/// Parse a stored start date such as `2021-03-04 10:11:12.1234567+01:00`.
///
/// Only the date and time of day are kept; fractions and offsets are cut.
pub(crate) fn parse_start_date(text: &str) -> Option<NaiveDateTime> {
    let head = text.get(..19)?;
    NaiveDateTime::parse_from_str(head, "%Y-%m-%d %H:%M:%S").ok()
}

/// Convert .NET ticks to a UTC time, truncated to whole seconds.
pub(crate) fn from_dotnet_ticks(ticks: i64) -> Option<NaiveDateTime> {
    let seconds = ticks
        .checked_sub(DOTNET_UNIX_EPOCH_TICKS)?
        .div_euclid(TICKS_PER_SECOND);
    DateTime::from_timestamp(seconds, 0).map(|t| t.naive_utc())
}
