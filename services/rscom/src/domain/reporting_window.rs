/// Reporting-window repair rules
///
/// A post's reporting window trails its campaign window by a fixed six weeks.
/// The repair job finds posts whose window was never written (or was written
/// with a year-0001 placeholder) and recomputes it from the campaign.
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::collaboration::PostCampaign;
use super::post::Post;

/// Weeks between a campaign date and the matching reporting date
pub const REPORTING_OFFSET_WEEKS: i64 = 6;

/// Offset added to campaign dates to obtain reporting dates
pub fn reporting_offset() -> TimeDelta {
    TimeDelta::weeks(REPORTING_OFFSET_WEEKS)
}

/// Shift a campaign date forward to its reporting date
pub fn shift_forward(date: NaiveDateTime) -> NaiveDateTime {
    date + reporting_offset()
}

/// Error returned when a filter or strategy name is not recognised
#[derive(Debug, Error, Clone, PartialEq)]
#[error("unknown {kind}: {value}")]
pub struct ParseRepairOptionError {
    kind: &'static str,
    value: String,
}

/// Which posts a repair run selects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepairFilter {
    /// Live posts created since the current reporting period whose
    /// reporting window was never written
    #[serde(rename = "null-window")]
    NullReportingWindow,
    /// Posts whose reporting end was written as year 0001
    #[serde(rename = "year-0001")]
    EndYear0001,
}

impl RepairFilter {
    /// Channels that have no reporting window at all
    pub const EXCLUDED_CHANNELS: [&'static str; 3] = ["LTK", "BLOG", "NO_CHANNEL"];

    /// Year written by the faulty collaboration-service release
    pub const PLACEHOLDER_YEAR: i32 = 1;

    /// Start of the reporting period the null-window repair covers
    pub fn created_since() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 9, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default()
    }

    /// In-memory form of the SQL predicate
    pub fn matches(&self, post: &Post) -> bool {
        match self {
            RepairFilter::NullReportingWindow => {
                !post.status.is_deleted()
                    && post.reporting_end_time.is_none()
                    && !Self::EXCLUDED_CHANNELS.contains(&post.channel.as_str())
                    && post.created_at >= Self::created_since()
            }
            RepairFilter::EndYear0001 => post
                .reporting_end_time
                .is_some_and(|end| end.year() == Self::PLACEHOLDER_YEAR),
        }
    }

    /// Whether the repair rewrites `reporting_start_time` as well as the end
    pub fn updates_start(&self) -> bool {
        matches!(self, RepairFilter::NullReportingWindow)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RepairFilter::NullReportingWindow => "null-window",
            RepairFilter::EndYear0001 => "year-0001",
        }
    }
}

impl fmt::Display for RepairFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RepairFilter {
    type Err = ParseRepairOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "null-window" => Ok(RepairFilter::NullReportingWindow),
            "year-0001" => Ok(RepairFilter::EndYear0001),
            other => Err(ParseRepairOptionError {
                kind: "repair filter",
                value: other.to_string(),
            }),
        }
    }
}

/// How corrected windows are written back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WriteStrategy {
    /// One UPDATE statement per post
    Individual,
    /// A single UPDATE covering every post
    Bulk,
}

impl WriteStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteStrategy::Individual => "individual",
            WriteStrategy::Bulk => "bulk",
        }
    }
}

impl fmt::Display for WriteStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WriteStrategy {
    type Err = ParseRepairOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "individual" => Ok(WriteStrategy::Individual),
            "bulk" => Ok(WriteStrategy::Bulk),
            other => Err(ParseRepairOptionError {
                kind: "write strategy",
                value: other.to_string(),
            }),
        }
    }
}

/// Corrected reporting window for one post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportingWindowUpdate {
    pub post_id: String,
    /// `None` leaves the stored start untouched
    pub reporting_start_time: Option<NaiveDateTime>,
    pub reporting_end_time: NaiveDateTime,
}

/// Compute the corrected window for every post that has a campaign
///
/// When a post joins more than one campaign the last row wins. The result is
/// ordered by post ID.
pub fn plan_updates(filter: RepairFilter, rows: &[PostCampaign]) -> Vec<ReportingWindowUpdate> {
    let mut by_post: BTreeMap<&str, ReportingWindowUpdate> = BTreeMap::new();

    for row in rows {
        let reporting_start_time = filter
            .updates_start()
            .then(|| shift_forward(row.campaign.start_date));

        by_post.insert(
            row.post_id.as_str(),
            ReportingWindowUpdate {
                post_id: row.post_id.clone(),
                reporting_start_time,
                reporting_end_time: shift_forward(row.campaign.end_date),
            },
        );
    }

    by_post.into_values().collect()
}

/// IDs present in exactly one of the two lists, sorted
pub fn unmatched_post_ids(post_ids: &[String], obligation_post_ids: &[String]) -> Vec<String> {
    let posts: BTreeSet<&String> = post_ids.iter().collect();
    let obligations: BTreeSet<&String> = obligation_post_ids.iter().collect();

    posts
        .symmetric_difference(&obligations)
        .map(|id| (*id).clone())
        .collect()
}
