use std::fmt::{Display, Formatter};
use std::str::FromStr;

use common::err::decode_error::ReError;

use crate::gtid::interval::Interval;

/// Transaction intervals committed by a single server.
///
/// Intervals are kept sorted, disjoint and non adjacent after every change.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UuidSet {
    /// Gets server uuid of the UuidSet.
    uuid: String,

    /// Gets a list of intervals of the UuidSet.
    intervals: Vec<Interval>,
}

impl FromStr for UuidSet {
    type Err = ReError;

    /// `uuid:1-3:7:9-10`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (uuid, ranges) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| ReError::GtidSetParseErr(format!("invalid sid format: {}", s)))?;

        let intervals = ranges
            .split(':')
            .map(|token| UuidSet::parse_interval(token.trim(), s))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(UuidSet::new(uuid, intervals))
    }
}

impl UuidSet {
    pub fn new(uuid: &str, intervals: Vec<Interval>) -> UuidSet {
        let mut intervals = intervals;
        collapse_intervals(&mut intervals);

        UuidSet {
            uuid: uuid.trim().to_lowercase(),
            intervals,
        }
    }

    fn parse_interval(token: &str, full: &str) -> Result<Interval, ReError> {
        let range = token.split('-').collect::<Vec<&str>>();
        let (start, end) = match range.len() {
            1 => {
                let n = UuidSet::parse_interval_num(range[0], full)?;
                (n, n)
            }
            2 => (UuidSet::parse_interval_num(range[0], full)?, UuidSet::parse_interval_num(range[1], full)?),
            _ => return Err(ReError::GtidSetParseErr(format!("invalid interval format: {}", full))),
        };

        if start > end {
            return Err(ReError::GtidSetParseErr(
                format!("start({}) > end({}) in interval of {}", start, end, full)));
        }
        Ok(Interval::new(start, end))
    }

    fn parse_interval_num(to_parse: &str, full: &str) -> Result<u64, ReError> {
        to_parse.trim().parse().map_err(|e| {
            ReError::GtidSetParseErr(format!("invalid interval format: {}, error: {}", full, e))
        })
    }
}

impl UuidSet {
    pub fn get_uuid(&self) -> &str {
        &self.uuid
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn get_intervals_len(&self) -> usize {
        self.intervals.len()
    }

    /// Adds an interval and re-merges.
    pub fn add_interval(&mut self, interval: Interval) {
        self.intervals.push(interval);
        collapse_intervals(&mut self.intervals);
    }

    /// Adds a single transaction id. Returns false when it was already present.
    pub fn add_gtid(&mut self, transaction_id: u64) -> bool {
        if self.contains(transaction_id) {
            return false;
        }
        self.add_interval(Interval::single(transaction_id));
        true
    }

    pub fn contains(&self, transaction_id: u64) -> bool {
        self.intervals.iter().any(|i| i.contains(transaction_id))
    }

    /// Merged intervals are disjoint and non adjacent, so a covered interval always
    /// fits inside a single interval of `other`.
    pub fn is_contained_within(&self, other: &UuidSet) -> bool {
        if self.uuid != other.uuid {
            return false;
        }

        self.intervals
            .iter()
            .all(|i| other.intervals.iter().any(|o| o.covers(i)))
    }

    pub fn union(&mut self, other: &UuidSet) {
        self.intervals.extend_from_slice(&other.intervals);
        collapse_intervals(&mut self.intervals);
    }

    /// 事务总数
    pub fn count(&self) -> u64 {
        self.intervals
            .iter()
            .map(|i| (i.get_end() - i.get_start()).saturating_add(1))
            .fold(0u64, |total, n| total.saturating_add(n))
    }
}

impl Display for UuidSet {
    /// Returns string representation of an UuidSet part of a GtidSet.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let intervals = self
            .intervals
            .iter()
            .map(|x| x.to_string())
            .collect::<Vec<String>>()
            .join(":");

        write!(f, "{}:{}", self.uuid, intervals)
    }
}

/// 排序后把相交、相邻的区间合并: [1-3, 4-5, 2-2, 9] => [1-5, 9]
pub fn collapse_intervals(intervals: &mut Vec<Interval>) {
    if intervals.len() < 2 {
        return;
    }
    intervals.sort();

    let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
    for interval in intervals.drain(..) {
        match merged.last_mut() {
            Some(last) if last.touches(&interval) => {
                *last = Interval::new(last.get_start(), last.get_end().max(interval.get_end()));
            }
            _ => merged.push(interval),
        }
    }
    *intervals = merged;
}
