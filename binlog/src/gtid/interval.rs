use std::fmt;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Closed interval `[start, end]` of transaction ids.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Interval {
    /// Gets first transaction id in the interval.
    start: u64,
    /// Gets last transaction id in the interval.
    end: u64,
}

impl Display for Interval {
    /// Returns string representation of an UuidSet interval.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

impl Interval {
    pub fn new(start: u64, end: u64) -> Interval {
        Interval {
            start,
            end
        }
    }

    pub fn single(transaction_id: u64) -> Interval {
        Interval::new(transaction_id, transaction_id)
    }

    pub fn get_start(&self) -> u64 {
        self.start
    }

    pub fn get_end(&self) -> u64 {
        self.end
    }

    pub fn contains(&self, transaction_id: u64) -> bool {
        self.start <= transaction_id && transaction_id <= self.end
    }

    /// `other` 是否完全落在当前区间内
    pub fn covers(&self, other: &Interval) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// 相交或相邻的区间可以合并为一个
    pub fn touches(&self, other: &Interval) -> bool {
        other.start <= self.end.saturating_add(1) && self.start <= other.end.saturating_add(1)
    }
}
