use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use common::err::CResult;
use common::err::decode_error::ReError;

use crate::gtid::interval::Interval;
use crate::gtid::uuid_set::UuidSet;

/// Set of committed transactions per server uuid, e.g.
/// `726757ad-4455-11e8-ae04-0242ac110002:1-3:7-9,726757ad-4455-11e8-ae04-0242ac110003:4`.
///
/// Two sets built from different but equivalent inputs compare equal and render the
/// same string, since every uuid keeps its intervals merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct GtidSet {
    uuid_sets: BTreeMap<String, UuidSet>,
}

impl Display for GtidSet {
    /// Returns string representation of the GtidSet.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let uuids = self
            .uuid_sets
            .values()
            .map(|x| x.to_string())
            .collect::<Vec<String>>();

        write!(f, "{}", uuids.join(","))
    }
}

impl FromStr for GtidSet {
    type Err = ReError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GtidSet::parse(s)
    }
}

impl GtidSet {
    pub fn new() -> Self {
        Self {
            uuid_sets: BTreeMap::new(),
        }
    }

    /// 解析如下格式的字符串为 GtidSet, 空字符串为空集合:
    ///
    /// 726757ad-4455-11e8-ae04-0242ac110002:1-3:4 => {726757ad-...: [1-4]}
    ///
    /// 726757ad-4455-11e8-ae04-0242ac110002:1-3,726757ad-4455-11e8-ae04-0242ac110003:4 =>
    /// {726757ad-...02: [1-3], 726757ad-...03: [4]}
    pub fn parse(gtid_data: &str) -> CResult<GtidSet> {
        // 存在多个GTID时会有回车符
        let gtid_data = gtid_data.replace('\n', "");

        let mut gtid_set = GtidSet::new();
        for uuid_set in gtid_data.split(',').map(|x| x.trim()).filter(|x| !x.is_empty()) {
            let uuid_set = UuidSet::from_str(uuid_set)?;
            gtid_set.add_uuid_set(&uuid_set);
        }

        Ok(gtid_set)
    }

    /// `None` and blank strings both mean "no gtid".
    pub fn parse_optional(gtid_data: Option<&str>) -> CResult<Option<GtidSet>> {
        match gtid_data {
            Some(s) if !s.trim().is_empty() => Ok(Some(GtidSet::parse(s)?)),
            _ => Ok(None),
        }
    }
}

impl GtidSet {
    /// 获取uuid set 的map
    pub fn uuid_sets(&self) -> &BTreeMap<String, UuidSet> {
        &self.uuid_sets
    }

    pub fn is_empty(&self) -> bool {
        self.uuid_sets.is_empty()
    }

    pub fn contains_key(&self, uuid: &str) -> bool {
        self.uuid_sets.contains_key(&uuid.to_lowercase())
    }

    pub fn get(&self, uuid: &str) -> Option<&UuidSet> {
        self.uuid_sets.get(&uuid.to_lowercase())
    }

    /// Adds a gtid value to the GtidSet. Returns false when it was already present.
    pub fn add_gtid(&mut self, uuid: &str, transaction_id: u64) -> bool {
        self.entry(uuid).add_gtid(transaction_id)
    }

    pub fn add_interval(&mut self, uuid: &str, interval: Interval) {
        self.entry(uuid).add_interval(interval);
    }

    fn add_uuid_set(&mut self, uuid_set: &UuidSet) {
        match self.uuid_sets.get_mut(uuid_set.get_uuid()) {
            Some(existing) => existing.union(uuid_set),
            None => {
                self.uuid_sets.insert(uuid_set.get_uuid().to_string(), uuid_set.clone());
            }
        }
    }

    fn entry(&mut self, uuid: &str) -> &mut UuidSet {
        let key = uuid.trim().to_lowercase();
        self.uuid_sets
            .entry(key.clone())
            .or_insert_with(|| UuidSet::new(&key, Vec::new()))
    }

    /// Merges the transactions of `other` into this set.
    pub fn union(&mut self, other: &GtidSet) {
        for uuid_set in other.uuid_sets.values() {
            self.add_uuid_set(uuid_set);
        }
    }

    pub fn contains_gtid(&self, uuid: &str, transaction_id: u64) -> bool {
        self.get(uuid).map(|us| us.contains(transaction_id)).unwrap_or(false)
    }

    /// True when every transaction of this set is also in `other`. The empty set is
    /// contained within every set.
    pub fn is_contained_within(&self, other: &GtidSet) -> bool {
        self.uuid_sets.iter().all(|(uuid, uuid_set)| {
            match other.uuid_sets.get(uuid) {
                Some(o) => uuid_set.is_contained_within(o),
                None => false,
            }
        })
    }

    /// 事务总数
    pub fn count(&self) -> u64 {
        self.uuid_sets.values().fold(0u64, |total, us| total.saturating_add(us.count()))
    }
}

impl Serialize for GtidSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for GtidSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        GtidSet::parse(&s).map_err(serde::de::Error::custom)
    }
}
