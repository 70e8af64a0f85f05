use std::collections::BTreeMap;

use fixed_map::Key;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Output channels driven by the engine.
///
/// The auxiliary channel is ventilation or evacuation depending on which
/// [`ChannelConfig`](crate::config::ChannelConfig) the engine was built with.
/// Human-readable channel names come from that configuration, not from here.
#[derive(Clone, Copy, Debug, Eq, Hash, Key, Ord, PartialEq, PartialOrd)]
pub enum Channel {
    Sprinkler,
    Alarm,
    Auxiliary,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Sprinkler, Channel::Alarm, Channel::Auxiliary];
}

/// Output term -> activation degree, merged across rules by maximum
pub type TermActivations = BTreeMap<String, f64>;

/// Fixed crisp value for every term an output channel recognizes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CrispTable(BTreeMap<String, f64>);

impl CrispTable {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with(mut self, term: impl Into<String>, value: f64) -> Self {
        self.insert(term, value);
        self
    }

    pub fn insert(&mut self, term: impl Into<String>, value: f64) {
        self.0.insert(term.into(), value);
    }

    pub fn get(&self, term: &str) -> Option<f64> {
        self.0.get(term).copied()
    }

    pub fn contains(&self, term: &str) -> bool {
        self.0.contains_key(term)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Smallest and largest crisp values, `None` for an empty table
    pub fn bounds(&self) -> Option<(f64, f64)> {
        self.0.values().copied().fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
        })
    }

    pub(crate) fn validate(&self, channel: &str) -> Result<()> {
        if self.0.is_empty() {
            return Err(Error::EmptyCrispTable(channel.to_owned()));
        }

        for (term, value) in &self.0 {
            if !value.is_finite() || !(0. ..=1.).contains(value) {
                return Err(Error::CrispOutOfRange {
                    channel: channel.to_owned(),
                    term: term.clone(),
                    value: *value,
                });
            }
        }

        Ok(())
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for CrispTable {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Thresholds that bucket a crisp output into a display label.
///
/// Purely presentational; nothing derived from a label feeds back into the
/// numeric result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusBands {
    /// `(upper_bound, label)` pairs, bounds strictly ascending
    below: Vec<(f64, String)>,
    top: String,
}

impl StatusBands {
    pub fn new(top: impl Into<String>) -> Self {
        Self {
            below: Vec::new(),
            top: top.into(),
        }
    }

    /// Adds a label for values strictly below `bound`
    pub fn below(mut self, bound: f64, label: impl Into<String>) -> Self {
        self.below.push((bound, label.into()));
        self
    }

    pub fn label(&self, value: f64) -> &str {
        self.below
            .iter()
            .find(|(bound, _)| value < *bound)
            .map_or(self.top.as_str(), |(_, label)| label.as_str())
    }

    pub(crate) fn validate(&self, channel: &str) -> Result<()> {
        let ascending = self.below.windows(2).all(|w| w[0].0 < w[1].0);
        let finite = self.below.iter().all(|(bound, _)| bound.is_finite());

        if !ascending || !finite {
            return Err(Error::UnorderedThresholds(channel.to_owned()));
        }

        Ok(())
    }
}

#[test]
fn test_crisp_table_bounds() {
    let table: CrispTable = [("off", 0.), ("warning", 0.5), ("on", 1.)].into_iter().collect();

    assert_eq!(table.len(), 3);
    assert_eq!(table.get("warning"), Some(0.5));
    assert_eq!(table.get("deluge"), None);
    assert_eq!(table.bounds(), Some((0., 1.)));
    assert_eq!(CrispTable::new().bounds(), None);
}

#[test]
fn test_crisp_table_validation() {
    let table = CrispTable::new().with("off", 0.).with("overdrive", 1.5);

    assert!(matches!(table.validate("sprinkler"), Err(Error::CrispOutOfRange { .. })));
    assert!(matches!(CrispTable::new().validate("alarm"), Err(Error::EmptyCrispTable(_))));
    assert!(CrispTable::new().with("off", 0.).validate("alarm").is_ok());
}

#[test]
fn test_status_bands() {
    let bands = StatusBands::new("on").below(0.25, "off").below(0.75, "warning");

    assert_eq!(bands.label(0.), "off");
    assert_eq!(bands.label(0.2499), "off");
    assert_eq!(bands.label(0.25), "warning");
    assert_eq!(bands.label(0.74), "warning");
    assert_eq!(bands.label(0.75), "on");
    assert_eq!(bands.label(1.), "on");
    assert!(bands.validate("alarm").is_ok());

    let unordered = StatusBands::new("on").below(0.75, "warning").below(0.25, "off");
    assert!(matches!(unordered.validate("alarm"), Err(Error::UnorderedThresholds(_))));
}
