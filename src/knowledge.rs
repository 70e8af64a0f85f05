//! Where fuzzy sets and rules come from.
//!
//! The engine only needs two queries: the sets defined on a variable and the
//! full rule list. [`MemoryKnowledgeBase`] answers both from memory and can be
//! filled from a JSON document or from the built-in fire suppression bases.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};

use crate::error::{Error, Result};
use crate::rules::{Rule, Rules};
use crate::terms::Channel;
use crate::variable::{FuzzySet, FuzzySetRecord, InputVar};

/// Read-only source of fuzzy sets and rules.
///
/// Implementations must not change while an inference using them is running.
pub trait KnowledgeBase {
    /// Every fuzzy set defined on `variable`, empty if there are none
    fn fuzzy_sets(&self, variable: &str) -> Vec<&FuzzySet>;

    /// All rules in a stable order
    fn rules(&self) -> &Rules;
}

new_key_type! {
    /// A fuzzy set key
    pub struct FuzzySetKey;
}

#[derive(Clone, Debug, Default)]
pub struct MemoryKnowledgeBase {
    sets: SlotMap<FuzzySetKey, FuzzySet>,
    // Keeps insertion order per variable
    by_variable: HashMap<String, Vec<FuzzySetKey>>,
    rules: Rules,
}

/// On-disk layout of a knowledge base
///
/// Sets stay as raw records so validation errors keep their variant.
#[derive(Deserialize, Serialize)]
struct Document {
    #[serde(default)]
    fuzzy_sets: Vec<FuzzySetRecord>,
    #[serde(default)]
    rules: Vec<Rule>,
}

impl MemoryKnowledgeBase {
    pub fn new() -> Self {
        Self {
            sets: SlotMap::with_key(),
            by_variable: HashMap::new(),
            rules: Rules::new(),
        }
    }

    pub fn add_fuzzy_set(&mut self, set: FuzzySet) -> Result<FuzzySetKey> {
        let keys = self.by_variable.entry(set.variable().to_owned()).or_default();

        if keys.iter().any(|k| self.sets[*k].name() == set.name()) {
            return Err(Error::DuplicateFuzzySet {
                variable: set.variable().to_owned(),
                name: set.name().to_owned(),
            });
        }

        let key = self.sets.insert(set);
        keys.push(key);

        Ok(key)
    }

    pub fn add_rule(&mut self, rule: Rule) -> Result<()> {
        self.rules.add(rule)
    }

    pub fn get(&self, key: FuzzySetKey) -> Option<&FuzzySet> {
        self.sets.get(key)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let doc: Document = serde_json::from_str(json)?;
        let mut this = Self::new();

        for record in doc.fuzzy_sets {
            this.add_fuzzy_set(FuzzySet::try_from(record)?)?;
        }

        for rule in doc.rules {
            this.add_rule(rule)?;
        }

        Ok(this)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        let doc = Document {
            fuzzy_sets: self
                .by_variable_sorted()
                .flat_map(|(_, keys)| keys.iter().map(|k| self.sets[*k].clone().into()))
                .collect(),
            rules: self.rules.iter().cloned().collect(),
        };

        Ok(serde_json::to_string_pretty(&doc)?)
    }

    fn by_variable_sorted(&self) -> impl Iterator<Item = (&String, &Vec<FuzzySetKey>)> {
        let mut vars: Vec<_> = self.by_variable.iter().collect();

        vars.sort_by(|a, b| a.0.cmp(b.0));
        vars.into_iter()
    }

    /// Default fire suppression base whose third channel is evacuation
    pub fn fire_suppression() -> Self {
        build_fire_suppression(EVACUATION_RULES)
    }

    /// Same sets and premises, third channel driving ventilation
    pub fn fire_suppression_ventilation() -> Self {
        build_fire_suppression(VENTILATION_RULES)
    }
}

impl KnowledgeBase for MemoryKnowledgeBase {
    fn fuzzy_sets(&self, variable: &str) -> Vec<&FuzzySet> {
        self.by_variable
            .get(variable)
            .map(|keys| keys.iter().map(|k| &self.sets[*k]).collect())
            .unwrap_or_default()
    }

    fn rules(&self) -> &Rules {
        &self.rules
    }
}

type SetRow = (InputVar, &'static str, [f64; 4]);

#[rustfmt::skip]
const FIRE_SETS: &[SetRow] = &[
    (InputVar::Smoke, "none", [0., 0., 10., 20.]),
    (InputVar::Smoke, "low", [10., 20., 30., 40.]),
    (InputVar::Smoke, "medium", [30., 40., 60., 70.]),
    (InputVar::Smoke, "high", [60., 70., 100., 100.]),
    (InputVar::Temperature, "normal", [0., 0., 30., 40.]),
    (InputVar::Temperature, "warm", [30., 40., 60., 70.]),
    (InputVar::Temperature, "hot", [60., 70., 100., 120.]),
    (InputVar::Temperature, "critical", [100., 120., 200., 200.]),
    (InputVar::Zone, "safe", [0., 0., 1., 2.]),
    (InputVar::Zone, "risk", [1., 2., 3., 4.]),
    (InputVar::Zone, "danger", [3., 4., 5., 5.]),
];

type Term = Option<&'static str>;
/// smoke, temperature, zone => sprinkler, alarm, auxiliary, priority
type RuleRow = (Term, Term, Term, Term, Term, Term, i32);

#[rustfmt::skip]
const EVACUATION_RULES: &[RuleRow] = &[
    (Some("high"), None, None, Some("high"), Some("on"), Some("immediate"), 10),
    (None, Some("critical"), None, Some("high"), Some("on"), Some("immediate"), 10),
    (Some("medium"), Some("hot"), None, Some("medium"), Some("on"), Some("prepare"), 9),
    (Some("medium"), None, Some("danger"), Some("medium"), Some("on"), Some("prepare"), 9),
    (Some("low"), Some("warm"), Some("risk"), Some("low"), Some("on"), Some("none"), 8),
    (Some("low"), None, Some("risk"), Some("low"), Some("warning"), Some("none"), 7),
    (None, Some("warm"), Some("risk"), Some("low"), Some("warning"), Some("none"), 7),
    (None, Some("hot"), Some("danger"), Some("medium"), Some("on"), Some("prepare"), 8),
    (None, Some("hot"), Some("risk"), Some("low"), Some("on"), Some("none"), 7),
    (None, Some("hot"), None, Some("low"), Some("warning"), Some("none"), 6),
    (Some("none"), Some("normal"), Some("safe"), Some("off"), Some("off"), Some("none"), 5),
    (Some("none"), None, Some("safe"), Some("off"), Some("off"), Some("none"), 4),
    (Some("none"), Some("warm"), None, Some("off"), Some("warning"), Some("none"), 5),
];

#[rustfmt::skip]
const VENTILATION_RULES: &[RuleRow] = &[
    (Some("high"), None, None, Some("high"), Some("on"), Some("high"), 10),
    (None, Some("critical"), None, Some("high"), Some("on"), Some("high"), 10),
    (Some("medium"), Some("hot"), None, Some("medium"), Some("on"), Some("medium"), 9),
    (Some("medium"), None, Some("danger"), Some("medium"), Some("on"), Some("medium"), 9),
    (Some("low"), Some("warm"), Some("risk"), Some("low"), Some("on"), Some("low"), 8),
    (Some("low"), None, Some("risk"), Some("low"), Some("warning"), Some("low"), 7),
    (None, Some("warm"), Some("risk"), Some("low"), Some("warning"), Some("low"), 7),
    (None, Some("hot"), Some("danger"), Some("medium"), Some("on"), Some("medium"), 8),
    (None, Some("hot"), Some("risk"), Some("low"), Some("on"), Some("low"), 7),
    (None, Some("hot"), None, Some("low"), Some("warning"), Some("low"), 6),
    (Some("none"), Some("normal"), Some("safe"), Some("off"), Some("off"), Some("off"), 5),
    (Some("none"), None, Some("safe"), Some("off"), Some("off"), Some("off"), 4),
    (Some("none"), Some("warm"), None, Some("off"), Some("warning"), Some("off"), 5),
];

fn build_fire_suppression(rows: &[RuleRow]) -> MemoryKnowledgeBase {
    let mut kb = MemoryKnowledgeBase::new();

    for (var, name, [a, b, c, d]) in FIRE_SETS {
        let set = FuzzySet::new(var.name(), *name, *a, *b, *c, *d);
        // Static tables are ordered and unique; a failure here is a typo in this file
        kb.add_fuzzy_set(set.expect("built-in fuzzy set is well formed"))
            .expect("built-in fuzzy set is unique");
    }

    for (i, (smoke, temp, zone, sprinkler, alarm, aux, priority)) in rows.iter().enumerate() {
        let mut rule = Rule::new(i as u32 + 1, *priority);

        for (var, term) in [(InputVar::Smoke, smoke), (InputVar::Temperature, temp), (InputVar::Zone, zone)] {
            if let Some(term) = term {
                rule = rule.when(var.is(*term));
            }
        }

        for (channel, term) in [(Channel::Sprinkler, sprinkler), (Channel::Alarm, alarm), (Channel::Auxiliary, aux)] {
            if let Some(term) = term {
                rule = rule.then(channel.to(*term));
            }
        }

        kb.add_rule(rule).expect("built-in rule ids are sequential");
    }

    kb
}

#[test]
fn test_fire_suppression_contents() {
    let kb = MemoryKnowledgeBase::fire_suppression();

    assert_eq!(kb.fuzzy_sets("smoke").len(), 4);
    assert_eq!(kb.fuzzy_sets("temperature").len(), 4);
    assert_eq!(kb.fuzzy_sets("zone").len(), 3);
    assert!(kb.fuzzy_sets("humidity").is_empty());
    assert_eq!(kb.rules().len(), 13);

    let names: Vec<_> = kb.fuzzy_sets("zone").iter().map(|s| s.name()).collect();
    assert_eq!(names, ["safe", "risk", "danger"]);

    let first = kb.rules().iter().next().unwrap();
    assert_eq!(first.condition(InputVar::Smoke), Some("high"));
    assert_eq!(first.conclusion(Channel::Auxiliary), Some("immediate"));

    let vent = MemoryKnowledgeBase::fire_suppression_ventilation();
    assert_eq!(vent.rules().iter().next().unwrap().conclusion(Channel::Auxiliary), Some("high"));
}

#[test]
fn test_duplicate_fuzzy_set() {
    let mut kb = MemoryKnowledgeBase::new();

    kb.add_fuzzy_set(FuzzySet::new("smoke", "low", 0., 1., 2., 3.).unwrap()).unwrap();
    let err = kb.add_fuzzy_set(FuzzySet::new("smoke", "low", 5., 6., 7., 8.).unwrap());

    assert!(matches!(err, Err(Error::DuplicateFuzzySet { .. })));
    // Same name on another variable is fine
    let key = kb.add_fuzzy_set(FuzzySet::new("zone", "low", 0., 1., 2., 3.).unwrap()).unwrap();
    assert_eq!(kb.get(key).unwrap().variable(), "zone");
}

#[test]
fn test_load_from_json() {
    let kb = MemoryKnowledgeBase::from_json_str(
        r#"{
            "fuzzy_sets": [
                {"variable": "smoke", "name": "high", "a": 60, "b": 70, "c": 100, "d": 100}
            ],
            "rules": [
                {"id": 1, "smoke": "high", "sprinkler": "high", "ventilation": "high", "priority": 10},
                {"id": 2, "zone": "safe", "alarm": "off"}
            ]
        }"#,
    )
    .unwrap();

    assert_eq!(kb.fuzzy_sets("smoke").len(), 1);
    assert_eq!(kb.rules().len(), 2);
    assert_eq!(kb.rules().iter().nth(1).unwrap().priority(), 0);
}

#[test]
fn test_load_rejects_bad_documents() {
    let malformed = r#"{"fuzzy_sets": [{"variable": "smoke", "name": "low", "a": 40, "b": 20, "c": 30, "d": 10}]}"#;
    match MemoryKnowledgeBase::from_json_str(malformed) {
        Err(Error::MalformedFuzzySet { variable, name, points }) => {
            assert_eq!((variable.as_str(), name.as_str()), ("smoke", "low"));
            assert_eq!(points, [40., 20., 30., 10.]);
        },
        other => panic!("expected MalformedFuzzySet, got {other:?}"),
    }

    let twice = r#"{"fuzzy_sets": [
        {"variable": "zone", "name": "safe", "a": 0, "b": 0, "c": 1, "d": 2},
        {"variable": "zone", "name": "safe", "a": 0, "b": 1, "c": 2, "d": 3}
    ]}"#;
    assert!(matches!(
        MemoryKnowledgeBase::from_json_str(twice),
        Err(Error::DuplicateFuzzySet { .. })
    ));

    let duplicate = r#"{"rules": [{"id": 7}, {"id": 7}]}"#;
    assert!(matches!(MemoryKnowledgeBase::from_json_str(duplicate), Err(Error::DuplicateRule(7))));

    assert!(matches!(MemoryKnowledgeBase::from_json_str("{"), Err(Error::Json(_))));
}

#[test]
fn test_json_export_reloads() {
    let kb = MemoryKnowledgeBase::fire_suppression();
    let reloaded = MemoryKnowledgeBase::from_json_str(&kb.to_json_string().unwrap()).unwrap();

    assert_eq!(reloaded.rules(), kb.rules());
    for var in InputVar::ALL {
        assert_eq!(reloaded.fuzzy_sets(var.name()), kb.fuzzy_sets(var.name()));
    }
}

#[test]
fn test_load_from_path() {
    let path = std::env::temp_dir().join(format!("fuzzy-suppression-kb-{}.json", std::process::id()));
    let kb = MemoryKnowledgeBase::fire_suppression_ventilation();

    fs::write(&path, kb.to_json_string().unwrap()).unwrap();
    let reloaded = MemoryKnowledgeBase::from_path(&path);
    fs::remove_file(&path).unwrap();

    assert_eq!(reloaded.unwrap().rules(), kb.rules());

    let missing = std::env::temp_dir().join("fuzzy-suppression-no-such-kb.json");
    assert!(matches!(MemoryKnowledgeBase::from_path(missing), Err(Error::Io(_))));
}
