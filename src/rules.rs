use std::collections::HashSet;

use fixed_map::Map as FixedMap;
use serde::{Deserialize, Serialize};

use crate::dsl::{Conclusion, Condition};
use crate::error::{Error, Result};
use crate::terms::Channel;
use crate::variable::InputVar;

/// A conjunctive rule: every present condition must hold, and each present
/// conclusion is activated at the rule's truth level.
///
/// Missing clauses mean "don't care". `priority` only orders diagnostics; all
/// matching rules fire regardless of it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "RuleRecord", into = "RuleRecord")]
pub struct Rule {
    id: u32,
    priority: i32,
    conditions: FixedMap<InputVar, String>,
    conclusions: FixedMap<Channel, String>,
}

impl Rule {
    pub fn new(id: u32, priority: i32) -> Self {
        Self {
            id,
            priority,
            conditions: FixedMap::new(),
            conclusions: FixedMap::new(),
        }
    }

    /// Adds a premise clause, replacing any earlier one on the same variable
    pub fn when(mut self, condition: Condition) -> Self {
        self.conditions.insert(condition.var, condition.term);
        self
    }

    /// Adds a consequence clause, replacing any earlier one on the same channel
    pub fn then(mut self, conclusion: Conclusion) -> Self {
        self.conclusions.insert(conclusion.channel, conclusion.term);
        self
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn condition(&self, var: InputVar) -> Option<&str> {
        self.conditions.get(var).map(String::as_str)
    }

    pub fn conclusion(&self, channel: Channel) -> Option<&str> {
        self.conclusions.get(channel).map(String::as_str)
    }

    pub fn conditions(&self) -> impl Iterator<Item = (InputVar, &str)> {
        self.conditions.iter().map(|(var, term)| (var, term.as_str()))
    }

    pub fn conclusions(&self) -> impl Iterator<Item = (Channel, &str)> {
        self.conclusions.iter().map(|(channel, term)| (channel, term.as_str()))
    }
}

/// Flat, storage-friendly shape of a rule
#[derive(Deserialize, Serialize)]
struct RuleRecord {
    id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    smoke: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    temperature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sprinkler: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    alarm: Option<String>,
    #[serde(default, alias = "ventilation", alias = "evacuation", skip_serializing_if = "Option::is_none")]
    auxiliary: Option<String>,
    #[serde(default)]
    priority: i32,
}

impl From<RuleRecord> for Rule {
    fn from(r: RuleRecord) -> Self {
        let mut rule = Rule::new(r.id, r.priority);
        let conditions = [
            (InputVar::Smoke, r.smoke),
            (InputVar::Temperature, r.temperature),
            (InputVar::Zone, r.zone),
        ];
        let conclusions = [
            (Channel::Sprinkler, r.sprinkler),
            (Channel::Alarm, r.alarm),
            (Channel::Auxiliary, r.auxiliary),
        ];

        // Empty strings are treated like NULL columns
        for (var, term) in conditions {
            if let Some(term) = term.filter(|t| !t.is_empty()) {
                rule.conditions.insert(var, term);
            }
        }

        for (channel, term) in conclusions {
            if let Some(term) = term.filter(|t| !t.is_empty()) {
                rule.conclusions.insert(channel, term);
            }
        }

        rule
    }
}

impl From<Rule> for RuleRecord {
    fn from(rule: Rule) -> Self {
        let cond = |var| rule.condition(var).map(str::to_owned);
        let concl = |channel| rule.conclusion(channel).map(str::to_owned);

        RuleRecord {
            id: rule.id,
            smoke: cond(InputVar::Smoke),
            temperature: cond(InputVar::Temperature),
            zone: cond(InputVar::Zone),
            sprinkler: concl(Channel::Sprinkler),
            alarm: concl(Channel::Alarm),
            auxiliary: concl(Channel::Auxiliary),
            priority: rule.priority,
        }
    }
}

/// Ordered rule base with unique ids
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Rules {
    rules: Vec<Rule>,
    ids: HashSet<u32>,
}

impl Rules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Rules {
            rules: Vec::with_capacity(capacity),
            ids: HashSet::with_capacity(capacity),
        }
    }

    pub fn add(&mut self, rule: Rule) -> Result<()> {
        if !self.ids.insert(rule.id) {
            return Err(Error::DuplicateRule(rule.id));
        }

        self.rules.push(rule);

        Ok(())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules ordered by descending priority, insertion order among equals
    pub fn by_priority(&self) -> Vec<&Rule> {
        let mut sorted: Vec<_> = self.rules.iter().collect();

        sorted.sort_by(|a, b| b.priority.cmp(&a.priority));
        sorted
    }
}

impl<'r> IntoIterator for &'r Rules {
    type Item = &'r Rule;
    type IntoIter = std::slice::Iter<'r, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[test]
fn test_rule_builder() {
    let rule = Rule::new(3, 9)
        .when(InputVar::Smoke.is("medium"))
        .when(InputVar::Temperature.is("hot"))
        .then(Channel::Sprinkler.to("medium"))
        .then(Channel::Alarm.to("on"));

    assert_eq!(rule.id(), 3);
    assert_eq!(rule.priority(), 9);
    assert_eq!(rule.condition(InputVar::Smoke), Some("medium"));
    assert_eq!(rule.condition(InputVar::Zone), None);
    assert_eq!(rule.conclusion(Channel::Auxiliary), None);
    assert_eq!(rule.conditions().count(), 2);
    assert_eq!(rule.conclusions().count(), 2);

    let replaced = rule.when(InputVar::Smoke.is("high"));
    assert_eq!(replaced.condition(InputVar::Smoke), Some("high"));
    assert_eq!(replaced.conditions().count(), 2);
}

#[test]
fn test_duplicate_rule_ids() {
    let mut rules = Rules::new();

    rules.add(Rule::new(1, 5)).unwrap();
    assert!(matches!(rules.add(Rule::new(1, 7)), Err(Error::DuplicateRule(1))));
    assert_eq!(rules.len(), 1);
}

#[test]
fn test_by_priority_is_stable() {
    let mut rules = Rules::with_capacity(4);

    rules.add(Rule::new(1, 5)).unwrap();
    rules.add(Rule::new(2, 10)).unwrap();
    rules.add(Rule::new(3, 5)).unwrap();
    rules.add(Rule::new(4, 10)).unwrap();

    let ids: Vec<_> = rules.by_priority().iter().map(|r| r.id()).collect();
    assert_eq!(ids, [2, 4, 1, 3]);
    // Storage order is untouched
    let ids: Vec<_> = rules.iter().map(Rule::id).collect();
    assert_eq!(ids, [1, 2, 3, 4]);
}

#[test]
fn test_rule_from_record() {
    let rule: Rule = serde_json::from_str(
        r#"{"id": 4, "smoke": "medium", "zone": "danger", "temperature": null,
            "sprinkler": "medium", "alarm": "on", "evacuation": "prepare", "priority": 9}"#,
    )
    .unwrap();

    assert_eq!(rule.condition(InputVar::Smoke), Some("medium"));
    assert_eq!(rule.condition(InputVar::Temperature), None);
    assert_eq!(rule.condition(InputVar::Zone), Some("danger"));
    assert_eq!(rule.conclusion(Channel::Auxiliary), Some("prepare"));

    let json = serde_json::to_value(&rule).unwrap();
    assert_eq!(json["auxiliary"], "prepare");
    assert!(json.get("temperature").is_none());
}
