use std::collections::BTreeMap;
use std::fmt;

use fixed_map::Key;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::math::trapezoid;

/// One of the three crisp sensor readings the engine consumes.
#[derive(Clone, Copy, Debug, Eq, Hash, Key, Ord, PartialEq, PartialOrd)]
pub enum InputVar {
    Smoke,
    Temperature,
    Zone,
}

impl InputVar {
    pub const ALL: [InputVar; 3] = [InputVar::Smoke, InputVar::Temperature, InputVar::Zone];

    /// Name used to look the variable up in a knowledge base
    pub fn name(self) -> &'static str {
        match self {
            Self::Smoke => "smoke",
            Self::Temperature => "temperature",
            Self::Zone => "zone",
        }
    }
}

impl fmt::Display for InputVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named trapezoidal fuzzy set on a variable.
///
/// Breakpoints are checked once when the set is built, so evaluation never has
/// to re-validate them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FuzzySetRecord", into = "FuzzySetRecord")]
pub struct FuzzySet {
    variable: String,
    name: String,
    points: [f64; 4],
}

impl FuzzySet {
    pub fn new(variable: impl Into<String>, name: impl Into<String>, a: f64, b: f64, c: f64, d: f64) -> Result<Self> {
        let variable = variable.into();
        let name = name.into();

        if [a, b, c, d].iter().any(|p| !p.is_finite()) {
            return Err(Error::NonFiniteBreakpoint { variable, name });
        }

        if !(a <= b && b <= c && c <= d) {
            return Err(Error::MalformedFuzzySet {
                variable,
                name,
                points: [a, b, c, d],
            });
        }

        Ok(Self {
            variable,
            name,
            points: [a, b, c, d],
        })
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn points(&self) -> [f64; 4] {
        self.points
    }

    pub fn membership(&self, x: f64) -> f64 {
        let [a, b, c, d] = self.points;

        trapezoid(x, a, b, c, d)
    }
}

/// Unchecked serialized form of a [`FuzzySet`]
#[derive(Deserialize, Serialize)]
pub(crate) struct FuzzySetRecord {
    variable: String,
    name: String,
    a: f64,
    b: f64,
    c: f64,
    d: f64,
}

impl TryFrom<FuzzySetRecord> for FuzzySet {
    type Error = Error;

    fn try_from(r: FuzzySetRecord) -> Result<Self> {
        FuzzySet::new(r.variable, r.name, r.a, r.b, r.c, r.d)
    }
}

impl From<FuzzySet> for FuzzySetRecord {
    fn from(set: FuzzySet) -> Self {
        let [a, b, c, d] = set.points;

        Self {
            variable: set.variable,
            name: set.name,
            a,
            b,
            c,
            d,
        }
    }
}

/// Set name -> strictly positive membership degree
pub type Fuzzified = BTreeMap<String, f64>;

/// Evaluates `value` against every set and keeps only the ones it belongs to.
pub fn fuzzify<'s>(value: f64, sets: impl IntoIterator<Item = &'s FuzzySet>) -> Fuzzified {
    sets.into_iter()
        .filter_map(|set| {
            let degree = set.membership(value);

            if degree > 0. {
                Some((set.name.clone(), degree))
            } else {
                None
            }
        })
        .collect()
}

#[test]
fn test_rejects_malformed_sets() {
    assert!(matches!(
        FuzzySet::new("smoke", "low", 20., 10., 30., 40.),
        Err(Error::MalformedFuzzySet { .. })
    ));
    assert!(matches!(
        FuzzySet::new("smoke", "low", 10., 20., 50., 40.),
        Err(Error::MalformedFuzzySet { .. })
    ));
    assert!(matches!(
        FuzzySet::new("smoke", "low", 10., f64::NAN, 30., 40.),
        Err(Error::NonFiniteBreakpoint { .. })
    ));
    assert!(FuzzySet::new("smoke", "spike", 5., 5., 5., 5.).is_ok());
}

#[test]
fn test_fuzzify_prunes_zero_degrees() {
    let sets = [
        FuzzySet::new("smoke", "none", 0., 0., 10., 20.).unwrap(),
        FuzzySet::new("smoke", "low", 10., 20., 30., 40.).unwrap(),
        FuzzySet::new("smoke", "medium", 30., 40., 60., 70.).unwrap(),
    ];

    let fuzzified = fuzzify(15., &sets);

    assert_eq!(fuzzified.len(), 2);
    assert_eq!(fuzzified["none"], 0.5);
    assert_eq!(fuzzified["low"], 0.5);
    assert!(!fuzzified.contains_key("medium"));

    for value in [-10., 0., 10., 20., 35., 70., 500.] {
        assert!(fuzzify(value, &sets).values().all(|d| *d > 0.));
    }
}

#[test]
fn test_fuzzify_without_sets_is_empty() {
    let sets: [FuzzySet; 0] = [];

    assert!(fuzzify(42., &sets).is_empty());
}

#[test]
fn test_fuzzy_set_from_json() {
    let set: FuzzySet =
        serde_json::from_str(r#"{"variable": "zone", "name": "risk", "a": 1, "b": 2, "c": 3, "d": 4}"#).unwrap();

    assert_eq!(set.points(), [1., 2., 3., 4.]);
    assert_eq!(set.membership(1.5), 0.5);

    let err = serde_json::from_str::<FuzzySet>(r#"{"variable": "zone", "name": "risk", "a": 4, "b": 2, "c": 3, "d": 4}"#);
    assert!(err.is_err());
}
