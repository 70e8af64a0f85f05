use num::Float;
use tracing::warn;

use crate::terms::{CrispTable, TermActivations};

/// Min t-norm over a rule premise.
///
/// An empty premise is the identity of `min`, so a rule without conditions
/// always holds at full strength.
pub fn conjunction<F: Float>(degrees: impl IntoIterator<Item = F>) -> F {
    degrees.into_iter().fold(F::one(), F::min)
}

/// Max aggregation of one rule's activation into a channel's term map.
///
/// Reapplying the same activation leaves the map unchanged.
pub fn aggregate(activations: &mut TermActivations, term: &str, degree: f64) {
    match activations.get_mut(term) {
        Some(current) => *current = f64::max(*current, degree),
        None => {
            activations.insert(term.to_owned(), degree);
        },
    }
}

/// Weighted average of the crisp values of the activated terms.
///
/// Terms missing from `table` are skipped. Returns zero when nothing usable is
/// left, so the result is always finite and inside the table's value range.
pub fn defuzzify(activations: &TermActivations, table: &CrispTable) -> f64 {
    if activations.is_empty() {
        return 0.;
    }

    let mut num = 0.;
    let mut den = 0.;

    for (term, degree) in activations {
        let Some(crisp) = table.get(term) else {
            warn!(term = %term, "skipping term with no crisp value");
            continue;
        };

        num += degree * crisp;
        den += degree;
    }

    if den == 0. {
        return 0.;
    }

    num / den
}

#[cfg(test)]
fn sprinkler_table() -> CrispTable {
    CrispTable::new()
        .with("off", 0.)
        .with("low", 0.33)
        .with("medium", 0.66)
        .with("high", 1.)
}

#[test]
fn test_conjunction() {
    assert_eq!(conjunction::<f64>([]), 1.);
    assert_eq!(conjunction([1., 1., 1.]), 1.);
    assert_eq!(conjunction([0.5, 0.25, 1.]), 0.25);
    assert_eq!(conjunction([0.7, 0.]), 0.);
}

#[test]
fn test_aggregate_keeps_maximum() {
    let mut acts = TermActivations::new();

    aggregate(&mut acts, "low", 0.4);
    aggregate(&mut acts, "low", 0.2);
    assert_eq!(acts["low"], 0.4);

    aggregate(&mut acts, "low", 0.9);
    assert_eq!(acts["low"], 0.9);

    // Idempotent
    let before = acts.clone();
    aggregate(&mut acts, "low", 0.9);
    assert_eq!(acts, before);
}

#[test]
fn test_defuzzify_empty_is_zero() {
    assert_eq!(defuzzify(&TermActivations::new(), &sprinkler_table()), 0.);
}

#[test]
fn test_defuzzify_weighted_average() {
    let acts: TermActivations = [("low".to_owned(), 0.5), ("medium".to_owned(), 0.5)].into_iter().collect();
    let y = defuzzify(&acts, &sprinkler_table());

    assert!((y - 0.495).abs() < 1e-12);

    let acts: TermActivations = [("high".to_owned(), 0.3)].into_iter().collect();
    assert_eq!(defuzzify(&acts, &sprinkler_table()), 1.);
}

#[test]
fn test_defuzzify_skips_unknown_terms() {
    let acts: TermActivations = [("deluge".to_owned(), 1.), ("off".to_owned(), 0.5)].into_iter().collect();
    assert_eq!(defuzzify(&acts, &sprinkler_table()), 0.);

    let acts: TermActivations = [("deluge".to_owned(), 1.), ("high".to_owned(), 0.5)].into_iter().collect();
    assert_eq!(defuzzify(&acts, &sprinkler_table()), 1.);

    let only_unknown: TermActivations = [("deluge".to_owned(), 1.)].into_iter().collect();
    assert_eq!(defuzzify(&only_unknown, &sprinkler_table()), 0.);
}

#[test]
fn test_defuzzify_stays_within_table_range() {
    let table = CrispTable::new().with("none", 0.2).with("prepare", 0.5).with("immediate", 0.9);
    let degrees = [0.05, 0.3, 0.77, 1.];

    for a in degrees {
        for b in degrees {
            for c in degrees {
                let acts: TermActivations = [
                    ("none".to_owned(), a),
                    ("prepare".to_owned(), b),
                    ("immediate".to_owned(), c),
                ]
                .into_iter()
                .collect();
                let y = defuzzify(&acts, &table);

                assert!((0.2..=0.9).contains(&y), "{y} escaped the table range");
            }
        }
    }
}
