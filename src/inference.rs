use std::collections::BTreeMap;

use tracing::{debug, trace, warn};

use crate::config::EngineConfig;
use crate::inputs::Inputs;
use crate::knowledge::KnowledgeBase;
use crate::ops::{aggregate, conjunction, defuzzify};
use crate::outputs::{ChannelOutput, InferenceTrace, Outputs, RuleEvaluation, SkippedTerm};
use crate::terms::{Channel, TermActivations};
use crate::variable::{fuzzify, Fuzzified, InputVar};

/// Everything one inference produced
#[derive(Clone, Debug, PartialEq)]
pub struct Inference {
    pub outputs: Outputs,
    /// Aggregated term activations per channel, empty when no rule reached it
    pub activations: BTreeMap<Channel, TermActivations>,
    pub trace: InferenceTrace,
}

/// Min-max inference with weighted-average defuzzification.
///
/// The engine holds no per-call state, so one instance can serve any number of
/// threads as long as the knowledge base isn't mutated underneath it.
#[derive(Clone, Debug, Default)]
pub struct FuzzyEngine {
    config: EngineConfig,
}

impl FuzzyEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn fuzzify<K: KnowledgeBase + ?Sized>(&self, kb: &K, value: f64, variable: &str) -> Fuzzified {
        fuzzify(value, kb.fuzzy_sets(variable))
    }

    /// Shorthand for [`FuzzyEngine::infer`] when only the crisp values matter
    pub fn evaluate<K: KnowledgeBase + ?Sized>(&self, kb: &K, smoke: f64, temperature: f64, zone: f64) -> Outputs {
        self.infer(kb, Inputs::new(smoke, temperature, zone)).outputs
    }

    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(smoke = inputs.smoke(), temperature = inputs.temperature(), zone = inputs.zone())
    )]
    pub fn infer<K: KnowledgeBase + ?Sized>(&self, kb: &K, inputs: Inputs) -> Inference {
        // Fuzzify every input independently
        let mut fuzzified = BTreeMap::new();

        for var in InputVar::ALL {
            let degrees = self.fuzzify(kb, inputs.get(var), var.name());

            debug!(variable = var.name(), value = inputs.get(var), ?degrees, "fuzzified input");
            fuzzified.insert(var, degrees);
        }

        let rules = kb.rules();
        let mut activations: BTreeMap<Channel, TermActivations> =
            Channel::ALL.into_iter().map(|c| (c, TermActivations::new())).collect();
        let mut evaluations = Vec::with_capacity(rules.len());
        let mut skipped = Vec::new();

        // Rule order is irrelevant: min and max commute, so every rule is
        // evaluated and folded in regardless of priority
        for rule in rules {
            let truth = conjunction(rule.conditions().map(|(var, term)| {
                fuzzified
                    .get(&var)
                    .and_then(|degrees: &Fuzzified| degrees.get(term))
                    .copied()
                    .unwrap_or(0.)
            }));
            let fired = truth > 0.;

            trace!(rule = rule.id(), priority = rule.priority(), truth, fired, "evaluated rule");
            evaluations.push(RuleEvaluation {
                id: rule.id(),
                priority: rule.priority(),
                truth,
                fired,
            });

            if !fired {
                continue;
            }

            for (channel, term) in rule.conclusions() {
                let channel_config = self.config.channel(channel);

                if !channel_config.terms.contains(term) {
                    warn!(
                        rule = rule.id(),
                        channel = %channel_config.name,
                        term,
                        "rule concludes an unrecognized term; skipping"
                    );
                    skipped.push(SkippedTerm {
                        rule: rule.id(),
                        channel,
                        term: term.to_owned(),
                    });
                    continue;
                }

                aggregate(activations.entry(channel).or_default(), term, truth);
            }
        }

        evaluations.sort_by(|a, b| b.priority.cmp(&a.priority));

        let output = |channel: Channel| {
            let channel_config = self.config.channel(channel);
            let acts = &activations[&channel];
            let value = defuzzify(acts, &channel_config.terms);
            let status = channel_config.bands.label(value).to_owned();

            debug!(channel = %channel_config.name, ?acts, value, %status, "defuzzified channel");

            ChannelOutput {
                name: channel_config.name.clone(),
                value,
                status,
            }
        };
        let outputs = Outputs {
            sprinkler: output(Channel::Sprinkler),
            alarm: output(Channel::Alarm),
            auxiliary: output(Channel::Auxiliary),
        };

        Inference {
            outputs,
            activations,
            trace: InferenceTrace {
                fuzzified,
                rules: evaluations,
                skipped,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::knowledge::MemoryKnowledgeBase;
    use crate::rules::{Rule, Rules};
    use crate::variable::FuzzySet;

    const EPS: f64 = 1e-9;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn assert_same_outputs(a: &Outputs, b: &Outputs) {
        for channel in Channel::ALL {
            assert_close(a.get(channel).value, b.get(channel).value);
        }
    }

    /// Knowledge base sharing the fire sets but with a caller-supplied rule list
    fn with_rules(rules: impl IntoIterator<Item = Rule>) -> MemoryKnowledgeBase {
        let base = MemoryKnowledgeBase::fire_suppression();
        let mut kb = MemoryKnowledgeBase::new();

        for var in InputVar::ALL {
            for set in base.fuzzy_sets(var.name()) {
                kb.add_fuzzy_set(set.clone()).unwrap();
            }
        }

        for rule in rules {
            kb.add_rule(rule).unwrap();
        }

        kb
    }

    fn cloned_rules(rules: &Rules) -> Vec<Rule> {
        rules.iter().cloned().collect()
    }

    #[test]
    fn test_scenario_a_fully_safe() {
        for (config, kb) in [
            (EngineConfig::evacuation(), MemoryKnowledgeBase::fire_suppression()),
            (EngineConfig::ventilation(), MemoryKnowledgeBase::fire_suppression_ventilation()),
        ] {
            let engine = FuzzyEngine::new(config);
            let inference = engine.infer(&kb, Inputs::new(0., 0., 0.));
            let outputs = &inference.outputs;

            assert_eq!(outputs.sprinkler(), 0.);
            assert_eq!(outputs.alarm(), 0.);
            assert_eq!(outputs.auxiliary(), 0.);
            assert_eq!(outputs.get(Channel::Alarm).status, "off");
            // The all-clear rules still fire; their terms just map to zero
            assert_eq!(inference.activations[&Channel::Sprinkler]["off"], 1.);
        }
    }

    #[test]
    fn test_scenario_b_high_smoke() {
        let engine = FuzzyEngine::new(EngineConfig::evacuation());
        let kb = MemoryKnowledgeBase::fire_suppression();
        let inference = engine.infer(&kb, Inputs::new(80., 30., 0.));

        assert_eq!(inference.outputs.sprinkler(), 1.);
        assert_eq!(inference.outputs.alarm(), 1.);
        assert_eq!(inference.outputs.auxiliary(), 1.);
        assert_eq!(inference.outputs.get(Channel::Auxiliary).status, "immediate");
        assert_eq!(inference.outputs.get(Channel::Sprinkler).status, "high");

        let fired: Vec<_> = inference.trace.fired().map(|r| r.id).collect();
        assert_eq!(fired, [1]);
        assert_eq!(inference.trace.fired().next().unwrap().truth, 1.);

        let vent = FuzzyEngine::new(EngineConfig::ventilation());
        let outputs = vent.evaluate(&MemoryKnowledgeBase::fire_suppression_ventilation(), 80., 30., 0.);

        assert_eq!(outputs.auxiliary(), 1.);
        assert_eq!(outputs.get(Channel::Auxiliary).name, "ventilation");
        assert_eq!(outputs.get(Channel::Auxiliary).status, "high");
    }

    #[test]
    fn test_scenario_c_partial_memberships() {
        let engine = FuzzyEngine::new(EngineConfig::evacuation());
        let kb = MemoryKnowledgeBase::fire_suppression();
        let inference = engine.infer(&kb, Inputs::new(35., 65., 3.));
        let trace = &inference.trace;

        assert_eq!(trace.fuzzified[&InputVar::Smoke]["low"], 0.5);
        assert_eq!(trace.fuzzified[&InputVar::Smoke]["medium"], 0.5);
        assert_eq!(trace.fuzzified[&InputVar::Temperature]["hot"], 0.5);
        assert_eq!(trace.fuzzified[&InputVar::Zone]["risk"], 1.);
        assert!(!trace.fuzzified[&InputVar::Zone].contains_key("danger"));

        assert!(trace.fired().count() > 1);
        assert!(trace.fired().all(|r| r.truth > 0. && r.truth < 1.));

        let sprinkler = inference.outputs.sprinkler();
        assert!(0. < sprinkler && sprinkler < 1.);
        assert_close(sprinkler, (0.33 * 0.5 + 0.66 * 0.5) / 1.);
        assert_close(inference.outputs.alarm(), 0.75);
        assert_close(inference.outputs.auxiliary(), 0.25);
        assert_eq!(inference.outputs.get(Channel::Alarm).status, "on");
        assert_eq!(inference.outputs.get(Channel::Auxiliary).status, "prepare");
    }

    #[test]
    fn test_scenario_d_unknown_term_is_dropped() {
        let kb = with_rules([
            Rule::new(1, 10)
                .when(InputVar::Smoke.is("high"))
                .then(Channel::Sprinkler.to("deluge"))
                .then(Channel::Alarm.to("on"))
                .then(Channel::Auxiliary.to("immediate")),
            Rule::new(2, 5)
                .when(InputVar::Zone.is("safe"))
                .then(Channel::Sprinkler.to("low")),
        ]);
        let engine = FuzzyEngine::new(EngineConfig::evacuation());
        let inference = engine.infer(&kb, Inputs::new(80., 30., 0.));

        assert_eq!(
            inference.trace.skipped,
            [SkippedTerm {
                rule: 1,
                channel: Channel::Sprinkler,
                term: "deluge".to_owned(),
            }]
        );
        assert!(!inference.activations[&Channel::Sprinkler].contains_key("deluge"));
        assert_close(inference.outputs.sprinkler(), 0.33);
        assert_eq!(inference.outputs.alarm(), 1.);
        assert_eq!(inference.outputs.auxiliary(), 1.);

        for (_, output) in inference.outputs.iter() {
            assert!(output.value.is_finite());
        }
    }

    #[test]
    fn test_scenario_c_partial_memberships_ventilation() {
        let engine = FuzzyEngine::new(EngineConfig::ventilation());
        let kb = MemoryKnowledgeBase::fire_suppression_ventilation();
        let inference = engine.infer(&kb, Inputs::new(35., 65., 3.));

        let fired: Vec<_> = inference.trace.fired().map(|r| r.id).collect();
        assert_eq!(fired, [3, 5, 6, 7, 9, 10]);
        assert!(inference.trace.fired().all(|r| r.truth == 0.5));

        let vent = &inference.activations[&Channel::Auxiliary];
        assert_eq!((vent["low"], vent["medium"]), (0.5, 0.5));
        assert!(inference.trace.skipped.is_empty());

        assert_close(inference.outputs.sprinkler(), 0.495);
        assert_close(inference.outputs.alarm(), 0.75);
        assert_close(inference.outputs.auxiliary(), 0.495);

        let aux = inference.outputs.get(Channel::Auxiliary);
        assert_eq!(aux.name, "ventilation");
        assert_eq!(aux.status, "low");
    }

    #[test]
    fn test_scenario_d_unknown_ventilation_term_is_dropped() {
        let engine = FuzzyEngine::new(EngineConfig::ventilation());
        let rules = [
            // "none" is an evacuation term; ventilation has no such level
            Rule::new(1, 10)
                .when(InputVar::Smoke.is("high"))
                .then(Channel::Sprinkler.to("high"))
                .then(Channel::Alarm.to("on"))
                .then(Channel::Auxiliary.to("none")),
            Rule::new(2, 5)
                .when(InputVar::Zone.is("safe"))
                .then(Channel::Auxiliary.to("low")),
        ];
        let kb = with_rules(rules.clone());
        let inference = engine.infer(&kb, Inputs::new(80., 30., 0.));

        assert_eq!(
            inference.trace.skipped,
            [SkippedTerm {
                rule: 1,
                channel: Channel::Auxiliary,
                term: "none".to_owned(),
            }]
        );
        assert!(!inference.activations[&Channel::Auxiliary].contains_key("none"));
        assert_eq!(inference.outputs.sprinkler(), 1.);
        assert_eq!(inference.outputs.alarm(), 1.);
        assert_close(inference.outputs.auxiliary(), 0.33);
        assert_eq!(inference.outputs.get(Channel::Auxiliary).status, "low");

        // With nothing else driving ventilation the channel falls back to zero
        let kb = with_rules(rules.into_iter().take(1));
        let outputs = engine.evaluate(&kb, 80., 30., 0.);

        assert_eq!(outputs.sprinkler(), 1.);
        assert_eq!(outputs.alarm(), 1.);
        assert_eq!(outputs.auxiliary(), 0.);
        assert_eq!(outputs.get(Channel::Auxiliary).status, "off");
    }

    #[test]
    fn test_only_unknown_terms_yield_zero() {
        let kb = with_rules([Rule::new(1, 1).then(Channel::Auxiliary.to("open_windows"))]);
        let engine = FuzzyEngine::new(EngineConfig::evacuation());
        let inference = engine.infer(&kb, Inputs::new(50., 50., 2.));

        assert!(inference.activations[&Channel::Auxiliary].is_empty());
        assert_eq!(inference.outputs.auxiliary(), 0.);
        assert_eq!(inference.trace.skipped.len(), 1);
    }

    #[test]
    fn test_unconditional_rule_fires_at_full_strength() {
        let kb = with_rules([Rule::new(1, 0).then(Channel::Alarm.to("warning"))]);
        let engine = FuzzyEngine::default();

        // Even far outside every fuzzy set
        let inference = engine.infer(&kb, Inputs::new(-1000., 1e6, 42.));

        assert_eq!(inference.trace.rules[0].truth, 1.);
        assert_eq!(inference.activations[&Channel::Alarm]["warning"], 1.);
        assert_eq!(inference.outputs.alarm(), 0.5);
        assert_eq!(inference.outputs.get(Channel::Alarm).status, "warning");
    }

    #[test]
    fn test_fully_satisfied_premise_has_truth_one() {
        let kb = with_rules([Rule::new(1, 3)
            .when(InputVar::Smoke.is("medium"))
            .when(InputVar::Temperature.is("warm"))
            .when(InputVar::Zone.is("danger"))
            .then(Channel::Sprinkler.to("medium"))]);
        let engine = FuzzyEngine::default();
        let inference = engine.infer(&kb, Inputs::new(50., 50., 4.5));

        assert_eq!(inference.trace.rules[0].truth, 1.);
        assert_eq!(inference.outputs.sprinkler(), 0.66);
    }

    #[test]
    fn test_repeated_rule_is_idempotent() {
        let rule = |id| {
            Rule::new(id, 7)
                .when(InputVar::Smoke.is("low"))
                .then(Channel::Sprinkler.to("low"))
                .then(Channel::Alarm.to("warning"))
        };
        let engine = FuzzyEngine::default();
        let once = engine.infer(&with_rules([rule(1)]), Inputs::new(35., 20., 0.));
        let twice = engine.infer(&with_rules([rule(1), rule(2)]), Inputs::new(35., 20., 0.));

        assert_eq!(once.activations, twice.activations);
        assert_eq!(once.outputs, twice.outputs);
    }

    #[test]
    fn test_rule_order_does_not_matter() {
        let kb = MemoryKnowledgeBase::fire_suppression();
        let engine = FuzzyEngine::default();
        let base = cloned_rules(kb.rules());
        let samples = [
            (0., 0., 0.),
            (80., 30., 0.),
            (35., 65., 3.),
            (15., 45., 1.5),
            (65., 110., 3.5),
            (25., 150., 4.2),
        ];

        let mut permutations = vec![base.clone()];
        let mut reversed = base.clone();
        reversed.reverse();
        permutations.push(reversed);

        for shift in [3, 7, 11] {
            let mut rotated = base.clone();
            rotated.rotate_left(shift);
            permutations.push(rotated);
        }

        // Interleave evens and odds
        let (even, odd): (Vec<_>, Vec<_>) = base.iter().cloned().enumerate().partition(|(i, _)| i % 2 == 0);
        permutations.push(odd.into_iter().chain(even).map(|(_, r)| r).collect());

        for (smoke, temp, zone) in samples {
            let expected = engine.evaluate(&kb, smoke, temp, zone);

            for rules in &permutations {
                let permuted = with_rules(rules.iter().cloned());
                assert_same_outputs(&engine.evaluate(&permuted, smoke, temp, zone), &expected);
            }
        }
    }

    #[test]
    fn test_priority_does_not_change_results() {
        let kb = MemoryKnowledgeBase::fire_suppression();
        let engine = FuzzyEngine::default();
        let inverted = with_rules(kb.rules().iter().map(|r| {
            let mut record = serde_json::to_value(r).unwrap();
            record["priority"] = serde_json::json!(-r.priority());
            serde_json::from_value::<Rule>(record).unwrap()
        }));

        for (smoke, temp, zone) in [(35., 65., 3.), (65., 110., 3.5), (12., 38., 1.2)] {
            let a = engine.infer(&kb, Inputs::new(smoke, temp, zone));
            let b = engine.infer(&inverted, Inputs::new(smoke, temp, zone));

            assert_same_outputs(&a.outputs, &b.outputs);
            assert_eq!(a.activations, b.activations);
        }
    }

    #[test]
    fn test_trace_is_ordered_by_priority() {
        let kb = MemoryKnowledgeBase::fire_suppression();
        let inference = FuzzyEngine::default().infer(&kb, Inputs::new(35., 65., 3.));
        let priorities: Vec<_> = inference.trace.rules.iter().map(|r| r.priority).collect();

        assert_eq!(priorities.len(), kb.rules().len());
        assert!(priorities.windows(2).all(|w| w[0] >= w[1]));
        // Equal priorities keep rule base order
        assert_eq!(inference.trace.rules[0].id, 1);
        assert_eq!(inference.trace.rules[1].id, 2);
    }

    #[test]
    fn test_missing_variable_sets_degrade_to_zero() {
        let mut kb = MemoryKnowledgeBase::new();

        kb.add_fuzzy_set(FuzzySet::new("smoke", "high", 60., 70., 100., 100.).unwrap())
            .unwrap();
        kb.add_rule(
            Rule::new(1, 1)
                .when(InputVar::Temperature.is("hot"))
                .then(Channel::Sprinkler.to("high")),
        )
        .unwrap();

        let engine = FuzzyEngine::default();
        let inference = engine.infer(&kb, Inputs::new(90., 90., 2.));

        assert!(inference.trace.fuzzified[&InputVar::Temperature].is_empty());
        assert!(!inference.trace.rules[0].fired);
        assert!(inference.activations.values().all(|a| a.is_empty()));
        assert_eq!(inference.outputs.sprinkler(), 0.);
    }

    #[test]
    fn test_outputs_stay_in_range() {
        let kb = MemoryKnowledgeBase::fire_suppression();
        let engine = FuzzyEngine::default();

        for smoke in (0..=100).step_by(5) {
            for temp in (0..=200).step_by(10) {
                for zone in 0..=10 {
                    let outputs = engine.evaluate(&kb, smoke as f64, temp as f64, zone as f64 / 2.);

                    for (channel, output) in outputs.iter() {
                        let (lo, hi) = engine.config().channel(channel).terms.bounds().unwrap();
                        assert!(output.value.is_finite());
                        assert!(lo <= output.value && output.value <= hi + EPS);
                    }
                }
            }
        }
    }

    #[test]
    fn test_shared_engine_across_threads() {
        let kb = MemoryKnowledgeBase::fire_suppression();
        let engine = FuzzyEngine::default();
        let scenarios = [(0., 0., 0.), (80., 30., 0.), (35., 65., 3.)];
        let expected: Vec<_> = scenarios.iter().map(|&(s, t, z)| engine.evaluate(&kb, s, t, z)).collect();
        let (engine, kb) = (&engine, &kb);

        thread::scope(|scope| {
            let handles: Vec<_> = scenarios
                .iter()
                .map(|&(s, t, z)| scope.spawn(move || engine.evaluate(kb, s, t, z)))
                .collect();

            for (handle, expected) in handles.into_iter().zip(&expected) {
                assert_eq!(&handle.join().unwrap(), expected);
            }
        });
    }
}
