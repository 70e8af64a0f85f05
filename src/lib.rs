//! Fuzzy inference for fire suppression control.
//!
//! Crisp smoke, temperature and zone-risk readings are fuzzified against
//! trapezoidal sets, a conjunctive rule base is evaluated with the min t-norm,
//! activations are merged per output term with max, and each channel is
//! defuzzified to one crisp value by a weighted average over fixed term values.
//!
//! ```
//! use fuzzy_suppression::{EngineConfig, FuzzyEngine, MemoryKnowledgeBase};
//!
//! let kb = MemoryKnowledgeBase::fire_suppression();
//! let engine = FuzzyEngine::new(EngineConfig::evacuation());
//! let outputs = engine.evaluate(&kb, 80., 30., 0.);
//!
//! assert_eq!(outputs.sprinkler(), 1.);
//! ```

mod config;
mod dsl;
mod error;
mod inference;
mod inputs;
mod knowledge;
mod math;
mod ops;
mod outputs;
mod rules;
mod terms;
mod variable;

pub use config::{ChannelConfig, EngineConfig};
pub use dsl::{Conclusion, Condition};
pub use error::{Error, Result};
pub use inference::{FuzzyEngine, Inference};
pub use inputs::Inputs;
pub use knowledge::{FuzzySetKey, KnowledgeBase, MemoryKnowledgeBase};
pub use math::trapezoid;
pub use ops::{aggregate, conjunction, defuzzify};
pub use outputs::{ChannelOutput, InferenceTrace, Outputs, RuleEvaluation, SkippedTerm};
pub use rules::{Rule, Rules};
pub use terms::{Channel, CrispTable, StatusBands, TermActivations};
pub use variable::{fuzzify, Fuzzified, FuzzySet, InputVar};
