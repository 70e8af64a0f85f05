use std::collections::BTreeMap;

use crate::terms::Channel;
use crate::variable::{Fuzzified, InputVar};

#[derive(Clone, Debug, PartialEq)]
pub struct ChannelOutput {
    /// Name from the channel's configuration, e.g. `evacuation`
    pub name: String,
    /// Defuzzified crisp value
    pub value: f64,
    /// Display label from the channel's status bands
    pub status: String,
}

/// One crisp value per output channel.
#[derive(Clone, Debug, PartialEq)]
pub struct Outputs {
    pub(crate) sprinkler: ChannelOutput,
    pub(crate) alarm: ChannelOutput,
    pub(crate) auxiliary: ChannelOutput,
}

impl Outputs {
    pub fn get(&self, channel: Channel) -> &ChannelOutput {
        match channel {
            Channel::Sprinkler => &self.sprinkler,
            Channel::Alarm => &self.alarm,
            Channel::Auxiliary => &self.auxiliary,
        }
    }

    pub fn sprinkler(&self) -> f64 {
        self.sprinkler.value
    }

    pub fn alarm(&self) -> f64 {
        self.alarm.value
    }

    /// Ventilation or evacuation, depending on the engine configuration
    pub fn auxiliary(&self) -> f64 {
        self.auxiliary.value
    }

    pub fn iter(&self) -> impl Iterator<Item = (Channel, &ChannelOutput)> {
        Channel::ALL.into_iter().map(move |c| (c, self.get(c)))
    }
}

/// How a single rule evaluated
#[derive(Clone, Debug, PartialEq)]
pub struct RuleEvaluation {
    pub id: u32,
    pub priority: i32,
    pub truth: f64,
    pub fired: bool,
}

/// A rule conclusion dropped because its channel has no such term
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedTerm {
    pub rule: u32,
    pub channel: Channel,
    pub term: String,
}

/// Structured record of an inference, for callers that want to show their work.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InferenceTrace {
    pub fuzzified: BTreeMap<InputVar, Fuzzified>,
    /// Ordered by descending priority, rule base order among equals
    pub rules: Vec<RuleEvaluation>,
    pub skipped: Vec<SkippedTerm>,
}

impl InferenceTrace {
    pub fn fired(&self) -> impl Iterator<Item = &RuleEvaluation> {
        self.rules.iter().filter(|r| r.fired)
    }
}
