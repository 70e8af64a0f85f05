use crate::terms::Channel;
use crate::variable::InputVar;

/// `variable is term`, one clause of a rule premise
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Condition {
    pub(crate) var: InputVar,
    pub(crate) term: String,
}

/// `channel := term`, one clause of a rule consequence
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conclusion {
    pub(crate) channel: Channel,
    pub(crate) term: String,
}

impl InputVar {
    pub fn is(self, term: impl Into<String>) -> Condition {
        Condition {
            var: self,
            term: term.into(),
        }
    }
}

impl Channel {
    pub fn to(self, term: impl Into<String>) -> Conclusion {
        Conclusion {
            channel: self,
            term: term.into(),
        }
    }
}

impl Condition {
    pub fn var(&self) -> InputVar {
        self.var
    }

    pub fn term(&self) -> &str {
        &self.term
    }
}

impl Conclusion {
    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn term(&self) -> &str {
        &self.term
    }
}

#[test]
fn test_clauses() {
    let cond = InputVar::Smoke.is("high");
    let concl = Channel::Alarm.to("on");

    assert_eq!(cond.var(), InputVar::Smoke);
    assert_eq!(cond.term(), "high");
    assert_eq!(concl.channel(), Channel::Alarm);
    assert_eq!(concl.term(), "on");
}
