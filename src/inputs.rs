use crate::variable::InputVar;

/// Crisp sensor readings for one inference.
///
/// Values are not clamped; anything outside a variable's fuzzy sets simply
/// fuzzifies to an empty map.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Inputs {
    smoke: f64,
    temperature: f64,
    zone: f64,
}

impl Inputs {
    pub fn new(smoke: f64, temperature: f64, zone: f64) -> Self {
        Inputs {
            smoke,
            temperature,
            zone,
        }
    }

    pub fn set(&mut self, var: InputVar, value: f64) {
        match var {
            InputVar::Smoke => self.smoke = value,
            InputVar::Temperature => self.temperature = value,
            InputVar::Zone => self.zone = value,
        }
    }

    pub fn get(&self, var: InputVar) -> f64 {
        match var {
            InputVar::Smoke => self.smoke,
            InputVar::Temperature => self.temperature,
            InputVar::Zone => self.zone,
        }
    }

    pub fn smoke(&self) -> f64 {
        self.smoke
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn zone(&self) -> f64 {
        self.zone
    }
}

#[test]
fn test_inputs() {
    let mut inputs = Inputs::new(35., 65., 3.);

    assert_eq!(inputs.get(InputVar::Temperature), 65.);
    inputs.set(InputVar::Zone, 4.5);
    assert_eq!(inputs.zone(), 4.5);
    assert_eq!(inputs.smoke(), 35.);
}
