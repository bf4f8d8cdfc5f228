use log::{debug, info, warn};

use crate::config::{Config, Range, SelectorSpec};
use crate::data::{CandidateKind, HasCharge, Kinematics};
use crate::pipeline::{AnalysisModule, Engines};
use crate::selectors::Attribute;
use crate::store::EventStore;
use crate::OleanderResult;

/// A generic refinement stage: reads one named collection, applies the
/// configured selection windows, and writes the surviving clones under a new
/// name.
///
/// All configured selectors are evaluated for every candidate and combined by
/// AND accumulation; there is no short-circuit. Attribute names that do not
/// correspond to a known selector are ignored (with a warning at
/// initialization), matching the leniency of the configuration surface this
/// engine was designed against.
pub struct Refiner<T> {
    name: String,
    input: String,
    output: String,
    cuts: Vec<(Attribute, Range)>,
    scratch: Vec<T>,
}

impl<T> Refiner<T> {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            input: String::new(),
            output: String::new(),
            cuts: Vec::new(),
            scratch: Vec::new(),
        }
    }

    /// The configured selection windows, in configuration order.
    pub fn cuts(&self) -> &[(Attribute, Range)] {
        &self.cuts
    }
}

impl<T> AnalysisModule for Refiner<T>
where
    T: CandidateKind + Kinematics + HasCharge + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, config: &Config) -> OleanderResult<()> {
        self.input = config.require(&self.name, "inputList")?.to_string();
        info!("{}::inputList: value set to {}", self.name, self.input);
        self.output = config.require(&self.name, "outputList")?.to_string();
        info!("{}::outputList: value set to {}", self.name, self.output);

        self.cuts.clear();
        for raw in config.many(&self.name, "selectors") {
            let spec: SelectorSpec = raw.parse()?;
            match spec.attribute.parse::<Attribute>() {
                Ok(attribute) => self.cuts.push((attribute, spec.range)),
                Err(_) => warn!(
                    "{}: ignoring selector on unknown attribute \"{}\"",
                    self.name, spec.attribute
                ),
            }
        }
        Ok(())
    }

    fn execute(&mut self, store: &mut EventStore, _engines: &mut Engines) -> OleanderResult<bool> {
        // Previous survivors are dropped here, not at the end of the event, so
        // the buffer's capacity carries over.
        self.scratch.clear();
        let n_input = {
            let input = store.get::<T>(&self.input)?;
            for candidate in input {
                let mut keep = true;
                for (attribute, range) in &self.cuts {
                    keep &= attribute.test(candidate, range);
                }
                if keep {
                    self.scratch.push(candidate.clone());
                }
            }
            input.len()
        };
        debug!(
            "{}: candidate reduction is {} => {}",
            self.name,
            n_input,
            self.scratch.len()
        );
        let survivors: Vec<T> = self.scratch.drain(..).collect();
        store.put(self.output.clone(), T::collection(survivors))?;
        Ok(true)
    }
}
