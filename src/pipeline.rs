use log::{debug, info};

use crate::calo::CaloEnergyCorrector;
use crate::config::Config;
use crate::data::{Electron, Jet, Muon, Photon, Track};
use crate::pid::{ElectronIdentifier, KaonIdentifier};
use crate::refine::Refiner;
use crate::store::EventStore;
use crate::tagging::JetTagger;
use crate::{OleanderError, OleanderResult};

/// The long-lived engines owned by the pipeline driver and injected into every
/// module: the jet tagger and the calorimeter energy corrector.
///
/// Both hold event-scoped caches which the driver clears inside the
/// begin-event bracket; the engines themselves (and any tables they carry)
/// live for the whole run.
#[derive(Default)]
pub struct Engines {
    pub tagger: JetTagger,
    pub corrector: CaloEnergyCorrector,
}

impl Engines {
    fn clear_event_caches(&mut self) {
        self.tagger.begin_event();
        self.corrector.begin_event();
    }
}

/// One stage of the analysis sequence.
///
/// Modules are constructed up front, initialized once against the
/// configuration, executed once per event against the shared store, and
/// finalized at teardown. Returning `Ok(false)` from
/// [`execute`](AnalysisModule::execute) skips the remaining modules for the
/// current event without treating it as an error.
pub trait AnalysisModule {
    fn name(&self) -> &str;

    #[allow(unused_variables)]
    fn initialize(&mut self, config: &Config) -> OleanderResult<()> {
        Ok(())
    }

    fn execute(&mut self, store: &mut EventStore, engines: &mut Engines) -> OleanderResult<bool>;

    fn finalize(&mut self) {}
}

/// Construct a module of the given class. Refiner classes are pre-instantiated
/// per candidate kind, mirroring the classes a configuration may name.
pub fn module_by_class(class: &str, name: &str) -> OleanderResult<Box<dyn AnalysisModule>> {
    match class {
        "JetRefiner" => Ok(Box::new(Refiner::<Jet>::new(name))),
        "TrackRefiner" => Ok(Box::new(Refiner::<Track>::new(name))),
        "ElectronRefiner" => Ok(Box::new(Refiner::<Electron>::new(name))),
        "MuonRefiner" => Ok(Box::new(Refiner::<Muon>::new(name))),
        "NeutralRefiner" => Ok(Box::new(Refiner::<Photon>::new(name))),
        "KaonId" => Ok(Box::new(KaonIdentifier::new(name))),
        "ElectronId" => Ok(Box::new(ElectronIdentifier::new(name))),
        _ => Err(OleanderError::UnknownModule {
            class: class.to_string(),
        }),
    }
}

/// The synchronous, single-threaded pipeline driver.
///
/// Drives the per-event bracket: [`begin_event`](Pipeline::begin_event) clears
/// the store and every engine cache, the ingestion collaborator then populates
/// the store, and [`run`](Pipeline::run) executes the module sequence in
/// order. An error from a module aborts the current event only; all state it
/// may have left behind is event-scoped and discarded by the next bracket.
#[derive(Default)]
pub struct Pipeline {
    modules: Vec<Box<dyn AnalysisModule>>,
    engines: Engines,
}

impl Pipeline {
    pub fn new(engines: Engines) -> Self {
        Self {
            modules: Vec::new(),
            engines,
        }
    }

    /// Append a pre-built module to the sequence.
    pub fn add_module(&mut self, module: Box<dyn AnalysisModule>) {
        info!("appending module {}", module.name());
        self.modules.push(module);
    }

    /// Append a module by class name, as named in the configuration.
    pub fn add_module_by_class(&mut self, class: &str, name: &str) -> OleanderResult<()> {
        let module = module_by_class(class, name)?;
        self.add_module(module);
        Ok(())
    }

    /// Initialize every module against the configuration, in sequence order.
    pub fn initialize(&mut self, config: &Config) -> OleanderResult<()> {
        for module in &mut self.modules {
            module.initialize(config)?;
        }
        Ok(())
    }

    /// Open the per-event bracket: clear the store, the arena, and all engine
    /// caches. Ingestion populates the store after this call.
    pub fn begin_event(&mut self, store: &mut EventStore) {
        store.clear();
        self.engines.clear_event_caches();
    }

    /// Execute the module sequence for the current event. Stops early when a
    /// module reports `Ok(false)`; propagates the first error.
    pub fn run(&mut self, store: &mut EventStore) -> OleanderResult<()> {
        for module in &mut self.modules {
            if !module.execute(store, &mut self.engines)? {
                debug!("module {} ended the event early", module.name());
                break;
            }
        }
        Ok(())
    }

    /// Close the per-event bracket: derived-record caches do not outlive the
    /// event even if the next bracket is never opened.
    pub fn end_event(&mut self) {
        self.engines.clear_event_caches();
    }

    /// Finalize every module at teardown.
    pub fn finalize(&mut self) {
        for module in &mut self.modules {
            module.finalize();
        }
    }

    /// Access the injected engines, e.g. for the serialization collaborator's
    /// pull accessors.
    pub fn engines_mut(&mut self) -> &mut Engines {
        &mut self.engines
    }
}
