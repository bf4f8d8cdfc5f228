use log::{debug, info};

use crate::assoc::{
    deposit_matches, forward_pid, ForwardPidTables, BACKWARD_ETA, BARREL_ETA, FORWARD_ETA,
};
use crate::calo::UNDETERMINED;
use crate::config::Config;
use crate::data::{CandidateKind, Electron, Track};
use crate::pipeline::{AnalysisModule, Engines};
use crate::store::EventStore;
use crate::OleanderResult;

/// Charged kaon mass in GeV.
pub const KAON_MASS: f64 = 0.493677;
/// Electron mass in GeV.
pub const ELECTRON_MASS: f64 = 0.000510999;

/// Builds the `ChargedKaon` collection from the per-subdetector
/// particle-identification track tables.
///
/// Backward and barrel tracks are read directly from the sub-detectors
/// covering those regions; forward tracks are routed by momentum into the
/// aerogel or gas radiator table and matched there by identity. Every
/// selected track is cloned with its four-vector re-evaluated at the charged
/// kaon mass.
pub struct KaonIdentifier {
    name: String,
    output: String,
    scratch: Vec<Track>,
}

impl KaonIdentifier {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            output: "ChargedKaon".to_string(),
            scratch: Vec::new(),
        }
    }

    fn new_kaon(track: &Track, pid: i32) -> Track {
        let mut kaon = track.clone();
        kaon.mass = KAON_MASS;
        kaon.pid = pid;
        kaon
    }
}

impl AnalysisModule for KaonIdentifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, config: &Config) -> OleanderResult<()> {
        if let Some(output) = config.optional(&self.name, "outputList") {
            self.output = output.to_string();
        }
        info!("{}::outputList: value set to {}", self.name, self.output);
        Ok(())
    }

    fn execute(&mut self, store: &mut EventStore, _engines: &mut Engines) -> OleanderResult<bool> {
        self.scratch.clear();
        {
            let backward = store.get::<Track>("mRICHTrack")?;
            let barrel = store.get::<Track>("barrelDIRCTrack")?;
            let aerogel = store.get::<Track>("dualRICHagTrack")?;
            let gas = store.get::<Track>("dualRICHcfTrack")?;
            let raw = store.get::<Track>("Track")?;

            for track in backward {
                if track.eta < BACKWARD_ETA.0 || BACKWARD_ETA.1 < track.eta {
                    continue;
                }
                if track.pid.abs() == 321 {
                    self.scratch.push(Self::new_kaon(track, track.pid));
                }
            }

            for track in barrel {
                if track.eta < BARREL_ETA.0 || BARREL_ETA.1 < track.eta {
                    continue;
                }
                if track.pid.abs() == 321 {
                    self.scratch.push(Self::new_kaon(track, track.pid));
                }
            }

            let tables = ForwardPidTables { aerogel, gas };
            for track in raw {
                if track.eta < FORWARD_ETA.0 || FORWARD_ETA.1 < track.eta {
                    continue;
                }
                let pid = forward_pid(track, &tables);
                if pid.abs() == 321 {
                    self.scratch.push(Self::new_kaon(track, pid));
                }
            }
        }
        debug!("{}: identified {} charged kaons", self.name, self.scratch.len());
        let kaons: Vec<Track> = self.scratch.drain(..).collect();
        store.put(self.output.clone(), Track::collection(kaons))?;
        Ok(true)
    }
}

/// Builds an electron candidate collection from a track collection by
/// classifying each track's calorimeter response.
///
/// The track's matched-tower energy is split by the corrected electromagnetic
/// fraction from the [`CaloEnergyCorrector`](crate::calo::CaloEnergyCorrector)
/// and the track is kept when that fraction passes the configured `fEM_min`.
/// Selected tracks become [`Electron`] candidates at the electron mass with
/// their impact parameters and back-reference carried over.
pub struct ElectronIdentifier {
    name: String,
    input: String,
    output: String,
    tower_key: String,
    fem_min: f64,
    scratch: Vec<Electron>,
}

impl ElectronIdentifier {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            input: String::new(),
            output: String::new(),
            tower_key: "Tower".to_string(),
            fem_min: 0.0,
            scratch: Vec::new(),
        }
    }
}

impl AnalysisModule for ElectronIdentifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, config: &Config) -> OleanderResult<()> {
        self.input = config.require(&self.name, "inputList")?.to_string();
        info!("{}::inputList: value set to {}", self.name, self.input);
        self.output = config.require(&self.name, "outputList")?.to_string();
        info!("{}::outputList: value set to {}", self.name, self.output);
        self.fem_min = config.f64_or(&self.name, "fEM_min", 0.0)?;
        info!("{}::fEM_min: value set to {}", self.name, self.fem_min);
        Ok(())
    }

    fn execute(&mut self, store: &mut EventStore, engines: &mut Engines) -> OleanderResult<bool> {
        self.scratch.clear();
        {
            let tracks = store.get::<Track>(&self.input)?;
            let towers = store.get(&self.tower_key)?;

            for track in tracks {
                if track.pt == 0.0 {
                    continue;
                }
                let mut eem = 0.0;
                let mut ehad = 0.0;
                for tower in deposit_matches(track, towers) {
                    eem += tower.eem;
                    ehad += tower.ehad;
                }

                let fraction = engines.corrector.em_fraction(track, store)?;
                if fraction == UNDETERMINED {
                    continue;
                }
                let total = eem + ehad;
                eem = total * fraction;
                ehad = total * (1.0 - fraction);

                if fraction < self.fem_min {
                    continue;
                }

                self.scratch.push(Electron {
                    uid: track.uid,
                    pt: track.pt,
                    eta: track.eta,
                    phi: track.phi,
                    mass: ELECTRON_MASS,
                    charge: track.charge,
                    d0: track.d0,
                    d0_err: track.d0_err,
                    z0: track.z0,
                    z0_err: track.z0_err,
                    ehad_over_eem: if eem > 0.0 { ehad / eem } else { 999.0 },
                    gen: track.gen,
                });
            }
        }
        debug!(
            "{}: selected {} electron candidates",
            self.name,
            self.scratch.len()
        );
        let electrons: Vec<Electron> = self.scratch.drain(..).collect();
        store.put(self.output.clone(), Electron::collection(electrons))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{GenId, GenParticle, Tower};
    use crate::OleanderError;
    use approx::assert_relative_eq;

    #[test]
    fn kaon_identifier_requires_all_tables() {
        let mut module = KaonIdentifier::new("kaonId");
        module.initialize(&Config::new()).unwrap();
        let mut store = EventStore::new();
        let mut engines = Engines::default();
        assert!(matches!(
            module.execute(&mut store, &mut engines),
            Err(OleanderError::MissingKey { .. })
        ));
    }

    #[test]
    fn backward_and_barrel_kaons_are_selected_in_coverage() {
        let mut module = KaonIdentifier::new("kaonId");
        module.initialize(&Config::new()).unwrap();
        let mut store = EventStore::new();
        let mut engines = Engines::default();
        store
            .put(
                "mRICHTrack",
                Track::collection(vec![
                    Track {
                        uid: 0,
                        eta: -2.0,
                        pid: -321,
                        pt: 1.0,
                        ..Default::default()
                    },
                    // outside backward coverage
                    Track {
                        uid: 1,
                        eta: 0.0,
                        pid: 321,
                        pt: 1.0,
                        ..Default::default()
                    },
                    // covered, but not a kaon
                    Track {
                        uid: 2,
                        eta: -2.0,
                        pid: 211,
                        pt: 1.0,
                        ..Default::default()
                    },
                ]),
            )
            .unwrap();
        store
            .put(
                "barrelDIRCTrack",
                Track::collection(vec![Track {
                    uid: 3,
                    eta: 0.5,
                    pid: 321,
                    pt: 2.0,
                    ..Default::default()
                }]),
            )
            .unwrap();
        store.put("dualRICHagTrack", Track::collection(vec![])).unwrap();
        store.put("dualRICHcfTrack", Track::collection(vec![])).unwrap();
        store.put("Track", Track::collection(vec![])).unwrap();

        module.execute(&mut store, &mut engines).unwrap();
        let kaons = store.get::<Track>("ChargedKaon").unwrap();
        let uids: Vec<u32> = kaons.iter().map(|k| k.uid).collect();
        assert_eq!(uids, vec![0, 3]);
        for kaon in kaons {
            assert_relative_eq!(kaon.mass, KAON_MASS);
        }
    }

    #[test]
    fn forward_kaons_route_through_the_radiator_tables() {
        let mut module = KaonIdentifier::new("kaonId");
        module.initialize(&Config::new()).unwrap();
        let mut engines = Engines::default();
        let slow_gen = GenId(0);
        let fast_gen = GenId(1);
        let mut store = EventStore::new();
        store.put("mRICHTrack", Track::collection(vec![])).unwrap();
        store.put("barrelDIRCTrack", Track::collection(vec![])).unwrap();
        store
            .put(
                "dualRICHagTrack",
                Track::collection(vec![Track {
                    pid: 321,
                    gen: Some(slow_gen),
                    ..Default::default()
                }]),
            )
            .unwrap();
        store
            .put(
                "dualRICHcfTrack",
                Track::collection(vec![Track {
                    pid: -321,
                    gen: Some(fast_gen),
                    ..Default::default()
                }]),
            )
            .unwrap();
        store
            .put(
                "Track",
                Track::collection(vec![
                    // p = 2 cosh(2) ~ 7.5 GeV: aerogel region
                    Track {
                        uid: 0,
                        pt: 2.0,
                        eta: 2.0,
                        gen: Some(slow_gen),
                        ..Default::default()
                    },
                    // p = 10 cosh(2) ~ 37.6 GeV: gas region
                    Track {
                        uid: 1,
                        pt: 10.0,
                        eta: 2.0,
                        gen: Some(fast_gen),
                        ..Default::default()
                    },
                    // no identity match anywhere: stays unidentified
                    Track {
                        uid: 2,
                        pt: 2.0,
                        eta: 2.0,
                        gen: Some(GenId(9)),
                        ..Default::default()
                    },
                ]),
            )
            .unwrap();

        module.execute(&mut store, &mut engines).unwrap();
        let kaons = store.get::<Track>("ChargedKaon").unwrap();
        assert_eq!(kaons.len(), 2);
        assert_eq!(kaons[0].uid, 0);
        assert_eq!(kaons[0].pid, 321);
        assert_eq!(kaons[1].uid, 1);
        assert_eq!(kaons[1].pid, -321);
    }

    fn electron_store(fem_target: f64) -> (EventStore, Engines) {
        let mut store = EventStore::new();
        let gen = store.add_gen(GenParticle {
            // An untabulated species keeps the fraction deterministic.
            pid: 2212,
            ..Default::default()
        });
        store
            .put(
                "Tower",
                Tower::collection(vec![Tower {
                    eem: 10.0 * fem_target,
                    ehad: 10.0 * (1.0 - fem_target),
                    particles: vec![gen],
                    ..Default::default()
                }]),
            )
            .unwrap();
        store
            .put(
                "EFlowTrack",
                Track::collection(vec![Track {
                    uid: 0,
                    pt: 4.0,
                    charge: -1.0,
                    d0: 0.01,
                    d0_err: 0.002,
                    z0: 0.05,
                    z0_err: 0.004,
                    gen: Some(gen),
                    ..Default::default()
                }]),
            )
            .unwrap();
        (store, Engines::default())
    }

    fn electron_module(fem_min: &str) -> ElectronIdentifier {
        let mut config = Config::new();
        config.push("electronId::inputList", "EFlowTrack");
        config.push("electronId::outputList", "ChargedElectron");
        config.push("electronId::fEM_min", fem_min);
        let mut module = ElectronIdentifier::new("electronId");
        module.initialize(&config).unwrap();
        module
    }

    #[test]
    fn electron_selection_applies_fem_min() {
        let mut module = electron_module("0.85");
        let (mut store, mut engines) = electron_store(0.9);
        module.execute(&mut store, &mut engines).unwrap();
        let electrons = store.get::<Electron>("ChargedElectron").unwrap();
        assert_eq!(electrons.len(), 1);
        let electron = &electrons[0];
        assert_relative_eq!(electron.mass, ELECTRON_MASS);
        assert_eq!(electron.charge, -1.0);
        // Impact parameters come straight from the source track.
        assert_eq!(electron.d0, 0.01);
        assert_eq!(electron.z0_err, 0.004);
        assert_relative_eq!(electron.ehad_over_eem, 0.1 / 0.9, epsilon = 1e-12);
    }

    #[test]
    fn electron_selection_rejects_low_fractions() {
        let mut module = electron_module("0.85");
        let (mut store, mut engines) = electron_store(0.3);
        module.execute(&mut store, &mut engines).unwrap();
        assert!(store.get::<Electron>("ChargedElectron").unwrap().is_empty());
    }

    #[test]
    fn tracks_without_calorimeter_signal_are_skipped() {
        let mut module = electron_module("0.0");
        let (mut store, mut engines) = electron_store(0.9);
        // A second track with no deposit anywhere.
        let mut store2 = EventStore::new();
        store2
            .put("Tower", Tower::collection(vec![]))
            .unwrap();
        store2
            .put(
                "EFlowTrack",
                Track::collection(vec![Track {
                    uid: 7,
                    pt: 2.0,
                    ..Default::default()
                }]),
            )
            .unwrap();
        module.execute(&mut store2, &mut engines).unwrap();
        assert!(store2.get::<Electron>("ChargedElectron").unwrap().is_empty());
        // The populated store still selects its electron.
        module.execute(&mut store, &mut engines).unwrap();
        assert_eq!(store.get::<Electron>("ChargedElectron").unwrap().len(), 1);
    }
}
