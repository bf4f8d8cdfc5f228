use indexmap::IndexMap;
use log::debug;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::assoc::deposit_matches;
use crate::data::{GenMatched, Track};
use crate::store::EventStore;
use crate::utils::enums::{EtaRegion, Species};
use crate::{OleanderError, OleanderResult};

/// Sentinel electromagnetic fraction for tracks without any matched
/// calorimeter energy.
pub const UNDETERMINED: f64 = -1.0;

/// A binned probability density over the unit interval, used as the sampling
/// envelope for corrected electromagnetic fractions.
///
/// Construction validates that the table has at least one strictly positive
/// bin; a degenerate table would otherwise turn the rejection sampler into an
/// infinite loop.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PdfTable {
    name: String,
    bins: Vec<f64>,
    max: f64,
}

impl PdfTable {
    pub fn new<S: Into<String>>(name: S, bins: Vec<f64>) -> OleanderResult<Self> {
        let name = name.into();
        let max = bins.iter().fold(0.0_f64, |acc, &b| acc.max(b));
        if bins.is_empty() || !(max > 0.0) {
            return Err(OleanderError::DegenerateTable { name });
        }
        Ok(Self { name, bins, max })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The largest bin content, strictly positive by construction.
    pub fn max(&self) -> f64 {
        self.max
    }

    /// The density at `x`, looked up in the bin covering `x`. Out-of-range
    /// arguments read the boundary bins.
    pub fn density(&self, x: f64) -> f64 {
        let index = ((x * self.bins.len() as f64) as isize)
            .clamp(0, self.bins.len() as isize - 1) as usize;
        self.bins[index]
    }
}

/// The full set of response tables consumed by the corrector: one per
/// tabulated species and pseudorapidity region.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmFractionTables {
    electron: [PdfTable; 3],
    pion: [PdfTable; 3],
}

impl EmFractionTables {
    /// Assemble the six tables, ordered backward, barrel, forward within each
    /// species.
    pub fn new(electron: [PdfTable; 3], pion: [PdfTable; 3]) -> Self {
        Self { electron, pion }
    }

    pub fn get(&self, species: Species, region: EtaRegion) -> &PdfTable {
        let tables = match species {
            Species::Electron => &self.electron,
            Species::ChargedPion => &self.pion,
        };
        match region {
            EtaRegion::Backward => &tables[0],
            EtaRegion::Barrel => &tables[1],
            EtaRegion::Forward => &tables[2],
        }
    }
}

/// Computes and caches a per-track electromagnetic energy fraction for the
/// current event.
///
/// The first estimate is the ratio of matched-tower electromagnetic energy to
/// total matched energy. For tracks whose generator particle is an electron
/// or charged pion and whose response tables are configured, that estimate is
/// replaced by a rejection-sampled draw from the table covering the track's
/// species and pseudorapidity region.
#[derive(Clone, Debug)]
pub struct CaloEnergyCorrector {
    tower_key: String,
    tables: Option<EmFractionTables>,
    rng: ChaCha8Rng,
    cache: IndexMap<u32, f64>,
}

impl Default for CaloEnergyCorrector {
    fn default() -> Self {
        Self {
            tower_key: "Tower".to_string(),
            tables: None,
            rng: ChaCha8Rng::from_entropy(),
            cache: IndexMap::new(),
        }
    }
}

impl CaloEnergyCorrector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the species/region response tables enabling the sampling
    /// override.
    pub fn with_tables(mut self, tables: EmFractionTables) -> Self {
        self.tables = Some(tables);
        self
    }

    /// Seed the sampler for reproducible draws.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self
    }

    /// Drop all cached fractions in preparation for the next event.
    pub fn begin_event(&mut self) {
        self.cache.clear();
    }

    /// The electromagnetic fraction for `track`, computed on first access this
    /// event and recalled from the cache afterwards. Returns
    /// [`UNDETERMINED`] when no matched tower carries any energy.
    pub fn em_fraction(&mut self, track: &Track, store: &EventStore) -> OleanderResult<f64> {
        if let Some(&cached) = self.cache.get(&track.uid) {
            return Ok(cached);
        }
        let towers = store.get(&self.tower_key)?;
        let matched = deposit_matches(track, towers);
        let mut eem = 0.0;
        let mut ehad = 0.0;
        for tower in matched {
            eem += tower.eem;
            ehad += tower.ehad;
        }

        let mut fraction = if eem + ehad > 0.0 {
            eem / (eem + ehad)
        } else {
            UNDETERMINED
        };

        if fraction >= 0.0 {
            let species = track
                .gen_id()
                .and_then(|id| store.gen(id))
                .and_then(|particle| Species::from_pid(particle.pid));
            if let (Some(species), Some(tables)) = (species, &self.tables) {
                let region = EtaRegion::from_eta(track.eta);
                let table = tables.get(species, region);
                fraction = Self::draw(&mut self.rng, table);
                debug!(
                    "track {}: em fraction overridden from table {}",
                    track.uid,
                    table.name()
                );
            }
        }

        self.cache.insert(track.uid, fraction);
        Ok(fraction)
    }

    // Accept-reject sampling against the table's density. Termination is
    // almost sure because the table maximum is strictly positive.
    fn draw(rng: &mut ChaCha8Rng, table: &PdfTable) -> f64 {
        loop {
            let x: f64 = rng.gen_range(0.0..1.0);
            let y: f64 = rng.gen_range(0.0..table.max());
            if table.density(x) > y {
                return x;
            }
        }
    }
}
