use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::utils::vectors::{wrap_delta_phi, Vec3, Vec4};

/// A handle into the per-event [`GenArena`], used as a weak back-reference from
/// reconstructed candidates to the generator-level particle they originate from.
///
/// Handles are compared by equality and are only meaningful within the event
/// that produced them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenId(pub usize);

/// A generator-level particle owned by the per-event [`GenArena`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GenParticle {
    /// PDG identification code.
    pub pid: i32,
    pub charge: f64,
    pub p4: Vec4,
    /// Production vertex position.
    pub position: Vec3,
}

/// Arena ownership of all generator-level particles for the current event.
///
/// Candidates refer into the arena through [`GenId`] handles; the arena is
/// cleared at the event boundary, which invalidates every outstanding handle.
#[derive(Clone, Debug, Default)]
pub struct GenArena {
    particles: Vec<GenParticle>,
}

impl GenArena {
    pub fn insert(&mut self, particle: GenParticle) -> GenId {
        self.particles.push(particle);
        GenId(self.particles.len() - 1)
    }

    pub fn get(&self, id: GenId) -> Option<&GenParticle> {
        self.particles.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }
}

/// Kinematic accessors shared by every candidate kind.
pub trait Kinematics {
    /// Transverse momentum.
    fn pt(&self) -> f64;
    /// Pseudorapidity.
    fn eta(&self) -> f64;
    /// Azimuthal angle.
    fn phi(&self) -> f64;
    /// Invariant mass assigned to the candidate.
    fn mass(&self) -> f64;

    /// The candidate's four-momentum, rebuilt from its stored kinematics.
    fn p4(&self) -> Vec4 {
        Vec4::from_pt_eta_phi_m(self.pt(), self.eta(), self.phi(), self.mass())
    }

    /// Angular distance to another candidate in pseudorapidity-azimuth space.
    fn delta_r<O: Kinematics + ?Sized>(&self, other: &O) -> f64
    where
        Self: Sized,
    {
        let deta = self.eta() - other.eta();
        let dphi = wrap_delta_phi(self.phi() - other.phi());
        deta.hypot(dphi)
    }
}

/// Electric charge of a candidate. Chargeless kinds report zero.
pub trait HasCharge {
    fn charge(&self) -> f64;
}

/// Access to the weak back-reference a candidate carries to its originating
/// generator-level particle. Absence means the candidate was never matched.
pub trait GenMatched {
    fn gen_id(&self) -> Option<GenId>;
}

/// A reconstructed charged-particle track.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Per-event candidate identity; clones of the same logical candidate share it.
    pub uid: u32,
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
    pub mass: f64,
    pub charge: f64,
    /// Reconstructed PDG identification code, 0 when unidentified.
    pub pid: i32,
    /// Transverse impact parameter and its uncertainty.
    pub d0: f64,
    pub d0_err: f64,
    /// Longitudinal impact parameter and its uncertainty.
    pub z0: f64,
    pub z0_err: f64,
    pub gen: Option<GenId>,
}

/// A reconstructed jet.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Jet {
    pub uid: u32,
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
    pub mass: f64,
    pub charge: f64,
}

/// A reconstructed photon (or other neutral electromagnetic candidate).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Photon {
    pub uid: u32,
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
}

/// An identified electron candidate.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Electron {
    pub uid: u32,
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
    pub mass: f64,
    pub charge: f64,
    pub d0: f64,
    pub d0_err: f64,
    pub z0: f64,
    pub z0_err: f64,
    /// Ratio of hadronic to electromagnetic calorimeter energy; 999.0 when the
    /// electromagnetic deposit is zero.
    pub ehad_over_eem: f64,
    pub gen: Option<GenId>,
}

/// An identified muon candidate.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Muon {
    pub uid: u32,
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
    pub mass: f64,
    pub charge: f64,
    pub gen: Option<GenId>,
}

/// A calorimeter tower: scalar electromagnetic and hadronic energy sums plus
/// back-references to every generator-level particle that deposited into it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Tower {
    pub uid: u32,
    pub eta: f64,
    pub phi: f64,
    /// Electromagnetic energy sum.
    pub eem: f64,
    /// Hadronic energy sum.
    pub ehad: f64,
    pub particles: Vec<GenId>,
}

impl Tower {
    /// Total deposited energy.
    pub fn energy(&self) -> f64 {
        self.eem + self.ehad
    }
}

macro_rules! impl_kinematics {
    ($t:ty) => {
        impl Kinematics for $t {
            fn pt(&self) -> f64 {
                self.pt
            }
            fn eta(&self) -> f64 {
                self.eta
            }
            fn phi(&self) -> f64 {
                self.phi
            }
            fn mass(&self) -> f64 {
                self.mass
            }
        }
    };
}

impl_kinematics!(Track);
impl_kinematics!(Jet);
impl_kinematics!(Electron);
impl_kinematics!(Muon);

impl Kinematics for Photon {
    fn pt(&self) -> f64 {
        self.pt
    }
    fn eta(&self) -> f64 {
        self.eta
    }
    fn phi(&self) -> f64 {
        self.phi
    }
    fn mass(&self) -> f64 {
        0.0
    }
}

impl Kinematics for Tower {
    // Towers are treated as massless deposits at their (eta, phi) position.
    fn pt(&self) -> f64 {
        self.energy() / self.eta.cosh()
    }
    fn eta(&self) -> f64 {
        self.eta
    }
    fn phi(&self) -> f64 {
        self.phi
    }
    fn mass(&self) -> f64 {
        0.0
    }
}

impl HasCharge for Track {
    fn charge(&self) -> f64 {
        self.charge
    }
}

impl HasCharge for Jet {
    fn charge(&self) -> f64 {
        self.charge
    }
}

impl HasCharge for Electron {
    fn charge(&self) -> f64 {
        self.charge
    }
}

impl HasCharge for Muon {
    fn charge(&self) -> f64 {
        self.charge
    }
}

impl HasCharge for Photon {
    fn charge(&self) -> f64 {
        0.0
    }
}

impl GenMatched for Track {
    fn gen_id(&self) -> Option<GenId> {
        self.gen
    }
}

impl GenMatched for Electron {
    fn gen_id(&self) -> Option<GenId> {
        self.gen
    }
}

impl GenMatched for Muon {
    fn gen_id(&self) -> Option<GenId> {
        self.gen
    }
}

/// The concrete kind of a stored candidate collection, fixed once at
/// population time.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Kind {
    Track,
    Jet,
    Photon,
    Electron,
    Muon,
    Tower,
    GenRef,
}

impl Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Kind::Track => write!(f, "Track"),
            Kind::Jet => write!(f, "Jet"),
            Kind::Photon => write!(f, "Photon"),
            Kind::Electron => write!(f, "Electron"),
            Kind::Muon => write!(f, "Muon"),
            Kind::Tower => write!(f, "Tower"),
            Kind::GenRef => write!(f, "GenRef"),
        }
    }
}

/// An insertion-ordered candidate collection tagged with its concrete kind.
///
/// This is the value type of the event store: one variant per candidate kind,
/// with the discriminant checked exactly once at retrieval.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Collection {
    Tracks(Vec<Track>),
    Jets(Vec<Jet>),
    Photons(Vec<Photon>),
    Electrons(Vec<Electron>),
    Muons(Vec<Muon>),
    Towers(Vec<Tower>),
    /// Handles to generator-level particles in the arena (e.g. the beam spot).
    GenRefs(Vec<GenId>),
}

impl Collection {
    pub fn kind(&self) -> Kind {
        match self {
            Collection::Tracks(_) => Kind::Track,
            Collection::Jets(_) => Kind::Jet,
            Collection::Photons(_) => Kind::Photon,
            Collection::Electrons(_) => Kind::Electron,
            Collection::Muons(_) => Kind::Muon,
            Collection::Towers(_) => Kind::Tower,
            Collection::GenRefs(_) => Kind::GenRef,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Collection::Tracks(v) => v.len(),
            Collection::Jets(v) => v.len(),
            Collection::Photons(v) => v.len(),
            Collection::Electrons(v) => v.len(),
            Collection::Muons(v) => v.len(),
            Collection::Towers(v) => v.len(),
            Collection::GenRefs(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Implemented by every concrete candidate kind so that generic engines can
/// wrap and unwrap [`Collection`]s without runtime casts.
pub trait CandidateKind: Clone {
    const KIND: Kind;

    /// Wrap a vector of candidates in the matching [`Collection`] variant.
    fn collection(items: Vec<Self>) -> Collection;

    /// View a [`Collection`] as a slice of this kind, or `None` on a
    /// discriminant mismatch.
    fn slice(collection: &Collection) -> Option<&[Self]>;
}

macro_rules! impl_candidate_kind {
    ($t:ty, $kind:expr, $variant:ident) => {
        impl CandidateKind for $t {
            const KIND: Kind = $kind;

            fn collection(items: Vec<Self>) -> Collection {
                Collection::$variant(items)
            }

            fn slice(collection: &Collection) -> Option<&[Self]> {
                match collection {
                    Collection::$variant(items) => Some(items),
                    _ => None,
                }
            }
        }
    };
}

impl_candidate_kind!(Track, Kind::Track, Tracks);
impl_candidate_kind!(Jet, Kind::Jet, Jets);
impl_candidate_kind!(Photon, Kind::Photon, Photons);
impl_candidate_kind!(Electron, Kind::Electron, Electrons);
impl_candidate_kind!(Muon, Kind::Muon, Muons);
impl_candidate_kind!(Tower, Kind::Tower, Towers);
impl_candidate_kind!(GenId, Kind::GenRef, GenRefs);
