//! `oleander` is a library for modular analysis of collider-detector event
//! records. An event's reconstructed candidates (tracks, jets, calorimeter
//! towers, leptons) flow through a configurable sequence of analysis modules
//! which refine, reclassify, and annotate them, with all intermediate
//! collections exchanged through a typed, event-scoped store.
//!
//! # Key pieces
//! * [`EventStore`]: a write-once, kind-checked mapping from collection name
//!   to candidate collection, valid for exactly one event.
//! * [`Refiner`](refine::Refiner): a generic selection stage applying
//!   configured attribute windows ([`Attribute`]) and writing the surviving
//!   clones under a new name.
//! * [`assoc`]: angular ([`delta_r`](data::Kinematics::delta_r)-based) and
//!   identity-based matching between candidate collections, including the
//!   region-dependent particle-identification routing.
//! * [`JetTagger`]: per-jet impact-parameter statistics, kaon/electron
//!   ranking, jet charge, and tag decisions, cached per event.
//! * [`CaloEnergyCorrector`]: cached electromagnetic-energy fractions with a
//!   rejection-sampled override from per-species, per-region response tables.
//! * [`Pipeline`](pipeline::Pipeline): the synchronous driver owning the
//!   module sequence and the injected engines.
//!
//! Event ingestion, configuration-file parsing, and output serialization are
//! external collaborators: ingestion fills the [`EventStore`] between
//! [`Pipeline::begin_event`](pipeline::Pipeline::begin_event) and
//! [`Pipeline::run`](pipeline::Pipeline::run), and serialization pulls named
//! collections and the engines' derived records afterwards.
#![warn(clippy::perf, clippy::style)]

use thiserror::Error;

/// Geometric and identity-based matching between candidate collections.
pub mod assoc;
/// Cached calorimeter electromagnetic-fraction correction.
pub mod calo;
/// The configuration lookup surface and the selector mini-grammar.
pub mod config;
/// Candidate types, the generator-particle arena, and candidate collections.
pub mod data;
/// Kaon and electron identification modules.
pub mod pid;
/// The module trait and the synchronous pipeline driver.
pub mod pipeline;
/// The generic candidate refinement engine.
pub mod refine;
/// The attribute selectors used by refinement stages.
pub mod selectors;
/// The event-scoped heterogeneous store.
pub mod store;
/// Per-jet tagging statistics and decisions.
pub mod tagging;
/// Utility enums and vector kinematics.
pub mod utils;

pub use crate::calo::{CaloEnergyCorrector, EmFractionTables, PdfTable};
pub use crate::config::{Config, Range, SelectorSpec};
pub use crate::data::{
    Collection, Electron, GenId, GenParticle, Jet, Kind, Muon, Photon, Tower, Track,
};
pub use crate::pipeline::{AnalysisModule, Engines, Pipeline};
pub use crate::selectors::Attribute;
pub use crate::store::EventStore;
pub use crate::tagging::{JetTagger, JetTaggingInfo};
pub use crate::utils::enums::{EtaRegion, Species};
pub use crate::utils::vectors::{Vec3, Vec4};

/// Useful traits for all crate structs
pub mod traits {
    pub use crate::data::{CandidateKind, GenMatched, HasCharge, Kinematics};
    pub use crate::pipeline::AnalysisModule;
}

pub type OleanderResult<T> = Result<T, OleanderError>;

/// The error type used by all `oleander` internal methods
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OleanderError {
    /// A required collection is absent from the event store.
    #[error("no collection named \"{key}\" exists in the event store")]
    MissingKey {
        /// The requested collection name
        key: String,
    },
    /// An attempt to overwrite an existing event store entry.
    #[error("a collection named \"{key}\" already exists in the event store")]
    DuplicateKey {
        /// The offending collection name
        key: String,
    },
    /// A stored collection holds a different candidate kind than requested.
    #[error("collection \"{key}\" holds {found} candidates, but {expected} was requested")]
    TypeMismatch {
        /// The requested collection name
        key: String,
        /// The kind the caller asked for
        expected: crate::data::Kind,
        /// The kind fixed when the collection was stored
        found: crate::data::Kind,
    },
    /// A module was configured without one of its required parameters.
    #[error("required parameter \"{module}::{name}\" is not specified")]
    MissingParameter {
        /// The module instance name
        module: String,
        /// The missing parameter
        name: String,
    },
    /// An error which occurs when the user tries to parse an invalid string of
    /// text, typically into an enum variant or a selector specification.
    #[error("failed to parse string: \"{name}\" does not correspond to a valid \"{object}\"!")]
    ParseError {
        /// The string which was parsed
        name: String,
        /// The name of the object it failed to parse into
        object: String,
    },
    /// A probability table with no positive content, which would make
    /// rejection sampling loop forever.
    #[error("probability table \"{name}\" has no positive bin content")]
    DegenerateTable {
        /// The table's name
        name: String,
    },
    /// A module class name that no pipeline constructor recognizes.
    #[error("the requested module class \"{class}\" is not known to the pipeline")]
    UnknownModule {
        /// The requested class name
        class: String,
    },
}
