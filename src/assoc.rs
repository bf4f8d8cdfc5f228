use crate::data::{GenMatched, Kinematics, Tower, Track};

/// Angular-distance threshold below which a track and a calorimeter tower (or
/// another candidate) are considered associated.
pub const DELTA_R_MATCH: f64 = 0.5;

/// Pseudorapidity coverage of the backward particle-identification detector.
pub const BACKWARD_ETA: (f64, f64) = (-3.5, -1.0);
/// Pseudorapidity coverage of the barrel particle-identification detector.
pub const BARREL_ETA: (f64, f64) = (-1.0, 1.0);
/// Pseudorapidity coverage of the forward particle-identification detector.
pub const FORWARD_ETA: (f64, f64) = (1.0, 3.5);
/// Momentum below which the forward detector's aerogel radiator is sensitive;
/// above it the gas radiator takes over.
pub const AEROGEL_MOMENTUM_MAX: f64 = 12.0;

/// All candidates in `collection` within `max_dr` of `seed` in
/// pseudorapidity-azimuth space, in collection order.
///
/// There is no cap on the number of matches; aggregating over them (e.g.
/// summing tower energies) is the caller's responsibility.
pub fn angular_matches<'a, S, T>(seed: &S, collection: &'a [T], max_dr: f64) -> Vec<&'a T>
where
    S: Kinematics,
    T: Kinematics,
{
    collection
        .iter()
        .filter(|candidate| seed.delta_r(*candidate) < max_dr)
        .collect()
}

/// The first candidate in `collection` whose generator back-reference is
/// present and equal to `probe`'s.
///
/// Absence of the back-reference on either side means "no match". Ties are
/// broken by collection order, not by angular proximity.
pub fn match_by_identity<'a, A, B>(probe: &A, collection: &'a [B]) -> Option<&'a B>
where
    A: GenMatched,
    B: GenMatched,
{
    let probe_id = probe.gen_id()?;
    collection
        .iter()
        .find(|candidate| candidate.gen_id() == Some(probe_id))
}

/// All towers whose deposit list contains the track's generator
/// back-reference, in collection order.
pub fn deposit_matches<'a>(track: &impl GenMatched, towers: &'a [Tower]) -> Vec<&'a Tower> {
    match track.gen_id() {
        Some(id) => towers
            .iter()
            .filter(|tower| tower.particles.contains(&id))
            .collect(),
        None => Vec::new(),
    }
}

/// The two alternative sub-detector track tables covering the forward region.
pub struct ForwardPidTables<'a> {
    /// Tracks identified by the aerogel radiator (momenta below
    /// [`AEROGEL_MOMENTUM_MAX`]).
    pub aerogel: &'a [Track],
    /// Tracks identified by the gas radiator.
    pub gas: &'a [Track],
}

/// Assign an identification code to a forward-going track by routing it into
/// the radiator table covering its momentum and searching that table for an
/// identity match. Returns 0 ("no identification") when nothing matches.
pub fn forward_pid(track: &Track, tables: &ForwardPidTables) -> i32 {
    let momentum = track.p4().vec3().mag();
    let table = if momentum < AEROGEL_MOMENTUM_MAX {
        tables.aerogel
    } else {
        tables.gas
    };
    match_by_identity(track, table)
        .map(|matched| matched.pid)
        .unwrap_or(0)
}
