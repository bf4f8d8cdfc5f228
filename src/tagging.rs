use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::assoc::{angular_matches, match_by_identity, DELTA_R_MATCH};
use crate::data::{Electron, GenId, Jet, Kinematics, Track};
use crate::store::EventStore;
use crate::utils::vectors::Vec3;
use crate::{OleanderError, OleanderResult};

/// Significance value reported for a kaon slot when the kaon collection is
/// present but holds no matching candidate for that rank.
pub const KAON_SIP_SENTINEL: f64 = -199.0;

/// Impact-parameter and kinematic fields of one ranked jet-associated track.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackIpSummary {
    pub pt: f64,
    pub d0: f64,
    pub d0_err: f64,
    pub z0: f64,
    pub z0_err: f64,
    /// Signed impact-parameter significance with respect to the jet axis.
    pub sip3d: f64,
    pub ip3d: f64,
    pub ip2d: f64,
}

/// Fields of one ranked jet-associated kaon candidate.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KaonSummary {
    pub pt: f64,
    pub charge: f64,
    pub sip3d: f64,
}

/// Fields of one ranked jet-associated electron candidate.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ElectronSummary {
    pub pt: f64,
    pub sip3d: f64,
}

/// The per-jet tagging record computed by [`JetTagger`].
///
/// Consumers always receive a copy; the engine retains the cached original for
/// the remainder of the event.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct JetTaggingInfo {
    /// Momentum-weighted constituent charge with exponent 0.5.
    pub jet_charge: f64,
    /// True when any sufficiently hard, nearby track has a signed
    /// impact-parameter significance above threshold.
    pub sip3d_tagged: bool,
    /// Charmed-jet indicator built from the leading kaon candidate.
    pub k_tagged: bool,
    /// Up to four leading in-cone tracks, hardest first.
    pub tracks: [TrackIpSummary; 4],
    /// Up to two leading in-cone kaon-matched tracks, hardest first.
    pub kaons: [KaonSummary; 2],
    /// Up to two leading in-cone electrons, hardest first.
    pub electrons: [ElectronSummary; 2],
}

/// Unsigned transverse impact parameter.
pub fn ip2d(track: &Track) -> f64 {
    track.d0.abs()
}

/// Unsigned three-dimensional impact parameter relative to the origin.
pub fn ip3d(track: &Track) -> f64 {
    track.d0.hypot(track.z0)
}

/// Signed three-dimensional impact-parameter significance.
///
/// The impact parameter is divided by the propagated uncertainty of its
/// components; the sign is taken from the projection of the track's
/// point-of-closest-approach displacement onto the jet axis. The longitudinal
/// coordinate is measured relative to `reference` (the beam interaction point)
/// when one is provided. A vanishing uncertainty yields zero rather than a
/// division by zero.
pub fn signed_ip3d(jet: &Jet, track: &Track, reference: Option<&Vec3>) -> f64 {
    let z0 = track.z0 - reference.map(|point| point.z).unwrap_or(0.0);
    let sigma = track.d0_err.hypot(track.z0_err);
    if sigma == 0.0 {
        return 0.0;
    }
    let displacement = Vec3::new(
        -track.d0 * track.phi.sin(),
        track.d0 * track.phi.cos(),
        z0,
    );
    let sign = if displacement.dot(&jet.p4().vec3()) >= 0.0 {
        1.0
    } else {
        -1.0
    };
    sign * track.d0.hypot(z0) / sigma
}

/// The per-event jet tagging engine.
///
/// Each jet moves from uncomputed to computed exactly once per event: the
/// first [`jet_tagging_info`](JetTagger::jet_tagging_info) call runs the full
/// computation, later calls are served from the cache until
/// [`begin_event`](JetTagger::begin_event) clears it.
#[derive(Clone, Debug)]
pub struct JetTagger {
    track_key: String,
    kaon_key: String,
    electron_key: String,
    beam_spot_key: String,
    cone: f64,
    ip_significance_min: f64,
    ip_track_pt_min: f64,
    ip_track_dr_max: f64,
    kappa: f64,
    cache: IndexMap<u32, JetTaggingInfo>,
}

impl Default for JetTagger {
    fn default() -> Self {
        Self {
            track_key: "EFlowTrack".to_string(),
            kaon_key: "ChargedKaon".to_string(),
            electron_key: "ChargedElectron".to_string(),
            beam_spot_key: "BeamSpot".to_string(),
            cone: DELTA_R_MATCH,
            ip_significance_min: 3.0,
            ip_track_pt_min: 0.25,
            ip_track_dr_max: 2.0,
            kappa: 0.5,
            cache: IndexMap::new(),
        }
    }
}

impl JetTagger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every cached record in preparation for the next event.
    pub fn begin_event(&mut self) {
        self.cache.clear();
    }

    /// The tagging record for `jet`, computed on first access this event and
    /// recalled from the cache afterwards.
    pub fn jet_tagging_info(
        &mut self,
        jet: &Jet,
        store: &EventStore,
    ) -> OleanderResult<JetTaggingInfo> {
        if let Some(cached) = self.cache.get(&jet.uid) {
            debug!("jet {} served from tagging cache", jet.uid);
            return Ok(cached.clone());
        }
        let info = self.compute(jet, store)?;
        self.cache.insert(jet.uid, info.clone());
        Ok(info)
    }

    fn compute(&self, jet: &Jet, store: &EventStore) -> OleanderResult<JetTaggingInfo> {
        let tracks = store.get::<Track>(&self.track_key)?;
        let reference = self.beam_spot(store)?;
        let reference = reference.as_ref();
        let mut info = JetTaggingInfo::default();

        // Tag decision over the full track collection; the momentum and
        // distance gates are independent of the ranking cone below.
        info.sip3d_tagged = tracks.iter().any(|track| {
            track.pt > self.ip_track_pt_min
                && jet.delta_r(track) < self.ip_track_dr_max
                && signed_ip3d(jet, track, reference) > self.ip_significance_min
        });

        let mut in_cone = angular_matches(jet, tracks, self.cone);
        in_cone.sort_by(|a, b| b.pt.total_cmp(&a.pt));
        for (slot, track) in info.tracks.iter_mut().zip(&in_cone) {
            *slot = TrackIpSummary {
                pt: track.pt,
                d0: track.d0,
                d0_err: track.d0_err,
                z0: track.z0,
                z0_err: track.z0_err,
                sip3d: signed_ip3d(jet, track, reference),
                ip3d: ip3d(track),
                ip2d: ip2d(track),
            };
        }

        let jet_pt_weight = jet.pt.powf(self.kappa);
        if jet_pt_weight > 0.0 {
            info.jet_charge = in_cone
                .iter()
                .map(|track| track.charge * track.pt.powf(self.kappa))
                .sum::<f64>()
                / jet_pt_weight;
        }

        match store.get::<Track>(&self.kaon_key) {
            Ok(kaons) => self.rank_kaons(jet, kaons, tracks, reference, &mut info),
            Err(OleanderError::MissingKey { .. }) => {}
            Err(other) => return Err(other),
        }

        match store.get::<Electron>(&self.electron_key) {
            Ok(electrons) => self.rank_electrons(jet, electrons, tracks, reference, &mut info),
            Err(OleanderError::MissingKey { .. }) => {}
            Err(other) => return Err(other),
        }

        Ok(info)
    }

    fn rank_kaons(
        &self,
        jet: &Jet,
        kaons: &[Track],
        tracks: &[Track],
        reference: Option<&Vec3>,
        info: &mut JetTaggingInfo,
    ) {
        // Kaon candidates are re-located in the primary track collection by
        // identity before the angular gate is applied.
        let mut kaon_tracks: Vec<&Track> = Vec::new();
        for kaon in kaons {
            let Some(matched) = match_by_identity(kaon, tracks) else {
                continue;
            };
            if jet.delta_r(matched) < self.cone {
                kaon_tracks.push(matched);
            }
        }
        kaon_tracks.sort_by(|a, b| b.pt.total_cmp(&a.pt));

        info.kaons = [KaonSummary {
            pt: 0.0,
            charge: 0.0,
            sip3d: KAON_SIP_SENTINEL,
        }; 2];
        for (slot, track) in info.kaons.iter_mut().zip(&kaon_tracks) {
            *slot = KaonSummary {
                pt: track.pt,
                charge: track.charge,
                sip3d: signed_ip3d(jet, track, reference),
            };
        }

        info.k_tagged = kaon_tracks
            .first()
            .map(|leading| {
                let pt_ratio = leading.pt / jet.pt;
                let sip3d = signed_ip3d(jet, leading, reference);
                (0.1 < pt_ratio && pt_ratio < 0.4) && sip3d.abs() > 4.0 && leading.charge > 0.0
            })
            .unwrap_or(false);
    }

    fn rank_electrons(
        &self,
        jet: &Jet,
        electrons: &[Electron],
        tracks: &[Track],
        reference: Option<&Vec3>,
        info: &mut JetTaggingInfo,
    ) {
        let mut in_cone = angular_matches(jet, electrons, self.cone);
        in_cone.sort_by(|a, b| b.pt.total_cmp(&a.pt));
        for (slot, electron) in info.electrons.iter_mut().zip(&in_cone) {
            slot.pt = electron.pt;
            // The significance comes from the corresponding primary track,
            // found by identity; an unmatched electron leaves it at zero.
            if let Some(matched) = match_by_identity(*electron, tracks) {
                slot.sip3d = signed_ip3d(jet, matched, reference);
            }
        }
    }

    fn beam_spot(&self, store: &EventStore) -> OleanderResult<Option<Vec3>> {
        match store.get::<GenId>(&self.beam_spot_key) {
            Ok(ids) => Ok(ids
                .first()
                .and_then(|id| store.gen(*id))
                .map(|particle| particle.position)),
            Err(OleanderError::MissingKey { .. }) => Ok(None),
            Err(other) => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CandidateKind, GenParticle};
    use approx::assert_relative_eq;

    fn jet() -> Jet {
        Jet {
            uid: 100,
            pt: 20.0,
            eta: 0.0,
            phi: 0.0,
            mass: 5.0,
            ..Default::default()
        }
    }

    fn cone_track(uid: u32, pt: f64) -> Track {
        Track {
            uid,
            pt,
            eta: 0.1,
            phi: 0.1,
            charge: 1.0,
            d0: 0.01,
            d0_err: 0.005,
            z0: 0.02,
            z0_err: 0.005,
            ..Default::default()
        }
    }

    fn store_with_tracks(tracks: Vec<Track>) -> EventStore {
        let mut store = EventStore::new();
        store.put("EFlowTrack", Track::collection(tracks)).unwrap();
        store
    }

    #[test]
    fn leading_tracks_are_ranked_by_pt() {
        let store = store_with_tracks(vec![
            cone_track(0, 3.0),
            cone_track(1, 10.0),
            cone_track(2, 1.0),
            cone_track(3, 7.0),
            // outside the ranking cone
            Track {
                uid: 4,
                pt: 50.0,
                eta: 3.0,
                ..Default::default()
            },
        ]);
        let mut tagger = JetTagger::new();
        let info = tagger.jet_tagging_info(&jet(), &store).unwrap();
        assert_eq!(info.tracks[0].pt, 10.0);
        assert_eq!(info.tracks[1].pt, 7.0);
        assert_eq!(info.tracks[2].pt, 3.0);
        assert_eq!(info.tracks[3].pt, 1.0);
        // No kaon or electron collections were supplied, so those fields stay
        // at their defaults.
        assert_eq!(info.kaons, [KaonSummary::default(); 2]);
        assert_eq!(info.electrons, [ElectronSummary::default(); 2]);
        assert!(!info.k_tagged);
    }

    #[test]
    fn ranking_tie_break_is_input_order() {
        let mut first = cone_track(0, 5.0);
        first.d0 = 0.111;
        let mut second = cone_track(1, 5.0);
        second.d0 = 0.222;
        let store = store_with_tracks(vec![first, second]);
        let mut tagger = JetTagger::new();
        let info = tagger.jet_tagging_info(&jet(), &store).unwrap();
        assert_eq!(info.tracks[0].d0, 0.111);
        assert_eq!(info.tracks[1].d0, 0.222);
    }

    #[test]
    fn cache_is_idempotent_and_cleared_by_begin_event() {
        let store = store_with_tracks(vec![cone_track(0, 10.0)]);
        let mut tagger = JetTagger::new();
        let first = tagger.jet_tagging_info(&jet(), &store).unwrap();
        let second = tagger.jet_tagging_info(&jet(), &store).unwrap();
        assert_eq!(first, second);

        // After the event boundary the record is rebuilt from the new store.
        tagger.begin_event();
        let store = store_with_tracks(vec![cone_track(0, 4.0)]);
        let third = tagger.jet_tagging_info(&jet(), &store).unwrap();
        assert_eq!(third.tracks[0].pt, 4.0);
        assert_ne!(first, third);
    }

    #[test]
    fn missing_track_collection_is_fatal() {
        let store = EventStore::new();
        let mut tagger = JetTagger::new();
        assert!(matches!(
            tagger.jet_tagging_info(&jet(), &store),
            Err(OleanderError::MissingKey { .. })
        ));
    }

    #[test]
    fn jet_charge_is_momentum_weighted() {
        let mut positive = cone_track(0, 16.0);
        positive.charge = 1.0;
        let mut negative = cone_track(1, 4.0);
        negative.charge = -1.0;
        let store = store_with_tracks(vec![positive, negative]);
        let mut tagger = JetTagger::new();
        let info = tagger.jet_tagging_info(&jet(), &store).unwrap();
        // (1 * 16^0.5 - 1 * 4^0.5) / 20^0.5
        assert_relative_eq!(info.jet_charge, 2.0 / 20.0_f64.sqrt());
    }

    #[test]
    fn signed_ip3d_sign_follows_jet_axis() {
        let jet = jet();
        // phi = 0 jet axis along +x; displacement (-d0 sin phi, d0 cos phi, z0)
        // with track phi = pi/2 points along -x for positive d0.
        let mut track = cone_track(0, 5.0);
        track.phi = std::f64::consts::FRAC_PI_2;
        track.d0 = 0.02;
        track.z0 = 0.0;
        assert!(signed_ip3d(&jet, &track, None) < 0.0);
        track.d0 = -0.02;
        assert!(signed_ip3d(&jet, &track, None) > 0.0);
    }

    #[test]
    fn signed_ip3d_uses_beam_spot_reference() {
        let jet = jet();
        let mut track = cone_track(0, 5.0);
        track.d0 = 0.0;
        track.z0 = 1.0;
        track.d0_err = 0.1;
        track.z0_err = 0.0;
        let beam_spot = Vec3::new(0.0, 0.0, 1.0);
        // Relative to the beam spot the longitudinal displacement vanishes.
        assert_relative_eq!(signed_ip3d(&jet, &track, Some(&beam_spot)), 0.0);
        assert_relative_eq!(signed_ip3d(&jet, &track, None).abs(), 10.0);
    }

    #[test]
    fn zero_uncertainty_yields_zero_significance() {
        let mut track = cone_track(0, 5.0);
        track.d0_err = 0.0;
        track.z0_err = 0.0;
        assert_eq!(signed_ip3d(&jet(), &track, None), 0.0);
    }

    #[test]
    fn sip3d_tag_requires_all_gates() {
        // Negative d0 at this phi puts the displacement along the jet axis,
        // so the signed significance comes out positive.
        let displaced = |pt: f64, eta: f64| Track {
            pt,
            eta,
            phi: 0.1,
            d0: -0.5,
            z0: 0.1,
            d0_err: 0.01,
            z0_err: 0.01,
            charge: 1.0,
            ..Default::default()
        };
        let mut tagger = JetTagger::new();

        // Hard, nearby, displaced: tagged.
        let store = store_with_tracks(vec![displaced(1.0, 0.1)]);
        assert!(tagger.jet_tagging_info(&jet(), &store).unwrap().sip3d_tagged);

        // Too soft.
        tagger.begin_event();
        let store = store_with_tracks(vec![displaced(0.2, 0.1)]);
        assert!(!tagger.jet_tagging_info(&jet(), &store).unwrap().sip3d_tagged);

        // Too far from the jet axis.
        tagger.begin_event();
        let store = store_with_tracks(vec![displaced(1.0, 2.5)]);
        assert!(!tagger.jet_tagging_info(&jet(), &store).unwrap().sip3d_tagged);
    }

    #[test]
    fn kaon_ranking_and_tag() {
        let gen_kaon = GenId(0);
        let mut store = EventStore::new();
        // The primary track matched to the kaon candidate by identity.
        let mut primary = cone_track(0, 5.0);
        primary.gen = Some(gen_kaon);
        primary.charge = 1.0;
        primary.d0 = 0.9;
        primary.z0 = 0.1;
        primary.d0_err = 0.01;
        primary.z0_err = 0.01;
        store
            .put(
                "EFlowTrack",
                Track::collection(vec![primary, cone_track(1, 2.0)]),
            )
            .unwrap();
        // The kaon list entry carries the kaon mass but the same identity.
        store
            .put(
                "ChargedKaon",
                Track::collection(vec![Track {
                    uid: 10,
                    pt: 5.0,
                    mass: 0.493677,
                    gen: Some(gen_kaon),
                    ..Default::default()
                }]),
            )
            .unwrap();
        let mut tagger = JetTagger::new();
        let info = tagger.jet_tagging_info(&jet(), &store).unwrap();

        // pt ratio 5/20 = 0.25, |sIP3D| > 4, positive charge: tagged.
        assert!(info.k_tagged);
        assert_eq!(info.kaons[0].pt, 5.0);
        assert_eq!(info.kaons[0].charge, 1.0);
        // Only one kaon matched: the second slot keeps the sentinel.
        assert_eq!(info.kaons[1].sip3d, KAON_SIP_SENTINEL);
        assert_eq!(info.kaons[1].pt, 0.0);
    }

    #[test]
    fn kaon_collection_present_but_empty_keeps_sentinels() {
        let mut store = store_with_tracks(vec![cone_track(0, 5.0)]);
        store.put("ChargedKaon", Track::collection(vec![])).unwrap();
        let mut tagger = JetTagger::new();
        let info = tagger.jet_tagging_info(&jet(), &store).unwrap();
        assert_eq!(info.kaons[0].sip3d, KAON_SIP_SENTINEL);
        assert_eq!(info.kaons[1].sip3d, KAON_SIP_SENTINEL);
        assert!(!info.k_tagged);
    }

    #[test]
    fn electron_significance_comes_from_matched_track() {
        let gen_electron = GenId(0);
        let mut store = EventStore::new();
        let mut primary = cone_track(0, 8.0);
        primary.gen = Some(gen_electron);
        primary.d0 = 0.3;
        primary.z0 = 0.0;
        primary.d0_err = 0.01;
        primary.z0_err = 0.0;
        store
            .put("EFlowTrack", Track::collection(vec![primary.clone()]))
            .unwrap();
        store
            .put(
                "ChargedElectron",
                Electron::collection(vec![Electron {
                    uid: 20,
                    pt: 8.0,
                    eta: 0.1,
                    phi: 0.1,
                    gen: Some(gen_electron),
                    ..Default::default()
                }]),
            )
            .unwrap();
        let mut tagger = JetTagger::new();
        let info = tagger.jet_tagging_info(&jet(), &store).unwrap();
        assert_eq!(info.electrons[0].pt, 8.0);
        let expected = signed_ip3d(&jet(), &primary, None);
        assert_relative_eq!(info.electrons[0].sip3d, expected);
        assert!(expected.abs() > 0.0);
    }

    #[test]
    fn beam_spot_reference_is_read_from_the_store() {
        let mut store = EventStore::new();
        let beam_spot = store.add_gen(GenParticle {
            position: Vec3::new(0.0, 0.0, 0.5),
            ..Default::default()
        });
        store.put("BeamSpot", GenId::collection(vec![beam_spot])).unwrap();
        let mut track = cone_track(0, 5.0);
        track.d0 = 0.0;
        track.z0 = 0.5;
        track.d0_err = 0.05;
        track.z0_err = 0.0;
        store.put("EFlowTrack", Track::collection(vec![track])).unwrap();
        let mut tagger = JetTagger::new();
        let info = tagger.jet_tagging_info(&jet(), &store).unwrap();
        // The longitudinal offset is fully absorbed by the beam-spot reference.
        assert_relative_eq!(info.tracks[0].sip3d, 0.0);
    }
}
