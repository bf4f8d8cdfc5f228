use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::config::Range;
use crate::data::{HasCharge, Kinematics};
use crate::OleanderError;

/// The scalar candidate attributes a refinement can select on.
///
/// Each selector is a pure predicate: it reads one attribute of the candidate
/// and tests membership in the configured [`Range`]. Charge selection relies
/// on [`HasCharge`], under which chargeless kinds report zero, so a photon
/// survives a `Q` cut exactly when the range contains zero.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Attribute {
    /// Transverse momentum, configured as `PT`.
    Pt,
    /// Pseudorapidity, configured as `Eta`.
    Eta,
    /// Azimuthal angle, configured as `Phi`.
    Phi,
    /// Signed electric charge, configured as `Q`.
    Charge,
}

impl Attribute {
    /// Test one candidate attribute against a selection window.
    pub fn test<T: Kinematics + HasCharge>(&self, candidate: &T, range: &Range) -> bool {
        match self {
            Attribute::Pt => range.contains(candidate.pt()),
            Attribute::Eta => range.contains(candidate.eta()),
            Attribute::Phi => range.contains(candidate.phi()),
            Attribute::Charge => range.contains(candidate.charge()),
        }
    }
}

impl Display for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Attribute::Pt => write!(f, "PT"),
            Attribute::Eta => write!(f, "Eta"),
            Attribute::Phi => write!(f, "Phi"),
            Attribute::Charge => write!(f, "Q"),
        }
    }
}

impl FromStr for Attribute {
    type Err = OleanderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PT" => Ok(Self::Pt),
            "Eta" => Ok(Self::Eta),
            "Phi" => Ok(Self::Phi),
            "Q" => Ok(Self::Charge),
            _ => Err(OleanderError::ParseError {
                name: s.to_string(),
                object: "Attribute".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Photon, Track};

    #[test]
    fn pt_selector_window() {
        let track = Track {
            pt: 10.0,
            ..Default::default()
        };
        assert!(Attribute::Pt.test(&track, &Range::new(5.0, 50.0)));
        assert!(!Attribute::Pt.test(&track, &Range::new(20.0, 50.0)));
    }

    #[test]
    fn charge_selector_on_charged_kind() {
        let track = Track {
            charge: -1.0,
            ..Default::default()
        };
        assert!(Attribute::Charge.test(&track, &Range::new(-1.0, -1.0)));
        assert!(!Attribute::Charge.test(&track, &Range::new(0.5, 1.5)));
    }

    #[test]
    fn chargeless_kind_selected_iff_range_contains_zero() {
        // Other attributes must not leak into the charge decision.
        let photon = Photon {
            pt: 42.0,
            eta: 2.2,
            phi: -1.0,
            ..Default::default()
        };
        assert!(Attribute::Charge.test(&photon, &Range::new(-0.5, 0.5)));
        assert!(Attribute::Charge.test(&photon, &Range::new(0.0, 0.0)));
        assert!(!Attribute::Charge.test(&photon, &Range::new(0.5, 1.5)));
        assert!(!Attribute::Charge.test(&photon, &Range::new(-2.0, -1.0)));
    }

    #[test]
    fn attribute_names_round_trip() {
        for attribute in [
            Attribute::Pt,
            Attribute::Eta,
            Attribute::Phi,
            Attribute::Charge,
        ] {
            let name = attribute.to_string();
            assert_eq!(name.parse::<Attribute>().unwrap(), attribute);
        }
        assert!("IP3D".parse::<Attribute>().is_err());
    }
}
