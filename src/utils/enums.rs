use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::OleanderError;

/// Pseudorapidity regions of the detector, used to select the calorimeter
/// response table that applies to a candidate.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EtaRegion {
    /// The backward region, $`\eta < -1`$.
    Backward,
    /// The barrel region, $`|\eta| \leq 1`$.
    Barrel,
    /// The forward region, $`\eta > 1`$.
    Forward,
}

impl EtaRegion {
    /// Classify a pseudorapidity into its detector region.
    pub fn from_eta(eta: f64) -> Self {
        if eta < -1.0 {
            Self::Backward
        } else if eta <= 1.0 {
            Self::Barrel
        } else {
            Self::Forward
        }
    }
}

impl Display for EtaRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EtaRegion::Backward => write!(f, "Backward"),
            EtaRegion::Barrel => write!(f, "Barrel"),
            EtaRegion::Forward => write!(f, "Forward"),
        }
    }
}

impl FromStr for EtaRegion {
    type Err = OleanderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "backward" | "bwd" => Ok(Self::Backward),
            "barrel" | "central" => Ok(Self::Barrel),
            "forward" | "fwd" => Ok(Self::Forward),
            _ => Err(OleanderError::ParseError {
                name: s.to_string(),
                object: "EtaRegion".to_string(),
            }),
        }
    }
}

/// Particle species for which a dedicated calorimeter response table exists.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Species {
    /// Electrons and positrons (PDG code 11).
    Electron,
    /// Charged pions (PDG code 211).
    ChargedPion,
}

impl Species {
    /// Map a PDG identification code onto a tabulated species, if one exists.
    pub fn from_pid(pid: i32) -> Option<Self> {
        match pid.abs() {
            11 => Some(Self::Electron),
            211 => Some(Self::ChargedPion),
            _ => None,
        }
    }
}

impl Display for Species {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Species::Electron => write!(f, "Electron"),
            Species::ChargedPion => write!(f, "ChargedPion"),
        }
    }
}

impl FromStr for Species {
    type Err = OleanderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "electron" | "e" | "11" => Ok(Self::Electron),
            "chargedpion" | "pion" | "pi" | "211" => Ok(Self::ChargedPion),
            _ => Err(OleanderError::ParseError {
                name: s.to_string(),
                object: "Species".to_string(),
            }),
        }
    }
}
