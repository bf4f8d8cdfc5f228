/// Enums for detector regions and tabulated particle species.
pub mod enums;
/// Three- and four-vector kinematics.
pub mod vectors;
