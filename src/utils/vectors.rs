use std::f64::consts::{PI, TAU};
use std::iter::Sum;

use auto_ops::impl_op_ex;
use serde::{Deserialize, Serialize};

/// A three-vector of momentum or position components.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Promote to a four-vector with the given invariant mass.
    pub fn with_mass(&self, mass: f64) -> Vec4 {
        let e = (mass * mass + self.mag2()).sqrt();
        Vec4::new(self.x, self.y, self.z, e)
    }

    /// Promote to a four-vector with the given energy.
    pub fn with_energy(&self, energy: f64) -> Vec4 {
        Vec4::new(self.x, self.y, self.z, energy)
    }

    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn mag2(&self) -> f64 {
        self.dot(self)
    }

    pub fn mag(&self) -> f64 {
        self.mag2().sqrt()
    }

    pub fn costheta(&self) -> f64 {
        self.z / self.mag()
    }

    pub fn theta(&self) -> f64 {
        self.costheta().acos()
    }

    pub fn phi(&self) -> f64 {
        self.y.atan2(self.x)
    }

    pub fn unit(&self) -> Self {
        let mag = self.mag();
        Self::new(self.x / mag, self.y / mag, self.z / mag)
    }
}

impl_op_ex!(+ |a: &Vec3, b: &Vec3| -> Vec3 { Vec3::new(a.x + b.x, a.y + b.y, a.z + b.z) });
impl_op_ex!(-|a: &Vec3, b: &Vec3| -> Vec3 { Vec3::new(a.x - b.x, a.y - b.y, a.z - b.z) });
impl_op_ex!(-|a: &Vec3| -> Vec3 { Vec3::new(-a.x, -a.y, -a.z) });
impl_op_ex!(*|a: &Vec3, b: &f64| -> Vec3 { Vec3::new(a.x * b, a.y * b, a.z * b) });
impl_op_ex!(/ |a: &Vec3, b: &f64| -> Vec3 { Vec3::new(a.x / b, a.y / b, a.z / b) });

/// A four-momentum `(px, py, pz, E)` with collider-frame kinematic accessors.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec4 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub t: f64,
}

impl Vec4 {
    pub fn new(x: f64, y: f64, z: f64, t: f64) -> Self {
        Self { x, y, z, t }
    }

    /// Build a four-momentum from transverse momentum, pseudorapidity, azimuth, and mass.
    pub fn from_pt_eta_phi_m(pt: f64, eta: f64, phi: f64, mass: f64) -> Self {
        let px = pt * phi.cos();
        let py = pt * phi.sin();
        let pz = pt * eta.sinh();
        let p = pt * eta.cosh();
        let e = (mass * mass + p * p).sqrt();
        Self::new(px, py, pz, e)
    }

    pub fn px(&self) -> f64 {
        self.x
    }

    pub fn py(&self) -> f64 {
        self.y
    }

    pub fn pz(&self) -> f64 {
        self.z
    }

    pub fn e(&self) -> f64 {
        self.t
    }

    pub fn vec3(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    pub fn beta(&self) -> Vec3 {
        self.vec3() / self.t
    }

    pub fn mag2(&self) -> f64 {
        self.t * self.t - self.vec3().mag2()
    }

    pub fn mag(&self) -> f64 {
        self.mag2().sqrt()
    }

    /// Transverse momentum.
    pub fn pt(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Pseudorapidity. Infinite for momenta along the beam axis.
    pub fn eta(&self) -> f64 {
        let p = self.vec3().mag();
        0.5 * ((p + self.z) / (p - self.z)).ln()
    }

    /// Azimuthal angle in `(-pi, pi]`.
    pub fn phi(&self) -> f64 {
        self.y.atan2(self.x)
    }

    /// Angular distance to `other` in pseudorapidity-azimuth space.
    pub fn delta_r(&self, other: &Self) -> f64 {
        let deta = self.eta() - other.eta();
        let dphi = wrap_delta_phi(self.phi() - other.phi());
        deta.hypot(dphi)
    }

    /// Boost by the given velocity three-vector.
    pub fn boost(&self, beta: &Vec3) -> Self {
        let b2 = beta.dot(beta);
        let gamma = 1.0 / (1.0 - b2).sqrt();
        let p3 = self.vec3()
            + beta * ((gamma - 1.0) * self.vec3().dot(beta) / b2 + gamma * self.t);
        Self::new(p3.x, p3.y, p3.z, gamma * (self.t + beta.dot(&self.vec3())))
    }
}

impl_op_ex!(+ |a: &Vec4, b: &Vec4| -> Vec4 { Vec4::new(a.x + b.x, a.y + b.y, a.z + b.z, a.t + b.t) });
impl_op_ex!(-|a: &Vec4, b: &Vec4| -> Vec4 { Vec4::new(a.x - b.x, a.y - b.y, a.z - b.z, a.t - b.t) });
impl_op_ex!(-|a: &Vec4| -> Vec4 { Vec4::new(-a.x, -a.y, -a.z, -a.t) });

impl Sum for Vec4 {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Vec4::default(), |acc, p4| acc + p4)
    }
}

/// Wrap an azimuthal difference into `(-pi, pi]`.
pub fn wrap_delta_phi(dphi: f64) -> f64 {
    let wrapped = (dphi + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}
