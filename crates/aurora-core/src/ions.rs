//! Tracked ions and elemental abundances.
//!
//! The engine follows a fixed, ordered set of ions of H, He, C, N, O, Ne
//! and S. For each element the *lower* ionization stages are tracked
//! explicitly; the remainder of the element sits in the implicit top stage
//! (e.g. for oxygen we track O⁰ and O⁺, and O²⁺ holds whatever is left).

use serde::{Deserialize, Serialize};

/// Elements followed by the simulation, in enumeration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Element {
    Hydrogen,
    Helium,
    Carbon,
    Nitrogen,
    Oxygen,
    Neon,
    Sulphur,
}

/// Number of tracked elements.
pub const NUM_ELEMENTS: usize = 7;

impl Element {
    /// All elements, in enumeration order.
    pub const ALL: [Element; NUM_ELEMENTS] = [
        Element::Hydrogen,
        Element::Helium,
        Element::Carbon,
        Element::Nitrogen,
        Element::Oxygen,
        Element::Neon,
        Element::Sulphur,
    ];

    /// Index of this element in enumeration order.
    pub fn index(self) -> usize {
        self as usize
    }

    /// The tracked ionization stages of this element, lowest stage first.
    ///
    /// Consecutive entries are consecutive stages: the photoionization of
    /// entry `k` feeds entry `k + 1` (or the implicit top stage for the
    /// last entry).
    pub fn tracked_ions(self) -> &'static [Ion] {
        match self {
            Element::Hydrogen => &[Ion::Hn],
            Element::Helium => &[Ion::Hen],
            Element::Carbon => &[Ion::Cp1, Ion::Cp2],
            Element::Nitrogen => &[Ion::Nn, Ion::Np1, Ion::Np2],
            Element::Oxygen => &[Ion::On, Ion::Op1],
            Element::Neon => &[Ion::Nen, Ion::Nep1],
            Element::Sulphur => &[Ion::Sp1, Ion::Sp2, Ion::Sp3],
        }
    }
}

/// The tracked ions, in the fixed enumeration order used by every per-ion
/// array in the engine (cross-section caches, mean-intensity accumulators,
/// ionic-fraction vectors).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ion {
    /// Neutral hydrogen.
    Hn,
    /// Neutral helium.
    Hen,
    /// C⁺.
    Cp1,
    /// C²⁺.
    Cp2,
    /// Neutral nitrogen.
    Nn,
    /// N⁺.
    Np1,
    /// N²⁺.
    Np2,
    /// Neutral oxygen.
    On,
    /// O⁺.
    Op1,
    /// Neutral neon.
    Nen,
    /// Ne⁺.
    Nep1,
    /// S⁺.
    Sp1,
    /// S²⁺.
    Sp2,
    /// S³⁺.
    Sp3,
}

/// Number of tracked ions.
pub const NUM_IONS: usize = 14;

impl Ion {
    /// All tracked ions, in enumeration order.
    pub const ALL: [Ion; NUM_IONS] = [
        Ion::Hn,
        Ion::Hen,
        Ion::Cp1,
        Ion::Cp2,
        Ion::Nn,
        Ion::Np1,
        Ion::Np2,
        Ion::On,
        Ion::Op1,
        Ion::Nen,
        Ion::Nep1,
        Ion::Sp1,
        Ion::Sp2,
        Ion::Sp3,
    ];

    /// Index of this ion in enumeration order.
    pub fn index(self) -> usize {
        self as usize
    }

    /// The element this ion belongs to.
    pub fn element(self) -> Element {
        match self {
            Ion::Hn => Element::Hydrogen,
            Ion::Hen => Element::Helium,
            Ion::Cp1 | Ion::Cp2 => Element::Carbon,
            Ion::Nn | Ion::Np1 | Ion::Np2 => Element::Nitrogen,
            Ion::On | Ion::Op1 => Element::Oxygen,
            Ion::Nen | Ion::Nep1 => Element::Neon,
            Ion::Sp1 | Ion::Sp2 | Ion::Sp3 => Element::Sulphur,
        }
    }

    /// Short human-readable label, e.g. `"H0"` or `"S+2"`.
    pub fn label(self) -> &'static str {
        match self {
            Ion::Hn => "H0",
            Ion::Hen => "He0",
            Ion::Cp1 => "C+1",
            Ion::Cp2 => "C+2",
            Ion::Nn => "N0",
            Ion::Np1 => "N+1",
            Ion::Np2 => "N+2",
            Ion::On => "O0",
            Ion::Op1 => "O+1",
            Ion::Nen => "Ne0",
            Ion::Nep1 => "Ne+1",
            Ion::Sp1 => "S+1",
            Ion::Sp2 => "S+2",
            Ion::Sp3 => "S+3",
        }
    }
}

/// Elemental abundances by number relative to hydrogen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Abundances {
    values: [f64; NUM_ELEMENTS],
}

impl Abundances {
    /// Construct from explicit per-element values (relative to hydrogen;
    /// the hydrogen entry itself is forced to 1).
    pub fn new(helium: f64, carbon: f64, nitrogen: f64, oxygen: f64, neon: f64, sulphur: f64) -> Self {
        let values = [1.0, helium, carbon, nitrogen, oxygen, neon, sulphur];
        for (element, &a) in Element::ALL.iter().zip(values.iter()) {
            assert!(
                a >= 0.0,
                "negative abundance {} for element {:?}",
                a,
                element
            );
        }
        Self { values }
    }

    /// A pure-hydrogen gas. Used by analytic benchmark setups.
    pub fn hydrogen_only() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0)
    }

    /// Abundance of the given element by number relative to hydrogen.
    pub fn abundance(&self, element: Element) -> f64 {
        self.values[element.index()]
    }
}

impl Default for Abundances {
    /// Solar-neighbourhood ISM values.
    fn default() -> Self {
        Self::new(0.1, 2.2e-4, 4.0e-5, 3.3e-4, 5.0e-5, 9.0e-6)
    }
}
