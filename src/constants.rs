//! Physical and astronomical constants used throughout the toolkit.
//!
//! Values follow the conventions of the Galacticus datasets (SI unless noted).

// Orders of magnitude.
pub const MICRO: f64 = 1.0e-06;
pub const CENTI: f64 = 1.0e-02;
pub const KILO: f64 = 1.0e+03;
pub const MEGA: f64 = 1.0e+06;
pub const GIGA: f64 = 1.0e+09;

// Scientific/mathematical constants.
pub const BOLTZMANNS_CONSTANT: f64 = 1.381e-23; // J/K
pub const PLANCKS_CONSTANT: f64 = 6.626068e-34; // J s
pub const GRAVITATIONAL_CONSTANT: f64 = 6.67408e-11; // m^3 kg^-1 s^-2
pub const SPEED_OF_LIGHT: f64 = 2.99792458e+08; // m/s

// Length.
pub const MICRON: f64 = 1.0e-06; // m
pub const ANGSTROM: f64 = 1.0e-10; // m
pub const PARSEC: f64 = 3.08567758e+16; // m
pub const MEGA_PARSEC: f64 = 3.08567758e+22; // m

// Mass.
pub const MASS_ATOMIC: f64 = 1.660538921e-27; // kg
pub const MASS_HYDROGEN: f64 = 1.67262158e-27; // kg
pub const ATOMIC_MASS_HYDROGEN: f64 = 1.00794; // amu
pub const HYDROGEN_BY_MASS_PRIMORDIAL: f64 = 0.76; // primordial fraction

// Time.
pub const GIGA_YEAR: f64 = 3.1556926e+16; // s

// Energy / power.
pub const ERG: f64 = 1.0e-07; // J
pub const ELECTRON_VOLT: f64 = 1.602e-19; // J
pub const LUMINOSITY_AB: f64 = 4.4659201576470211e+13; // W/Hz
pub const JANSKY: f64 = 1.0e-23; // erg/s/cm^2/Hz
pub const HYDROGEN_ONE_IONIZATION_ENERGY: f64 = 13.599; // eV
pub const HELIUM_ONE_IONIZATION_ENERGY: f64 = 24.588; // eV
pub const HELIUM_TWO_IONIZATION_ENERGY: f64 = 54.418; // eV
pub const OXYGEN_TWO_IONIZATION_ENERGY: f64 = 35.118; // eV

// Solar values.
pub const MASS_FRACTION_HYDROGEN: f64 = 0.707; // solar composition
pub const MASS_SOLAR: f64 = 1.9891e+30; // kg
pub const METALLICITY_SOLAR: f64 = 0.0188;
pub const LUMINOSITY_SOLAR: f64 = 3.839e+26; // W
