//! Section-scoped defaults for the physical-model routines (dust screens,
//! emission lines, gas density, SED construction) and for toolkit paths.
//!
//! A built-in table provides the defaults; a JSON file named by the
//! `GALACTICUS_CONFIG` environment variable overrides them section by
//! section. A process-wide instance is exposed through [`rc_params`].

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use log::warn;
use once_cell::sync::Lazy;
use serde_json::Value;

/// The process-wide configuration.
static RC_PARAMS: Lazy<RwLock<RcParams>> = Lazy::new(|| RwLock::new(RcParams::load()));

/// Read access to the global configuration.
pub fn rc_params() -> std::sync::RwLockReadGuard<'static, RcParams> {
    RC_PARAMS.read().expect("configuration lock poisoned")
}

/// Write access to the global configuration.
pub fn rc_params_mut() -> std::sync::RwLockWriteGuard<'static, RcParams> {
    RC_PARAMS.write().expect("configuration lock poisoned")
}

/// Section → key → value defaults, string-typed on disk like the parameter
/// files; typed getters coerce with a caller-supplied fallback.
#[derive(Clone, Debug, Default)]
pub struct RcParams {
    sections: HashMap<String, HashMap<String, String>>,
}

impl RcParams {
    /// The built-in defaults.
    pub fn defaults() -> RcParams {
        let mut rc = RcParams::default();
        for (section, key, value) in DEFAULTS {
            rc.set(section, key, value);
        }
        rc
    }

    /// Built-in defaults plus overrides from the file named by
    /// `GALACTICUS_CONFIG`, when set. An unreadable override file is logged
    /// and ignored.
    pub fn load() -> RcParams {
        let mut rc = RcParams::defaults();
        if let Ok(path) = std::env::var("GALACTICUS_CONFIG") {
            if let Err(e) = rc.merge_file(&path) {
                warn!("could not read configuration overrides from '{path}': {e}");
            }
        }
        rc
    }

    /// Merge a JSON document of the form
    /// `{"section": {"key": value, ...}, ...}` over the current state.
    pub fn merge_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), anyhow::Error> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let doc: Value = serde_json::from_str(&text)?;
        let sections = doc
            .as_object()
            .ok_or_else(|| anyhow!("configuration root is not an object"))?;
        for (section, entries) in sections {
            let entries = entries
                .as_object()
                .ok_or_else(|| anyhow!("configuration section '{section}' is not an object"))?;
            for (key, value) in entries {
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                self.set(section, key, &value);
            }
        }
        Ok(())
    }

    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    #[must_use]
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|s| s.get(key))
            .map(String::as_str)
    }

    /// String value with a fallback for absent keys.
    #[must_use]
    pub fn get_or(&self, section: &str, key: &str, fallback: &str) -> String {
        self.get(section, key).unwrap_or(fallback).to_string()
    }

    /// Float value; absent or unparseable keys yield the fallback (the
    /// latter with a logged warning).
    #[must_use]
    pub fn get_float(&self, section: &str, key: &str, fallback: f64) -> f64 {
        self.coerce(section, key, fallback)
    }

    /// Integer value; same fallback behaviour as [`RcParams::get_float`].
    #[must_use]
    pub fn get_int(&self, section: &str, key: &str, fallback: i64) -> i64 {
        self.coerce(section, key, fallback)
    }

    /// Boolean value; same fallback behaviour as [`RcParams::get_float`].
    #[must_use]
    pub fn get_bool(&self, section: &str, key: &str, fallback: bool) -> bool {
        self.coerce(section, key, fallback)
    }

    fn coerce<T: std::str::FromStr + Copy>(&self, section: &str, key: &str, fallback: T) -> T {
        match self.get(section, key) {
            None => fallback,
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!("[{section}] {key} = '{raw}' is not valid here, using fallback");
                fallback
            }),
        }
    }

    #[must_use]
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }
}

/// Built-in method defaults, as (section, key, value).
const DEFAULTS: &[(&str, &str, &str)] = &[
    ("cloudy", "fileName", "emissionLines.hdf5"),
    ("cloudy", "method", "linear"),
    ("cloudy", "bounds_error", "false"),
    ("dustAllen", "Rv", "3.1"),
    ("dustCalzetti", "Rv", "4.05"),
    ("dustCharlotFall", "opticalDepthISMFactor", "1.0"),
    ("dustCharlotFall", "opticalDepthCloudsFactor", "1.0"),
    ("dustCharlotFall", "wavelengthZeroPoint", "5500.0"),
    ("dustCharlotFall", "wavelengthExponent", "0.7"),
    ("dustCompendium", "attenuationsFile", "compendiumAttenuations.hdf5"),
    ("dustCompendium", "dustToMetalsRatio", "0.44"),
    ("dustCompendium", "extrapolateOpticalDepth", "true"),
    ("dustFitzpatrick", "Rv", "2.72"),
    ("dustOpticalDepth", "dustToMetalsRatio", "0.44"),
    ("dustOpticalDepth", "localISMMetallicity", "0.02"),
    ("dustPrevot", "Rv", "3.1"),
    ("dustSeaton", "Rv", "3.1"),
    ("emissionLine", "profileShape", "gaussian"),
    ("emissionLine", "lifetimeHIIRegion", "1.0e-3"),
    ("emissionLine", "massHIIRegion", "7.5e3"),
    ("hydrogenGasDensity", "densityMethod", "central"),
    ("hydrogenGasDensity", "massGMC", "3.7e+07"),
    ("hydrogenGasDensity", "surfaceDensityCritical", "8.5e13"),
    ("magnitude", "zeroCorrection", "1.0e-50"),
    ("metals", "zeroCorrection", "1.0e-50"),
    ("spectralEnergyDistribution", "continuumInterpolationMethod", "linear"),
];
