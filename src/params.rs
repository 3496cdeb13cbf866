//! The five tunable probabilities of the automaton.

use crate::config::check_num;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Tunable probabilities, each in `[0.0, 1.0]`.
///
/// Runtime setters clamp into range, matching slider-bounded inputs; strict
/// validation happens once, when a config file is loaded. The engine reads a
/// snapshot once per step, so mid-step mutation can never tear a pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Params {
    infection: f64,
    recovery: f64,
    mortality: f64,
    birth: f64,
    mutation: f64,
}

/// Names addressing a single parameter through the public API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Infection,
    Recovery,
    Mortality,
    Birth,
    Mutation,
}

impl Params {
    /// Create a parameter set, clamping every value into `[0.0, 1.0]`.
    pub fn new(infection: f64, recovery: f64, mortality: f64, birth: f64, mutation: f64) -> Self {
        Self {
            infection: infection.clamp(0.0, 1.0),
            recovery: recovery.clamp(0.0, 1.0),
            mortality: mortality.clamp(0.0, 1.0),
            birth: birth.clamp(0.0, 1.0),
            mutation: mutation.clamp(0.0, 1.0),
        }
    }

    pub fn get(&self, kind: ParamKind) -> f64 {
        match kind {
            ParamKind::Infection => self.infection,
            ParamKind::Recovery => self.recovery,
            ParamKind::Mortality => self.mortality,
            ParamKind::Birth => self.birth,
            ParamKind::Mutation => self.mutation,
        }
    }

    /// Set one parameter, clamped into `[0.0, 1.0]`.
    pub fn set(&mut self, kind: ParamKind, value: f64) {
        let slot = match kind {
            ParamKind::Infection => &mut self.infection,
            ParamKind::Recovery => &mut self.recovery,
            ParamKind::Mortality => &mut self.mortality,
            ParamKind::Birth => &mut self.birth,
            ParamKind::Mutation => &mut self.mutation,
        };
        *slot = value.clamp(0.0, 1.0);
    }

    pub fn infection(&self) -> f64 {
        self.infection
    }

    pub fn recovery(&self) -> f64 {
        self.recovery
    }

    pub fn mortality(&self) -> f64 {
        self.mortality
    }

    pub fn birth(&self) -> f64 {
        self.birth
    }

    pub fn mutation(&self) -> f64 {
        self.mutation
    }

    /// All parameters with their config names, in declaration order.
    pub fn named(&self) -> [(&'static str, f64); 5] {
        [
            ("infection", self.infection),
            ("recovery", self.recovery),
            ("mortality", self.mortality),
            ("birth", self.birth),
            ("mutation", self.mutation),
        ]
    }

    pub(crate) fn validate(&self) -> Result<()> {
        for (name, val) in self.named() {
            check_num(val, 0.0..=1.0).with_context(|| format!("invalid {name} probability"))?;
        }
        Ok(())
    }
}
