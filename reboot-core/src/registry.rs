//! Pass Registry & Exclusion Filter
//!
//! Holds every shipped pass by name. Registration order is run order,
//! fixed for determinism. An exclusion name matching no registered pass
//! is fatal to the run: silently ignoring a typo would defeat the
//! caller's intent.

use crate::passes::{
    FieldInjectionPass, Pass, RequestMappingsPass, TestDoubleInjectionPass, WebAnnotationsPass,
};
use crate::{RebootError, Result};

pub struct PassRegistry {
    passes: Vec<Pass>,
}

impl PassRegistry {
    /// The shipped refactorings, in their fixed run order.
    pub fn builtin() -> Self {
        let mut registry = Self { passes: Vec::new() };
        registry.register(Pass::FieldInjection(FieldInjectionPass));
        registry.register(Pass::TestDoubleInjection(TestDoubleInjectionPass));
        registry.register(Pass::RequestMappings(RequestMappingsPass));
        registry.register(Pass::WebAnnotations(WebAnnotationsPass));
        registry
    }

    pub fn register(&mut self, pass: Pass) {
        self.passes.push(pass);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.passes.iter().map(Pass::name).collect()
    }

    /// The active passes for a run: registration order, minus the
    /// excluded names. Fails before any file is touched when an excluded
    /// name matches no registered pass.
    pub fn active_passes(&self, excluded: &[String]) -> Result<Vec<&Pass>> {
        for name in excluded {
            if !self.passes.iter().any(|pass| pass.name() == name) {
                return Err(RebootError::UnknownExclusion(name.clone()));
            }
        }
        Ok(self
            .passes
            .iter()
            .filter(|pass| !excluded.iter().any(|name| name == pass.name()))
            .collect())
    }
}

impl Default for PassRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
