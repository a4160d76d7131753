// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Processor registry: maps a configuration to the processor that handles it.

use intake_adapters::FileProcessor;
use intake_core::{ProcessError, ProcessingJob, ProcessingResult, WatchConfig};
use std::sync::Arc;

/// Ordered collection of processors; dispatch picks the first that supports
/// the configuration.
#[derive(Default, Clone)]
pub struct ProcessorRegistry {
    processors: Vec<Arc<dyn FileProcessor>>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, processor: Arc<dyn FileProcessor>) {
        self.processors.push(processor);
    }

    /// Whether any registered processor declares the given type.
    pub fn has_type(&self, processor_type: &str) -> bool {
        self.processors
            .iter()
            .any(|p| p.processor_type() == processor_type)
    }

    pub fn processor_types(&self) -> Vec<&str> {
        self.processors.iter().map(|p| p.processor_type()).collect()
    }

    /// Dispatch a job to the first supporting processor. No match is an
    /// application error: the configuration names a type nobody provides.
    pub async fn dispatch(
        &self,
        job: &ProcessingJob,
        cfg: &WatchConfig,
    ) -> Result<ProcessingResult, ProcessError> {
        let Some(processor) = self.processors.iter().find(|p| p.supports(cfg)) else {
            return Err(ProcessError::Application(format!(
                "no processor registered for type '{}'",
                cfg.processor_type
            )));
        };
        processor.process(job, cfg).await
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
