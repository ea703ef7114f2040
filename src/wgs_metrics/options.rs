use crate::error::{Result, WgsError};

/// Highest base quality the base-quality histogram can hold.
pub const MAX_BASE_QUALITY: u8 = 126;

/// Sizing of the batching and worker stages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineSettings {
    pub pack_max_loci: usize,
    pub pack_max_observations: usize,
    pub queue_capacity: usize,
    pub worker_threads: usize,
    pub max_in_flight_packs: usize,
}

impl PipelineSettings {
    pub fn new(
        pack_max_loci: usize,
        pack_max_observations: usize,
        queue_capacity: usize,
        worker_threads: usize,
        max_in_flight_packs: usize,
    ) -> Self {
        Self {
            pack_max_loci,
            pack_max_observations,
            queue_capacity,
            worker_threads,
            max_in_flight_packs,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("pack-max-loci", self.pack_max_loci),
            ("pack-max-observations", self.pack_max_observations),
            ("queue-capacity", self.queue_capacity),
            ("threads", self.worker_threads),
            ("max-in-flight", self.max_in_flight_packs),
        ];
        for (name, value) in checks {
            if value == 0 {
                return Err(WgsError::invalid_parameter(name, "must be >= 1"));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WgsOptions {
    pub min_mapping_quality: u8,
    pub min_base_quality: u8,
    pub coverage_cap: usize,
    /// Stop after this many loci have been batched.
    pub stop_after: Option<u64>,
    pub include_bq_histogram: bool,
    pub pipeline: PipelineSettings,
}

impl WgsOptions {
    pub fn new(
        min_mapping_quality: u8,
        min_base_quality: u8,
        coverage_cap: usize,
        pipeline: PipelineSettings,
    ) -> Self {
        Self {
            min_mapping_quality,
            min_base_quality,
            coverage_cap,
            stop_after: None,
            include_bq_histogram: false,
            pipeline,
        }
    }

    pub fn with_stop_after(mut self, stop_after: Option<u64>) -> Self {
        self.stop_after = stop_after.filter(|&n| n > 0);
        self
    }

    pub fn with_bq_histogram(mut self, include: bool) -> Self {
        self.include_bq_histogram = include;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.coverage_cap == 0 {
            return Err(WgsError::invalid_parameter("coverage-cap", "must be >= 1"));
        }
        if self.min_base_quality > MAX_BASE_QUALITY {
            return Err(WgsError::invalid_parameter(
                "min-base-quality",
                format!("must be <= {MAX_BASE_QUALITY}"),
            ));
        }
        self.pipeline.validate()
    }
}
