pub mod base;
pub mod batch;
pub mod customers;
pub mod ddl;
pub mod orchestrator;
pub mod sales;
pub mod sampler;
pub mod volume;
pub mod words;

pub use orchestrator::{SeedOrchestrator, SeedPhase, SeedPlan, SeedReport};
pub use sales::{SalesBatchReport, SalesWindow};
pub use sampler::HourSampler;
pub use volume::VolumeModulator;
