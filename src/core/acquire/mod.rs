mod extensions;
mod pipeline;

#[cfg(test)]
pub(crate) mod testing;

pub use pipeline::{AcquiredArchives, AcquisitionPipeline, MAX_IN_FLIGHT};
