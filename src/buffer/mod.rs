pub mod batch;

pub use batch::{
    Batch, BatchConfig, BatchTrigger, DEFAULT_BATCH_SIZE, DEFAULT_FLUSH_INTERVAL, RecordBatcher,
};
