//! Database query recording

pub mod entry;
pub mod profiler;

pub use entry::{interpolate_bindings, QueryEntry};
pub use profiler::{
    load_queries, QueryProfiler, QueryStatistics, DEFAULT_QUERY_LIMIT,
    DEFAULT_SLOW_QUERY_THRESHOLD_MS,
};
