mod health;
mod metrics;
mod admit;

pub use health::health_handler;
pub use metrics::metrics_handler;
pub use admit::admit_handler;
