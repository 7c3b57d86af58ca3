pub mod collect;
pub mod contract;
pub mod model;

pub use contract::ExamContract;
pub use model::ExamReading;

/// Lowest glucose reading (mg/dL) the contract accepts.
pub const GLUCOSE_MIN: f64 = 70.0;

/// Highest glucose reading (mg/dL) the contract accepts.
pub const GLUCOSE_MAX: f64 = 200.0;
