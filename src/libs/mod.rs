pub mod aggregate;
pub mod annotation;
pub mod classify;
pub mod error;
pub mod gram;
pub mod homology;
pub mod io;
pub mod kernel;
pub mod layout;
pub mod params;
pub mod predictor;
pub mod protein;
pub mod report;
pub mod svm;
