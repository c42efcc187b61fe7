pub mod analyser;
pub mod clock;
pub mod cycle;
pub mod reconcile;
pub mod scheduler;
