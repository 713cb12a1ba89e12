mod observations;

pub use observations::*;
