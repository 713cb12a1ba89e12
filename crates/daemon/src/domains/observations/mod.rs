mod checkwx;
mod density_altitude;
mod metar;

pub use checkwx::*;
pub use density_altitude::*;
pub use metar::*;
