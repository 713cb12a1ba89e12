mod domains;
mod influx_writer;
mod line_protocol;
mod poller;
mod utils;

pub use domains::*;
pub use influx_writer::*;
pub use line_protocol::*;
pub use poller::*;
pub use utils::*;
