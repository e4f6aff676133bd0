mod handler;
mod tx_source;

pub use handler::*;
pub use tx_source::*;
