mod framer;
mod types;

pub use framer::Config as FramerConfig;
pub use types::{BaudRate, ServerAddress, SilenceIntervals};
