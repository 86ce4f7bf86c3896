mod baud_rate;
mod server_address;

pub use baud_rate::{BaudRate, SilenceIntervals};
pub use server_address::ServerAddress;
