pub mod config;
pub mod shutdown;

pub use config::Config;
pub use shutdown::Shutdown;
