#[cfg(windows)]
mod handler;
#[cfg(windows)]
pub use handler::*;
