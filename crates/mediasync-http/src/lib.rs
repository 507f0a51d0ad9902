pub mod endpoint;
pub mod file_info;
pub mod remote;

pub use remote::{HttpRemote, HttpRemoteConfig};
