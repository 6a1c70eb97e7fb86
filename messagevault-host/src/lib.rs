pub mod archive;
pub mod config;
pub mod host;
pub mod local_store;
pub mod logging;
pub mod native;
pub mod oauth_flow;
pub mod token_storage;
