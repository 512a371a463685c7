// Request handler module entry
// Routing plus the static bundle, sheet and dev-server endpoints

pub mod dev_server;
pub mod reply;
pub mod router;
pub mod sheets;
pub mod static_files;

// Re-export main entry point
pub use router::handle_request;
