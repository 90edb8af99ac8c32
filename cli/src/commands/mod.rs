pub mod presets;
pub mod resolve;
pub mod session;
pub mod watch;
