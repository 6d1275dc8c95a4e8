#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod render;
pub mod session;
pub mod theme;
pub mod transition;

#[cfg(feature = "cli")]
pub use cli::run;
pub use error::{LayoutError, LayoutWarning};
pub use session::LayoutSession;
