//! Host platform helpers for selfup.
//!
//! - Locating the running executable and its `.new`/`.old` sidecars.
//! - Host OS/architecture identifiers used to pick release assets.
//! - Hiding leftover files on platforms that keep in-use binaries locked.
//! - Per-user application directories for settings and logs.

mod executable;
mod hide;
mod paths;
mod target;

pub use executable::{ExecutableLocation, LocateError};
pub use hide::hide_file;
pub use paths::{AppPaths, AppPathsError};
pub use target::{Arch, Os, PlatformTarget};
