//! Route providers mounted by the HTTP server.
//!
//! Registration order (fixed):
//! ```text
//! /           root.rs         workbench page
//! /api        api.rs          applications and sessions
//! /update     update.rs       update status and checks
//! /login      login.rs        password form, sets the auth cookie
//! /static     static_files.rs files under <user-data-dir>/static
//! /dashboard  dashboard.rs    summary built from api + update
//! /ssh        crate::ssh      SSH server info, when SSH is enabled
//! ```

pub mod api;
pub mod dashboard;
pub mod login;
pub mod root;
pub mod static_files;
pub mod update;

pub use api::ApiProvider;
pub use dashboard::DashboardProvider;
pub use login::LoginProvider;
pub use root::RootProvider;
pub use static_files::StaticProvider;
pub use update::UpdateProvider;

/// Seconds since the Unix epoch.
pub(crate) fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
