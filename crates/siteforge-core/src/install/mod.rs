//! Installation pipeline: profile archive in, running site out.
//!
//! Each step takes the run's [`NoticeLog`](crate::notice::NoticeLog) by
//! mutable reference and returns a `Result`; the orchestrator stops at the
//! first `Err` and never undoes earlier steps.

pub mod admin;
pub mod database;
pub mod expand;
pub mod import;
pub mod orchestrator;
pub mod prereq;
pub mod relocate;
pub mod runtime;
pub mod site_config;

pub use orchestrator::{InstallOptions, InstallPipeline, InstallReport, InstalledSite, Services};
pub use runtime::{CachedRuntimeSource, RuntimeSource};
