//! Site description and filesystem layout.

pub mod layout;
pub mod spec;

pub use layout::{Destination, SiteTree, tenant_dir_name};
pub use spec::{AdminAccount, DatabaseCredentials, PermissionSet, SiteSpecification, Topology};
