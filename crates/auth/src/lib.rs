//! `quartermaster-auth` — caller identity and write/read authorization.
//!
//! This crate is intentionally decoupled from HTTP and storage. The only IO
//! it touches is the [`UserDirectory`] lookup behind the logistics-officer
//! rule, and that arrives as a trait implemented elsewhere.

pub mod context;
pub mod policy;
pub mod roles;
pub mod user;

pub use context::{CallerContext, ReadScope};
pub use policy::{
    evaluate, AccessPolicy, DirectoryError, PolicyError, UserDirectory, WriteAction,
};
pub use roles::Role;
pub use user::User;
