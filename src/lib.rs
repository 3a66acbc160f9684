//! skiff — deployment and self-update engine for desktop applications.
//!
//! This crate provides the main skiff library: building versioned,
//! checksum-verified release packages (full and delta), publishing them to
//! a feed, and installing/updating them on end-user machines.

pub use skiff_core::{
    AppDescriptor, Channel, CredentialStore, FeedSource, SkiffError, SkiffResult, Target, Version,
    DESCRIPTOR_FILE,
};

/// Core module re-exported for convenience.
pub mod core {
    pub use skiff_core::core::*;
    pub use skiff_core::*;
}

/// Configuration management.
pub mod config;

/// Content hashing.
pub mod checksum;

/// Package container format.
pub mod archive;

/// Release building: full packages, delta packages, repository scan.
pub mod release;

/// Feed collaborator (search, download, push).
pub mod feed;

/// Publishing packages to a channel.
pub mod publish;

/// Installing and updating applications.
pub mod install;

/// Native launcher collaborator.
pub mod runner;
