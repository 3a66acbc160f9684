pub mod credentials;
pub mod error;
pub mod path;
pub mod version;

pub use credentials::CredentialStore;
pub use error::{SkiffError, SkiffResult};
pub use version::Version;
