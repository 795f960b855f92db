//! CDI Core - Specification registry and device resolver
//!
//! This crate discovers Container Device Interface specifications and turns
//! them into a queryable device registry:
//! - Scanning specification directories in priority order
//! - Validating each file independently
//! - Merging devices into one index, with conflicts resolved by priority
//! - Resolving requested devices into the container edits that expose them

pub mod edits;
pub mod error;
pub mod index;
pub mod loader;
pub mod qualified;
pub mod registry;
pub mod resolve;
pub mod spec;
pub mod validate;

pub use edits::{ContainerEdits, DeviceNode, Hook, HookPhase, Mount};
pub use error::{ErrorKind, ErrorMap, ErrorRecord, RegistryError};
pub use index::{IndexedDevice, Snapshot};
pub use qualified::{NameError, QualifiedName};
pub use registry::{
    default_registry, Registry, RegistryBuilder, RegistryConfig, DEFAULT_SPEC_DIRS, SPEC_DIRS_ENV,
};
pub use resolve::Resolution;
pub use spec::{DeviceEntry, Spec, SpecError, SpecFile};
