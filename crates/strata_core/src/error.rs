//! # Error Types
//!
//! Everything that can go wrong in the registry, the archive and config parsing.
//!
//! Expected conditions (attaching a component twice, detaching an absent one,
//! reading a missing component) are NOT errors; they are reported through
//! `bool` / `Option` returns. The variants below describe caller bugs.

use thiserror::Error;

use crate::ecs::{ComponentId, Entity};

/// Errors raised while registering or looking up component types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No component type was registered under this ID.
    #[error("component {0} is not registered")]
    Unregistered(ComponentId),

    /// Two different types hashed to the same component ID.
    #[error("tag '{tag}' hashes to {id}, already taken by '{existing}'")]
    IdCollision {
        /// The rejected tag.
        tag: &'static str,
        /// The colliding ID.
        id: ComponentId,
        /// Tag of the type that already owns the ID.
        existing: &'static str,
    },

    /// The tag hashed to the reserved invalid ID.
    #[error("tag '{0}' hashes to the reserved invalid component id")]
    ReservedId(&'static str),

    /// The type needs a stricter alignment than a column provides.
    #[error("component '{tag}' requires {align}-byte alignment, columns provide {max}")]
    AlignmentTooLarge {
        /// Component tag.
        tag: &'static str,
        /// Required alignment.
        align: usize,
        /// Column alignment.
        max: usize,
    },

    /// A single value does not fit in one chunk.
    #[error("component '{tag}' is {size} bytes, a chunk holds {max}")]
    TooLarge {
        /// Component tag.
        tag: &'static str,
        /// Size of one value.
        size: usize,
        /// Chunk size.
        max: usize,
    },
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors raised by structural operations on the archive.
///
/// All of these are programmer errors: the boolean API logs them and fires a
/// debug assertion.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArchiveError {
    /// The invalid sentinel was used as an entity.
    #[error("the invalid entity sentinel cannot own components")]
    InvalidEntity,

    /// Component type lookup failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A typed call named a type that was never registered.
    #[error("type {0} is not registered")]
    UnregisteredType(&'static str),

    /// One row of the archetype does not fit in a chunk.
    #[error("archetype with {components} components needs {stride} bytes per entity, too large for a chunk")]
    ArchetypeTooLarge {
        /// Number of components in the archetype.
        components: usize,
        /// Bytes per entity.
        stride: usize,
    },

    /// A tracking record points at storage that does not exist.
    #[error("record for {entity} points at missing storage (archetype {archetype})")]
    CorruptRecord {
        /// The affected entity.
        entity: Entity,
        /// Archetype index stored in the record.
        archetype: usize,
    },
}

/// Result type for archive operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Errors raised while parsing configuration text.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The TOML text could not be parsed.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value was syntactically fine but out of range.
    #[error("invalid configuration value for '{key}': {reason}")]
    InvalidValue {
        /// Offending key.
        key: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

/// Result type for configuration parsing.
pub type ConfigResult<T> = Result<T, ConfigError>;
