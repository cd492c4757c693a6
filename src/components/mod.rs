//! # Component descriptors, qualifiers, and the factory registry.
//!
//! | Piece                   | Role                                               |
//! |-------------------------|----------------------------------------------------|
//! | [`ComponentDescriptor`] | name + version + factory closure for one component |
//! | [`Qualifier`]           | composable predicate narrowing candidate streams   |
//! | [`CompositeQualifier`]  | logical AND over an ordered qualifier list         |
//! | [`ComponentRegistry`]   | ordered descriptor store with qualified lookup     |

mod descriptor;
mod qualifier;
mod registry;

pub use descriptor::{ComponentDescriptor, ComponentFactory};
pub use qualifier::{
    by_name, by_version, Candidates, CompositeQualifier, NamedQualifier, Qualifier,
    VersionQualifier,
};
pub use registry::ComponentRegistry;
