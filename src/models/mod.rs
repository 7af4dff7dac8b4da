//! Domain models for artifact layouts.
//!
//! # Core Concepts
//!
//! - [`Artifact`]: A named build output. Identified by a stable [`ArtifactId`]
//!   so it can be renamed and edited copy-on-write without losing identity.
//! - [`PackagingElement`]: A node of the artifact's output tree. Kinds are
//!   tagged by [`ElementState`]; only composite kinds (root, directory,
//!   archive) own children.
//! - [`ArtifactProperties`]: Opaque extra state attached to an artifact by a
//!   properties provider, e.g. [`HookProperties`].
//! - [`StateBean`]: Flat attribute-bag view of element and properties state,
//!   used by the document codec.

mod artifact;
mod bean;
mod element;
mod properties;

pub use artifact::*;
pub use bean::{format_bool, StateBean};
pub(crate) use bean::parse_bool;
pub use element::*;
pub use properties::*;
