//! SCIM 2.0 data types shared by the service and its client.

pub mod error;
pub mod group;
pub mod list;
pub mod meta;
pub mod patch;
pub mod resource;
pub mod schema;
pub mod user;

pub use error::{ErrorBody, ResourceError};
pub use group::Group;
pub use list::ListResponse;
pub use meta::Meta;
pub use patch::{PatchOp, PatchOpKind, PatchOperation};
pub use resource::{Resource, ResourceRef, parse_resource};
pub use schema::ResourceType;
pub use user::{Email, Name, User};
