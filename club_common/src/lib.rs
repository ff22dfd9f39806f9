//! Shared pieces of the club backend: the role and permission tables, region
//! handling, caller identity, the DynamoDB record models, the HTTP glue every
//! handler uses and the run date of scheduled jobs.

pub mod claims;
pub mod error;
pub mod http;
pub mod logging;
pub mod model;
pub mod permissions;
pub mod regions;
pub mod schedule;
pub mod store;

pub use claims::Principal;
pub use error::ClubError;
pub use permissions::{AccessError, Permission, RegionScope, Role};
pub use regions::Region;
