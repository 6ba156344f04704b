#[cfg(test)]
pub mod memory;
mod model;
mod repo;

pub use model::{PublicUser, RiderDetails, Role, UserKind, UserRecord};
pub use repo::{PgUserStore, StoreError, UserStore};
