//! API models for request and response payloads

pub mod query;
pub mod response;
pub mod stats;
pub mod user;

pub use query::{ListQuery, ListSpec, Pagination};
pub use response::ApiResponse;
pub use stats::{CountryCount, UserStats};
pub use user::{
    AgeInput, Country, DeletedUser, NewUser, UserChanges, UserPayload, UserRecord,
};
