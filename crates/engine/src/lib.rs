pub mod criteria;
pub mod entity_inventory;
pub mod error;
pub mod insert;
pub mod request;
pub mod sync;
pub mod table;
pub mod update;

pub use criteria::Criteria;
pub use error::EngineError;
pub use insert::Insert;
pub use request::{FromEntity, Request};
pub use sync::{Resolution, SyncRequest};
pub use table::Table;
pub use update::Update;
