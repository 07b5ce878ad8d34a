pub mod asset;
pub mod changes;
pub mod collector;
pub mod error;
pub mod factory;
pub mod ids;
pub mod inventory;
pub mod record;
pub mod registry;
pub mod timestamp;
pub mod value;

pub use asset::Asset;
pub use changes::WithChangesOnly;
pub use collector::{Collectable, Collector, Snapshot};
pub use error::CoreError;
pub use factory::EntityFactory;
pub use ids::LineageId;
pub use inventory::{FieldRule, Inventory, Layout, Position, Positions};
pub use record::{Entity, Record};
pub use registry::{Registry, attr};
pub use value::Value;
