pub mod fixtures;
pub mod recording;
pub mod store;

pub use recording::{RecordedStatement, RecordingDatabase};
pub use store::TestStore;
