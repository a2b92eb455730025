//! Durable table-based storage for recordings, places, the selected place
//! and the map viewport, plus the single-writer serialization layer.

mod model;
mod sqlite;
mod writer;

pub use model::{LatLon, MapViewport, Place, Recording};
pub use sqlite::Store;
pub use writer::StoreHandle;
