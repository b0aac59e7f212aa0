// ── Mirror storage ──
//
// Entity tables, derived projections and the store that wires them to the
// message router and event classifier.

mod data_store;
mod items;
mod projection;
mod refresh;
mod subscription;
mod table;

pub use data_store::DataStore;
pub use projection::DerivedTable;
pub use subscription::{ItemEvent, SubscriptionHandle, SubscriptionId};
pub use table::{EntityTable, EventSink, TableConfig};
