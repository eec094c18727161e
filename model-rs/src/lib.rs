pub mod filter;
pub mod history;
pub mod record;
pub mod vehicle;

pub use filter::*;
pub use history::ViewHistory;
pub use record::{References, SpecificationRecord, VehicleRecord, decode_list, decode_one};
pub use vehicle::*;
