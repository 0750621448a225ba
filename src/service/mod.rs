//! DeviceStore: device CRUD using the safe SQL builder.

mod crud;
mod validation;
pub use crud::{DeviceCursor, DeviceStore};
pub use validation::ValuesValidator;
