pub mod accessor;
pub mod dolphin;
pub mod fake;

pub use accessor::{MemoryAccessor, MemoryError, MemoryLayout, MemoryResult, MEM1_START, MEM2_START};
pub use dolphin::DolphinProcess;
pub use fake::FakeMemory;
