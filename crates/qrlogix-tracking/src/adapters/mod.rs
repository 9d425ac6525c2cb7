//! Adapter implementations of the outbound ports.

pub mod clock;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use clock::{ManualClock, SystemTimeSource};
pub use memory::InMemoryRepository;
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteConfig, SqliteRepository};
