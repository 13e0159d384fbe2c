pub mod errors;
pub mod fixture;
pub mod memory;
pub mod ports;
pub mod query;

pub use errors::ProviderError;
pub use fixture::TreeFixture;
pub use memory::InMemoryTree;
pub use ports::{ElementHandle, TreeProvider};
pub use query::{ElementQuery, QueryStep};
