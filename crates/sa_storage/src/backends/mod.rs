pub mod datastore;
pub mod memory;

pub use datastore::DatastoreStorage;
pub use memory::MemoryStorage;
