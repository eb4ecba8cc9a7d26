//! ClientAdapter (C4) variants — ImpV1, Twitter, Facebook, Stub — and the
//! registry (C5) that owns them across refreshes.

pub mod adapter;
pub mod impv1;
pub mod registry;
pub mod stub;
pub mod vendor;

pub use adapter::ClientAdapter;
pub use registry::ClientRegistry;
