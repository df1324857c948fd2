mod adapter;

pub use adapter::V1Adapter;
