pub mod sales_store;

pub use sales_store::SalesStore;
