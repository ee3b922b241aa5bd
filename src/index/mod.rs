pub mod store;
pub mod synchronizer;
pub mod worker;
