pub mod cache;
pub mod change;
pub mod offline;
pub mod records;
pub mod retry;
pub mod settings;
pub mod status;
pub mod sync;
