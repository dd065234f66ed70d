pub mod call_writer;
pub mod dummy;
pub mod proxy;
pub mod storage;
