pub mod convert;
pub mod router;
pub mod storage;
