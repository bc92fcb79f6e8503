pub mod ingest_service;
pub mod staging;
pub mod storage;
pub mod video_store;
pub mod worker;
