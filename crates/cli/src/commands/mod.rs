pub mod ask;
pub mod chat;
pub mod doctor;
pub mod ingest;
pub mod onboard;
pub mod search;
pub mod tools;
