pub mod app;
pub mod completion;
pub mod config;
pub mod database;
pub mod embedding;
pub mod models;
pub mod parser;
pub mod queue;
pub mod routes;
pub mod search;
pub mod storage;
pub mod vector_store;
pub mod worker;
