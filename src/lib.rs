pub mod crawler;
pub mod extract;
pub mod frontier;
pub mod models;
pub mod sink;
