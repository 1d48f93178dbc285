pub mod actor;
pub mod blocklist;
pub mod callbacks;
pub mod config;
pub mod database;
pub mod error;
pub mod feed;
pub mod hub;
pub mod llm;
pub mod projection;
pub mod queue;
pub mod quota;
pub mod redis_url;
pub mod resolver;
pub mod signature;
pub mod subscription;
pub mod web;
pub mod worker;
pub mod youtube;
