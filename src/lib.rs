pub mod cascade;
pub mod classify;
pub mod config;
pub mod enrich;
pub mod error;
pub mod fetch;
pub mod models;
pub mod output;
pub mod parser;
pub mod pipeline;

pub mod gtfs_rt {
    include!(concat!(env!("OUT_DIR"), "/transit_realtime.rs"));
}
