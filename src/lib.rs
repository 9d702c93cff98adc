//! Listing backend for a real-estate site: property records, their images in
//! a blob store, and filtering for browsing visitors.

pub mod auth;
pub mod blob_store;
pub mod config;
pub mod controllers;
pub mod crypto;
pub mod db_ops;
pub mod errors;
pub mod extractors;
pub mod filter;
pub mod form;
pub mod lifecycle;
pub mod models;
pub mod repository;
pub mod routes;
pub mod session;

#[cfg(test)]
mod testing;
