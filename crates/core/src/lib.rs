//! Core library: alt text generation, the resumable batch engine, selection
//! and upload entry points, settings, audit log and catalog access.

pub mod api;
pub mod apply;
pub mod audit;
pub mod auth;
pub mod batch;
pub mod catalog;
pub mod config;
pub mod generator;
pub mod models;
pub mod pipeline;
pub mod scanner;
pub mod selection;
pub mod settings;
pub mod upload;
