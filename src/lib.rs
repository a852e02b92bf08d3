//! Cubalink23 admin backend
//!
//! Admin panel and app-facing API in front of Supabase, Duffel and Square,
//! with a local SQLite mirror used when Supabase is unreachable.
//! It exposes all modules for testing purposes.

pub mod duffel;
pub mod entities;
pub mod errors;
pub mod fallback;
pub mod jobs;
pub mod models;
pub mod notifications;
pub mod partners;
pub mod rentals;
pub mod session;
pub mod settings;
pub mod signing;
pub mod square;
pub mod storage;
pub mod supabase;
pub mod web;
