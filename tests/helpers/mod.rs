#![allow(dead_code)]

pub mod app;
pub mod db;

pub use app::{test_settings, TestApp};
pub use db::TestDb;
