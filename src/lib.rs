//! Comic platform - a publishing CMS for a serialized web comic
//!
//! Episodes are grouped into chapters and books and read page by page.
//! Posts, pages, a newsletter and site-wide globals round out the site.
//! The crate serves both the admin JSON API and the rendered frontend.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod theme;
