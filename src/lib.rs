//! Foodgram - a recipe sharing backend
//!
//! Users publish recipes with tags and ingredients, follow authors, keep
//! favourites and a shopping cart, and download the aggregated shopping list.

pub mod admin;
pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod permissions;
pub mod serializers;
pub mod services;
