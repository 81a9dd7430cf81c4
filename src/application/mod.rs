pub mod cache;
pub mod catalog;
pub mod engine;
pub mod normalization;
pub mod strategies;
