//! HTTP route handlers

pub mod admin;
pub mod form;
pub mod predictions;
