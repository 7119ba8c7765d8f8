/// Credentials: password hashing and session tokens.
pub mod auth;
/// Week-grid layout of meetings.
pub mod calendar;
pub mod config;
/// Database layer: open, migrate, CRUD and counts.
pub mod db;
/// Uploaded files: the media store trait and its ImageKit and disk backends.
pub mod media;
/// Data types: User, Task, Meeting and their enums.
pub mod models;
/// Axum-based REST API.
pub mod web;
