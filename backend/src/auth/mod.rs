//! Authentication module for managing registration, sessions, and access control.
//!
//! This module provides the public interface for user authentication-related
//! functionalities such as OTP-verified registration, login, password reset,
//! and authorization middleware.

pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod service;
