//! Module for core business logic services.
//!
//! This module encapsulates services that perform specific business operations
//! and orchestrate interactions between different parts of the application,
//! such as delivering OTP emails or aggregating dashboard data.

pub mod email_service;
pub mod metric_service;
