//! Tasklane - an offline-first task synchronization engine
//!
//! This library keeps a local task list usable without connectivity and
//! reconciles it with a remote task service once a session and a connection
//! are available. Mutations are applied and persisted locally first, pushed
//! immediately when possible and queued for replay otherwise.
//!
//! # Modules
//!
//! The library is organized into several key modules:
//!
//! * [`sync`] - Local task store, pending queue and the reconciliation pass
//! * [`sync_coordinator`] - Decides when a reconciliation pass runs
//! * [`backend`] - Remote task service abstraction and its REST client
//! * [`storage`] - Durable persistence of tasks, queue and session
//! * [`session`] - Authentication state and login/logout transitions
//! * [`config`] - Application configuration management
//! * [`utils`] - Utility functions and helpers

/// Remote task service abstraction and REST implementation
pub mod backend;

/// Configuration module for managing application settings
pub mod config;

/// Application constants and default values
pub mod constants;

/// SeaORM entity models for database tables
pub mod entities;

/// Logging setup and in-memory log buffer
pub mod logger;

/// Connectivity tracking and probing
pub mod network;

/// User-visible notifications
pub mod notify;

/// Pending operation queue
pub mod queue;

/// Repository layer for database operations
pub mod repositories;

/// Authentication session management
pub mod session;

/// Durable storage of tasks, queue and session
pub mod storage;

/// Synchronization engine for keeping local and remote tasks in sync
pub mod sync;

/// Scheduling of reconciliation passes
pub mod sync_coordinator;

/// Task data model
pub mod task;

/// Utility functions for date/time formatting and other helpers
pub mod utils;
