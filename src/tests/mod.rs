//! Test modules for xmonitor
//!
//! Client tests run against mockito servers; orchestrator tests use
//! in-memory fetchers and temporary state files.
