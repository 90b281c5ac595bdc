pub mod analysis_service;
pub mod export_service;
pub mod failure_cache;
pub mod indicators;
pub mod nav_cache;
pub mod nav_service;
pub mod scoring_service;
pub mod session_store;
pub mod streak_service;
pub mod valuation_service;
