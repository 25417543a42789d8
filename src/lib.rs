// ABOUTME: Library module for seren-mysql-dumper
// ABOUTME: Exports all core functionality for use in binary and tests

pub mod commands;
pub mod config;
pub mod filters;
pub mod migration;
pub mod mysql;
pub mod utils;
