//! Tick engine, balance catalog and player commands for the Stronghold
//! city simulation.
//!
//! This crate owns everything that changes the world: resource production,
//! the building and recruitment queues, and the validated player commands
//! that feed them. It also owns the background schedules that drive the
//! engine in real time.
//!
//! # Modules
//!
//! - [`balance`] -- Balance catalog loaded from `config/balance.yaml` and
//!   the [`BalanceLookup`] trait the engine reads it through.
//! - [`commands`] -- Registration, building upgrades and troop recruitment.
//! - [`config`] -- Server configuration from `stronghold-config.yaml`.
//! - [`coordinator`] -- The single shared world lock.
//! - [`runner`] -- Simulation and snapshot schedules with clean shutdown.
//! - [`tick`] -- Time-delta advancement of every city.
//!
//! [`BalanceLookup`]: balance::BalanceLookup

pub mod balance;
pub mod commands;
pub mod config;
pub mod coordinator;
pub mod runner;
pub mod tick;
