//! Hosts (VPSs) that run advertising accounts and authenticate the ingestion job.

pub mod vps;

pub use vps::{display_hosts, HostedAccount, StatusTally, Vps, VpsDraft, MAX_ACCOUNTS_PER_HOST};
