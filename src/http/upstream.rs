//! Backend selection for admitted requests.
//!
//! Each application group maps to a fixed list of backend addresses. A
//! sticky session id pins a request to `id % len`; without one, backends
//! are taken in round-robin order.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;

use crate::config::UpstreamConfig;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("invalid upstream address {address:?} for app group {app_group:?}")]
    InvalidAddress { app_group: String, address: String },
}

/// Backends of one application group.
#[derive(Debug, Default)]
pub struct Upstream {
    addrs: Vec<SocketAddr>,
    counter: AtomicUsize,
}

/// A selected backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Position in the group's backend list; doubles as the sticky id.
    pub index: u32,
    pub addr: SocketAddr,
}

impl Upstream {
    pub fn new(addrs: Vec<SocketAddr>) -> Self {
        Self {
            addrs,
            counter: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.addrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }

    /// Pick a backend, honoring `sticky_id` when present.
    pub fn select(&self, sticky_id: Option<u32>) -> Option<Selection> {
        let len = self.addrs.len();
        if len == 0 {
            return None;
        }
        let index = match sticky_id {
            Some(id) => id as usize % len,
            None => self.counter.fetch_add(1, Ordering::Relaxed) % len,
        };
        Some(Selection {
            index: index as u32,
            addr: self.addrs[index],
        })
    }
}

/// App group name → backends.
#[derive(Debug, Default)]
pub struct UpstreamMap {
    groups: HashMap<String, Upstream>,
}

impl UpstreamMap {
    /// Build the map, preserving the configured order within each group.
    pub fn from_config(upstreams: &[UpstreamConfig]) -> Result<Self, UpstreamError> {
        let mut grouped: HashMap<String, Vec<SocketAddr>> = HashMap::new();
        for upstream in upstreams {
            let addr = upstream
                .address
                .parse()
                .map_err(|_| UpstreamError::InvalidAddress {
                    app_group: upstream.app_group.clone(),
                    address: upstream.address.clone(),
                })?;
            grouped.entry(upstream.app_group.clone()).or_default().push(addr);
        }

        let groups = grouped
            .into_iter()
            .map(|(group, addrs)| (group, Upstream::new(addrs)))
            .collect();
        Ok(Self { groups })
    }

    pub fn select(&self, app_group: &str, sticky_id: Option<u32>) -> Option<Selection> {
        self.groups.get(app_group)?.select(sticky_id)
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}
