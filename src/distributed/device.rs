// SPDX-License-Identifier: MIT OR Apache-2.0

//! Static cluster roster

use crate::error::{CepFlowError, CepFlowResult};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};

/// One peer in the cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub addr: IpAddr,
    pub port: u16,
    /// Stable peer name, unique across the roster
    pub urn: String,
    /// Shared secret echoed in every frame from this peer
    pub id_key: String,
}

impl Device {
    pub fn new(
        addr: IpAddr,
        port: u16,
        urn: impl Into<String>,
        id_key: impl Into<String>,
    ) -> CepFlowResult<Self> {
        let urn = urn.into();
        let id_key = id_key.into();
        if urn.is_empty() || urn.contains(' ') {
            return Err(CepFlowError::invalid_parameter_with_name(
                "must be non-empty and contain no spaces",
                "urn",
            ));
        }
        if id_key.is_empty() || id_key.contains(' ') {
            return Err(CepFlowError::invalid_parameter_with_name(
                "must be non-empty and contain no spaces",
                "id_key",
            ));
        }
        Ok(Self {
            addr,
            port,
            urn,
            id_key,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.addr, self.port)
    }
}

/// The full cluster membership, including the local device
#[derive(Debug, Clone, Default)]
pub struct DeviceRoster {
    devices: Vec<Device>,
}

impl DeviceRoster {
    pub fn new(devices: Vec<Device>) -> CepFlowResult<Self> {
        for (i, device) in devices.iter().enumerate() {
            if devices[..i].iter().any(|d| d.urn == device.urn) {
                return Err(CepFlowError::duplicate_name(&device.urn, "device roster"));
            }
        }
        Ok(Self { devices })
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn by_urn(&self, urn: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.urn == urn)
    }

    /// Whether any roster entry listens on the given address
    pub fn knows_addr(&self, addr: IpAddr) -> bool {
        self.devices.iter().any(|d| d.addr == addr)
    }

    /// Every device except the named one
    pub fn others<'a>(&'a self, urn: &'a str) -> impl Iterator<Item = &'a Device> {
        self.devices.iter().filter(move |d| d.urn != urn)
    }
}
