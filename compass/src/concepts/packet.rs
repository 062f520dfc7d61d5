use std::collections::BTreeMap;

use educe::Educe;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::feedback::WireError;
use crate::framework::{Cost, RoutingSystem};

/// Discriminates client traffic from routing control traffic.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum PacketKind {
    Data,
    Routing,
}

/// A packet as the network carries it. The payload is an opaque string to
/// everything but the routers at either end.
#[derive(Educe, Serialize, Deserialize)]
#[educe(Clone(bound()))]
#[serde(bound = "")]
pub struct Packet<T: RoutingSystem + ?Sized> {
    pub kind: PacketKind,
    pub src: T::NodeAddress,
    pub dst: T::NodeAddress,
    pub payload: String,
    /// every address this packet has visited, in order. appended by the
    /// delivering link, read-only to routers
    route: Vec<T::NodeAddress>,
}

impl<T: RoutingSystem + ?Sized> Packet<T> {
    pub fn data(src: T::NodeAddress, dst: T::NodeAddress, payload: String) -> Self {
        Self::new(PacketKind::Data, src, dst, payload)
    }

    pub fn routing(src: T::NodeAddress, dst: T::NodeAddress, payload: String) -> Self {
        Self::new(PacketKind::Routing, src, dst, payload)
    }

    fn new(kind: PacketKind, src: T::NodeAddress, dst: T::NodeAddress, payload: String) -> Self {
        let route = vec![src.clone()];
        Self {
            kind,
            src,
            dst,
            payload,
            route,
        }
    }

    pub fn route(&self) -> &[T::NodeAddress] {
        &self.route
    }

    /// Called by the delivering side when the packet traverses a link.
    pub fn record_hop(&mut self, addr: T::NodeAddress) {
        self.route.push(addr);
    }
}

/// A packet queued by a router for the owning simulator to put on the wire.
#[derive(Educe, Serialize, Deserialize)]
#[educe(Clone(bound()))]
#[serde(bound = "")]
pub struct OutboundPacket<T: RoutingSystem + ?Sized> {
    /// send through this local port
    pub port: T::Port,
    pub packet: Packet<T>,
}

/// The wire form of a routing advertisement: the sender's own believed cost
/// to every destination it knows, after poison reverse. This is the only
/// state a router ever transmits; received vectors are never relayed.
#[serde_as]
#[derive(Educe, Serialize, Deserialize)]
#[educe(Clone(bound()))]
#[serde(bound = "")]
pub struct DistanceVector<T: RoutingSystem + ?Sized> {
    #[serde_as(as = "Vec<(_, _)>")]
    pub entries: BTreeMap<T::NodeAddress, Cost>,
}

impl<T: RoutingSystem + ?Sized> Default for DistanceVector<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T: RoutingSystem + ?Sized> DistanceVector<T> {
    pub fn encode(&self) -> Result<String, WireError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(payload: &str) -> Result<Self, WireError> {
        Ok(serde_json::from_str(payload)?)
    }
}
