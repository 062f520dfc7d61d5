use std::hash::Hash;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::concepts::packet::{OutboundPacket, Packet};

/// Metric type shared by link costs and route distances.
pub type Cost = u16;

pub trait RoutingSystem {
    /// Address of a node on the routing network, MUST be globally unique
    type NodeAddress: Ord + PartialOrd + RootData + RootKey;
    /// Identifier of a local port, unique only within a single router
    type Port: Ord + PartialOrd + RootData + RootKey;
    fn config() -> ProtocolParams {
        Default::default()
    }
}

pub trait RootData: Clone + Serialize + DeserializeOwned + Sized {}
pub trait RootKey: Eq + PartialEq + Hash {}
impl<T: Eq + PartialEq + Hash> RootKey for T {}
impl<T: Clone + Serialize + DeserializeOwned + Sized> RootData for T {}

/// Protocol Parameters
pub struct ProtocolParams {
    /// Cost at or above which a destination is considered unreachable.
    /// Keeping this small bounds count-to-infinity on small-diameter networks.
    pub infinity: Cost,
}
impl Default for ProtocolParams {
    fn default() -> Self {
        Self { infinity: 16 }
    }
}

/// The event surface a router variant exposes to the owning simulator.
///
/// The simulator delivers every event serially per router, so implementations
/// hold plain mutable state and never lock. Handlers are total: no input,
/// however malformed or stale, may panic or return an error to the caller.
pub trait RouterBehaviour<T: RoutingSystem + ?Sized> {
    fn address(&self) -> &T::NodeAddress;
    /// A packet arrived on `port`.
    fn handle_packet(&mut self, port: &T::Port, packet: Packet<T>);
    /// A link to `neighbour` came up on `port`, replacing any previous link there.
    fn handle_new_link(&mut self, port: T::Port, neighbour: T::NodeAddress, cost: Cost);
    /// The link on `port` went down. Unknown ports are a no-op.
    fn handle_remove_link(&mut self, port: &T::Port);
    /// Periodic tick with the simulator's current clock.
    fn handle_time(&mut self, now_ms: u64);
    /// Packets queued for delivery since the last drain.
    fn drain_outbound(&mut self) -> Vec<OutboundPacket<T>>;
}
