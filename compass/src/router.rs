use std::collections::HashMap;

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_with::serde_as;

use crate::concepts::neighbour::Neighbour;
use crate::concepts::packet::{DistanceVector, OutboundPacket, Packet, PacketKind};
use crate::concepts::route::Route;
use crate::framework::{Cost, RouterBehaviour, RoutingSystem};
use crate::util::sum_inf;

/// A distance-vector router.
///
/// Owns no I/O and no clock: the simulator invokes the event handlers and
/// drains `outbound_packets` after each one. All knowledge is local, the
/// attached links plus whatever neighbours have advertised over them.
#[serde_as]
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Router<T: RoutingSystem + ?Sized> {
    pub address: T::NodeAddress,
    /// directly attached links, at most one per local port
    #[serde_as(as = "Vec<(_, _)>")]
    pub links: HashMap<T::Port, Neighbour<T>>,
    /// best known cost and forwarding port per destination
    #[serde_as(as = "Vec<(_, _)>")]
    pub routes: HashMap<T::NodeAddress, Route<T>>,
    pub outbound_packets: Vec<OutboundPacket<T>>,
    pub heartbeat_ms: u64,
    pub last_broadcast_ms: u64,
}

impl<T: RoutingSystem> Router<T> {
    pub fn new(address: T::NodeAddress, heartbeat_ms: u64) -> Self {
        let mut routes = HashMap::new();
        // a router is always at distance zero from itself
        routes.insert(
            address.clone(),
            Route {
                metric: 0,
                port: None,
            },
        );
        Self {
            address,
            links: HashMap::new(),
            routes,
            outbound_packets: Vec::new(),
            heartbeat_ms,
            last_broadcast_ms: 0,
        }
    }

    // region Table access
    pub fn metric_to(&self, dest: &T::NodeAddress) -> Option<Cost> {
        self.routes.get(dest).map(|route| route.metric)
    }

    pub fn port_to(&self, dest: &T::NodeAddress) -> Option<&T::Port> {
        self.routes.get(dest).and_then(|route| route.port.as_ref())
    }

    /// Renders the current tables for visualizers and debug output.
    pub fn table_summary(&self) -> String {
        let mut lines: Vec<String> = self
            .routes
            .iter()
            .map(|(dest, route)| match &route.port {
                Some(port) => format!(
                    "{} metric={} port={}",
                    json!(dest),
                    route.metric,
                    json!(port)
                ),
                None => format!("{} metric={}", json!(dest), route.metric),
            })
            .collect();
        lines.sort();
        lines.join("\n")
    }
    // endregion

    // region Update engine
    /// The only write path into the distance table. Accepts `candidate` iff
    /// it is strictly better than the installed metric, or arrives via the
    /// installed forwarding port: the current next hop always speaks with
    /// authority about its own path, even when the news is worse.
    fn apply_cost(&mut self, dest: &T::NodeAddress, candidate: Cost, via: &T::Port) -> bool {
        if *dest == self.address {
            // distance[self] is pinned at zero
            return false;
        }
        let infinity = T::config().infinity;
        let candidate = candidate.min(infinity);
        match self.routes.get_mut(dest) {
            Some(route) => {
                if candidate >= route.metric && route.port.as_ref() != Some(via) {
                    return false;
                }
                let port = (candidate < infinity).then(|| via.clone());
                let changed = route.metric != candidate || route.port != port;
                route.metric = candidate;
                route.port = port;
                changed
            }
            None => {
                if candidate >= infinity {
                    // never heard of it and still unreachable, nothing to record
                    return false;
                }
                self.routes.insert(
                    dest.clone(),
                    Route {
                        metric: candidate,
                        port: Some(via.clone()),
                    },
                );
                true
            }
        }
    }

    /// Distributed Bellman-Ford relaxation for one received advertisement.
    fn apply_vector(&mut self, port: &T::Port, vector: DistanceVector<T>) {
        let infinity = T::config().infinity;
        let Some(neighbour) = self.links.get_mut(port) else {
            // stale delivery on a port whose link is already gone
            trace!("ignoring vector on unknown port {}", json!(port));
            return;
        };
        let link_cost = neighbour.link_cost;
        let from = neighbour.addr.clone();
        neighbour.advertised = vector
            .entries
            .iter()
            .map(|(dest, cost)| (dest.clone(), *cost))
            .collect();

        let mut changed = false;
        // the advertising neighbour is itself a destination over this link
        if !vector.entries.contains_key(&from) {
            changed |= self.apply_cost(&from, link_cost, port);
        }
        for (dest, advertised) in &vector.entries {
            let candidate = sum_inf(link_cost, *advertised, infinity);
            changed |= self.apply_cost(dest, candidate, port);
        }
        if changed {
            self.broadcast_vector();
        }
    }

    /// Re-derives the best cost for `dest` from the entire remaining link
    /// table: direct link costs plus every neighbour's cached advertisement.
    fn recompute(&mut self, dest: &T::NodeAddress) -> bool {
        let infinity = T::config().infinity;
        let mut best = infinity;
        let mut best_port: Option<T::Port> = None;
        for (port, neighbour) in &self.links {
            let mut via = if neighbour.addr == *dest {
                neighbour.link_cost
            } else {
                infinity
            };
            if let Some(advertised) = neighbour.advertised.get(dest) {
                via = via.min(sum_inf(neighbour.link_cost, *advertised, infinity));
            }
            if via < best {
                best = via;
                best_port = Some(port.clone());
            }
        }
        let Some(route) = self.routes.get_mut(dest) else {
            return false;
        };
        let changed = route.metric != best || route.port != best_port;
        route.metric = best;
        route.port = best_port;
        changed
    }

    /// Removes the link on `port`, if any, and re-relaxes every destination
    /// that was forwarded through it. Returns whether any entry changed.
    fn detach(&mut self, port: &T::Port) -> bool {
        if self.links.remove(port).is_none() {
            return false;
        }
        let orphaned: Vec<T::NodeAddress> = self
            .routes
            .iter()
            .filter(|(_, route)| route.port.as_ref() == Some(port))
            .map(|(dest, _)| dest.clone())
            .collect();
        let mut changed = false;
        for dest in &orphaned {
            changed |= self.recompute(dest);
        }
        changed
    }
    // endregion

    // region Broadcast
    /// Emits this router's own vector to every neighbour, applying poison
    /// reverse per port: a destination reached through a port is advertised
    /// to that port as unreachable.
    pub fn broadcast_vector(&mut self) {
        let infinity = T::config().infinity;
        let mut queued = Vec::new();
        for (port, neighbour) in &self.links {
            let mut vector = DistanceVector::<T>::default();
            for (dest, route) in &self.routes {
                let metric = if route.port.as_ref() == Some(port) {
                    infinity
                } else {
                    route.metric
                };
                vector.entries.insert(dest.clone(), metric);
            }
            match vector.encode() {
                Ok(payload) => queued.push(OutboundPacket {
                    port: port.clone(),
                    packet: Packet::routing(self.address.clone(), neighbour.addr.clone(), payload),
                }),
                Err(err) => debug!("{} failed to encode vector: {err}", json!(self.address)),
            }
        }
        self.outbound_packets.extend(queued);
    }
    // endregion

    // region Event handlers
    pub fn handle_packet(&mut self, port: &T::Port, packet: Packet<T>) {
        match packet.kind {
            PacketKind::Routing => match DistanceVector::decode(&packet.payload) {
                Ok(vector) => self.apply_vector(port, vector),
                Err(err) => debug!(
                    "{} dropping routing packet from {}: {err}",
                    json!(self.address),
                    json!(packet.src)
                ),
            },
            PacketKind::Data => self.forward_data(packet),
        }
    }

    /// Forwards a data packet along the current best path, or drops it.
    fn forward_data(&mut self, packet: Packet<T>) {
        if packet.dst == self.address {
            return;
        }
        match self.routes.get(&packet.dst).and_then(|route| route.port.clone()) {
            Some(port) => self.outbound_packets.push(OutboundPacket { port, packet }),
            None => trace!(
                "{} dropping data packet for unreachable {}",
                json!(self.address),
                json!(packet.dst)
            ),
        }
    }

    pub fn handle_new_link(&mut self, port: T::Port, neighbour: T::NodeAddress, cost: Cost) {
        let infinity = T::config().infinity;
        // a port carries at most one link, an occupied port is torn down first
        let mut changed = self.detach(&port);
        self.links
            .insert(port.clone(), Neighbour::new(neighbour.clone(), cost.min(infinity)));
        changed |= self.apply_cost(&neighbour, cost, &port);
        if changed {
            self.broadcast_vector();
        }
    }

    pub fn handle_remove_link(&mut self, port: &T::Port) {
        if self.detach(port) {
            self.broadcast_vector();
        }
    }

    pub fn handle_time(&mut self, now_ms: u64) {
        // level-triggered: a late tick still fires the pending heartbeat.
        // event-triggered broadcasts never reset this timer
        if now_ms.saturating_sub(self.last_broadcast_ms) >= self.heartbeat_ms {
            self.broadcast_vector();
            self.last_broadcast_ms = now_ms;
        }
    }
    // endregion
}

impl<T: RoutingSystem> RouterBehaviour<T> for Router<T> {
    fn address(&self) -> &T::NodeAddress {
        &self.address
    }

    fn handle_packet(&mut self, port: &T::Port, packet: Packet<T>) {
        Router::handle_packet(self, port, packet);
    }

    fn handle_new_link(&mut self, port: T::Port, neighbour: T::NodeAddress, cost: Cost) {
        Router::handle_new_link(self, port, neighbour, cost);
    }

    fn handle_remove_link(&mut self, port: &T::Port) {
        Router::handle_remove_link(self, port);
    }

    fn handle_time(&mut self, now_ms: u64) {
        Router::handle_time(self, now_ms);
    }

    fn drain_outbound(&mut self) -> Vec<OutboundPacket<T>> {
        self.outbound_packets.drain(..).collect()
    }
}
