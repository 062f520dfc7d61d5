use compass::concepts::packet::{OutboundPacket, Packet, PacketKind};
use compass::framework::{Cost, RoutingSystem};
use compass::router::Router;
use serde::{Deserialize, Serialize};

/// Milliseconds of simulated time per tick.
pub const TICK_MS: u64 = 100;
/// Heartbeat configured into every router of the virtual network.
pub const HEARTBEAT_MS: u64 = 400;

#[derive(Serialize, Deserialize)]
pub struct VirtualLink {
    pub id: u32,
    pub a: String,
    pub b: String,
    pub cost: Cost,
    /// delivery delay in whole ticks
    pub latency: u64,
}

/// A packet on the wire, due for delivery at `due_tick`.
#[derive(Serialize, Deserialize)]
pub struct Delivery {
    pub due_tick: u64,
    pub to: String,
    pub port: u32,
    pub packet: Packet<VirtualSystem>,
}

/// An in-memory network of routers and edge hosts. Links use their id as the
/// local port number on both ends. Hosts speak no routing protocol; they only
/// source and sink traceroute-style data packets.
#[derive(Serialize, Deserialize)]
pub struct VirtualSystem {
    pub routers: Vec<Router<VirtualSystem>>,
    pub hosts: Vec<String>,
    pub links: Vec<VirtualLink>,
    pub in_flight: Vec<Delivery>,
    /// data packets that reached their destination host
    pub delivered: Vec<Packet<VirtualSystem>>,
    pub now_ticks: u64,
}

impl RoutingSystem for VirtualSystem {
    type NodeAddress = String;
    type Port = u32;
}

impl VirtualSystem {
    pub fn create(nodes: &[&str], links: &[(u32, &str, &str, Cost)]) -> VirtualSystem {
        let mut net = VirtualSystem {
            routers: nodes
                .iter()
                .map(|id| Router::new(id.to_string(), HEARTBEAT_MS))
                .collect(),
            hosts: Vec::new(),
            links: Vec::new(),
            in_flight: Vec::new(),
            delivered: Vec::new(),
            now_ticks: 0,
        };
        for (id, a, b, cost) in links {
            net.add_link(*id, a, b, *cost);
        }
        net
    }

    pub fn add_host(&mut self, addr: &str) {
        self.hosts.push(addr.to_string());
    }

    pub fn add_link(&mut self, id: u32, a: &str, b: &str, cost: Cost) {
        self.add_link_with_latency(id, a, b, cost, 1);
    }

    /// Registers (or replaces) a link and announces it to both endpoints.
    pub fn add_link_with_latency(&mut self, id: u32, a: &str, b: &str, cost: Cost, latency: u64) {
        self.links.retain(|link| link.id != id);
        self.links.push(VirtualLink {
            id,
            a: a.to_string(),
            b: b.to_string(),
            cost,
            latency,
        });
        if let Some(router) = self.router_mut(a) {
            router.handle_new_link(id, b.to_string(), cost);
        }
        if let Some(router) = self.router_mut(b) {
            router.handle_new_link(id, a.to_string(), cost);
        }
        self.flush();
    }

    pub fn remove_link(&mut self, id: u32) {
        let Some(pos) = self.links.iter().position(|link| link.id == id) else {
            return;
        };
        let link = self.links.remove(pos);
        if let Some(router) = self.router_mut(&link.a) {
            router.handle_remove_link(&id);
        }
        if let Some(router) = self.router_mut(&link.b) {
            router.handle_remove_link(&id);
        }
        self.flush();
    }

    pub fn get_node(&mut self, node: &str) -> &mut Router<VirtualSystem> {
        self.router_mut(node)
            .unwrap_or_else(|| panic!("No node {node} found"))
    }

    fn router_mut(&mut self, addr: &str) -> Option<&mut Router<VirtualSystem>> {
        self.routers.iter_mut().find(|r| r.address == addr)
    }

    pub fn get_metric_to(&self, cur: &str, dest: &str) -> Cost {
        let router = self
            .routers
            .iter()
            .find(|r| r.address == cur)
            .unwrap_or_else(|| panic!("No node {cur} found"));
        router
            .metric_to(&dest.to_string())
            .unwrap_or_else(|| panic!("No route found to {dest}"))
    }

    /// The neighbour the current best path to `dest` departs towards, or
    /// None when there is no forwarding entry.
    pub fn get_next_hop(&self, cur: &str, dest: &str) -> Option<String> {
        let router = self
            .routers
            .iter()
            .find(|r| r.address == cur)
            .unwrap_or_else(|| panic!("No node {cur} found"));
        let port = router.port_to(&dest.to_string())?;
        router.links.get(port).map(|n| n.addr.clone())
    }

    /// Injects a traceroute-style data packet from an edge host.
    pub fn send_data(&mut self, src: &str, dst: &str) {
        let Some(link) = self
            .links
            .iter()
            .find(|link| link.a == src || link.b == src)
        else {
            return;
        };
        let to = if link.a == src {
            link.b.clone()
        } else {
            link.a.clone()
        };
        let mut packet = Packet::data(src.to_string(), dst.to_string(), String::new());
        packet.record_hop(to.clone());
        self.in_flight.push(Delivery {
            due_tick: self.now_ticks + link.latency.max(1),
            to,
            port: link.id,
            packet,
        });
    }

    /// The route trace of the most recently delivered (src, dst) data packet.
    pub fn delivered_route(&self, src: &str, dst: &str) -> Option<Vec<String>> {
        self.delivered
            .iter()
            .rev()
            .find(|p| p.src == src && p.dst == dst)
            .map(|p| p.route().to_vec())
    }

    /// Moves freshly queued outbound packets onto the wire.
    fn flush(&mut self) {
        let mut queued: Vec<(String, OutboundPacket<VirtualSystem>)> = Vec::new();
        for router in &mut self.routers {
            let from = router.address.clone();
            for out in router.outbound_packets.drain(..) {
                queued.push((from.clone(), out));
            }
        }
        for (from, out) in queued {
            let Some(link) = self.links.iter().find(|link| link.id == out.port) else {
                continue; // the link went down with the packet still queued
            };
            let to = if link.a == from {
                link.b.clone()
            } else if link.b == from {
                link.a.clone()
            } else {
                continue;
            };
            let mut packet = out.packet;
            packet.record_hop(to.clone());
            self.in_flight.push(Delivery {
                due_tick: self.now_ticks + link.latency.max(1),
                to,
                port: out.port,
                packet,
            });
        }
    }

    /// One scheduling round: deliver everything due, advance every router's
    /// clock, then flush freshly queued packets onto the wire.
    pub fn tick(&mut self) {
        self.now_ticks += 1;
        let mut due = Vec::new();
        let mut rest = Vec::new();
        for delivery in self.in_flight.drain(..) {
            if delivery.due_tick <= self.now_ticks {
                due.push(delivery);
            } else {
                rest.push(delivery);
            }
        }
        self.in_flight = rest;
        for delivery in due {
            if self.hosts.contains(&delivery.to) {
                // hosts ignore routing chatter
                if delivery.packet.kind == PacketKind::Data {
                    self.delivered.push(delivery.packet);
                }
                continue;
            }
            if let Some(router) = self.router_mut(&delivery.to) {
                router.handle_packet(&delivery.port, delivery.packet);
            }
        }
        let now_ms = self.now_ticks * TICK_MS;
        for router in &mut self.routers {
            router.handle_time(now_ms);
        }
        self.flush();
    }

    pub fn tick_n(&mut self, times: u64) {
        for _ in 0..times {
            self.tick();
        }
    }

    pub fn freeze(&self) -> String {
        serde_json::to_string(&self).unwrap()
    }

    pub fn restore(state: &str) -> VirtualSystem {
        serde_json::from_str(state).unwrap()
    }
}
