use std::collections::HashMap;

use anyhow::Result;
use compass::concepts::packet::OutboundPacket;
use compass::framework::{RouterBehaviour, RoutingSystem};
use compass::router::Router;
use log::LevelFilter;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

struct TinyNet {} // just a type to inform compass of your network parameters
impl RoutingSystem for TinyNet {
    type NodeAddress = String; // our nodes have string names
    type Port = u32;
}

fn main() -> Result<()> {
    TermLogger::init(
        LevelFilter::Debug,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )?;

    // we have the following connection: bob <-> eve <-> alice

    let mut nodes: HashMap<&str, Router<TinyNet>> = HashMap::new();

    let mut bob = Router::new("bob".to_string(), 1000);
    bob.handle_new_link(1, "eve".to_string(), 1);
    nodes.insert("bob", bob);

    let mut eve = Router::new("eve".to_string(), 1000);
    eve.handle_new_link(1, "bob".to_string(), 1);
    eve.handle_new_link(2, "alice".to_string(), 1);
    nodes.insert("eve", eve);

    let mut alice = Router::new("alice".to_string(), 1000);
    alice.handle_new_link(2, "eve".to_string(), 1);
    nodes.insert("alice", alice);

    // who sits on the far side of each (node, port)
    let wiring: &[((&str, u32), &str)] = &[
        (("bob", 1), "eve"),
        (("eve", 1), "bob"),
        (("eve", 2), "alice"),
        (("alice", 2), "eve"),
    ];

    // lets simulate routing!

    for step in 0..4u64 {
        deliver(&mut nodes, wiring);
        for node in nodes.values_mut() {
            node.handle_time(step * 1000);
        }
        println!("bob's routes in step {step}:");
        println!("{}", nodes["bob"].table_summary());
        println!();
    }

    // now drop the eve <-> alice link and watch the retraction propagate
    println!("removing the eve <-> alice link");
    if let Some(eve) = nodes.get_mut("eve") {
        eve.handle_remove_link(&2);
    }
    if let Some(alice) = nodes.get_mut("alice") {
        alice.handle_remove_link(&2);
    }

    for step in 4..7u64 {
        deliver(&mut nodes, wiring);
        for node in nodes.values_mut() {
            node.handle_time(step * 1000);
        }
        println!("bob's routes in step {step}:");
        println!("{}", nodes["bob"].table_summary());
        println!();
    }

    Ok(())
}

/// Collects every queued packet and hands it to the router at the far end.
fn deliver(nodes: &mut HashMap<&str, Router<TinyNet>>, wiring: &[((&str, u32), &str)]) {
    let packets: Vec<(String, OutboundPacket<TinyNet>)> = nodes
        .iter_mut()
        .flat_map(|(id, node)| {
            let from = id.to_string();
            node.drain_outbound()
                .into_iter()
                .map(move |packet| (from.clone(), packet))
                .collect::<Vec<_>>()
        })
        .collect();

    for (from, out) in packets {
        let dest = wiring
            .iter()
            .find(|entry| entry.0 .0 == from && entry.0 .1 == out.port)
            .map(|entry| entry.1);
        if let Some(node) = dest.and_then(|d| nodes.get_mut(d)) {
            node.handle_packet(&out.port, out.packet);
        }
    }
}
