use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::framework::{Cost, RoutingSystem};

/// A directly attached link, indexed in the router by the local port it occupies.
#[serde_as]
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Neighbour<T: RoutingSystem + ?Sized> {
    /// the routing network address of the other endpoint
    pub addr: T::NodeAddress,
    /// direct cost of this link, clamped to the infinity sentinel
    pub link_cost: Cost,
    /// the last vector applied from this neighbour, kept so any destination
    /// can be re-relaxed across all remaining links when this one changes
    #[serde_as(as = "Vec<(_, _)>")]
    pub advertised: HashMap<T::NodeAddress, Cost>,
}

impl<T: RoutingSystem + ?Sized> Neighbour<T> {
    pub fn new(addr: T::NodeAddress, link_cost: Cost) -> Self {
        Self {
            addr,
            link_cost,
            advertised: HashMap::new(),
        }
    }
}
