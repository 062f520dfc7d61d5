use educe::Educe;
use serde::{Deserialize, Serialize};

use crate::framework::{Cost, RoutingSystem};

/// A distance table entry.
///
/// The forwarding port is present exactly when the metric is finite and the
/// destination is not the router itself; an unreachable destination keeps its
/// entry (metric pinned at the sentinel) so the retraction is still advertised.
#[derive(Educe, Serialize, Deserialize)]
#[educe(Clone(bound()))]
#[serde(bound = "")]
pub struct Route<T: RoutingSystem + ?Sized> {
    /// best known cost to the destination
    pub metric: Cost,
    /// the local port the best path departs through
    pub port: Option<T::Port>,
}
