//! Rank-based weight normalization.
//!
//! Nodes are sorted ascending by raw weight (stable, so ties keep their
//! incoming order) and the node at position `i` of `n` gets
//! `floor(i / n * 100) + 1`. The result is a ranking, not a proportional
//! split: only the order of raw weights matters.

use alb_registry::NodeEntry;

/// One `server` directive of an upstream block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedServer {
    /// `host:port`
    pub address: String,
    /// Normalized weight in `[1, 100]`.
    pub weight: u32,
}

impl WeightedServer {
    /// Directive text without indentation, e.g. `server 10.0.0.1:80 weight=34;`.
    pub fn directive(&self) -> String {
        format!("server {} weight={};", self.address, self.weight)
    }
}

/// Normalize a group's node list into upstream servers, in sorted order.
pub fn normalize(nodes: &[NodeEntry]) -> Vec<WeightedServer> {
    let mut sorted: Vec<&NodeEntry> = nodes.iter().collect();
    // `sort_by` is stable.
    sorted.sort_by(|a, b| a.weight.total_cmp(&b.weight));

    let n = sorted.len();
    sorted
        .into_iter()
        .enumerate()
        .map(|(i, node)| WeightedServer {
            address: format!("{}:{}", node.host, node.port),
            weight: rank_weight(i, n),
        })
        .collect()
}

/// `floor(position / size * 100) + 1`, computed in integers.
fn rank_weight(position: usize, size: usize) -> u32 {
    (position * 100 / size) as u32 + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(host: &str, weight: f64) -> NodeEntry {
        NodeEntry {
            host: host.to_string(),
            port: 80,
            weight,
        }
    }

    fn weights(servers: &[WeightedServer]) -> Vec<u32> {
        servers.iter().map(|s| s.weight).collect()
    }

    fn hosts(servers: &[WeightedServer]) -> Vec<&str> {
        servers
            .iter()
            .map(|s| s.address.split(':').next().unwrap())
            .collect()
    }

    #[test]
    fn empty_list_yields_no_servers() {
        assert!(normalize(&[]).is_empty());
    }

    #[test]
    fn three_sorted_nodes() {
        let servers = normalize(&[entry("a", 1.0), entry("b", 5.0), entry("c", 10.0)]);
        assert_eq!(weights(&servers), vec![1, 34, 67]);
    }

    #[test]
    fn unsorted_input_is_ranked() {
        let servers = normalize(&[entry("c", 10.0), entry("a", 1.0), entry("b", 5.0)]);
        assert_eq!(hosts(&servers), vec!["a", "b", "c"]);
        assert_eq!(weights(&servers), vec![1, 34, 67]);
    }

    #[test]
    fn ties_keep_incoming_order() {
        let servers = normalize(&[
            entry("x", 3.0),
            entry("first", 1.0),
            entry("second", 1.0),
            entry("third", 1.0),
        ]);
        assert_eq!(hosts(&servers), vec!["first", "second", "third", "x"]);
    }

    #[test]
    fn single_node_gets_one() {
        let servers = normalize(&[entry("a", 1000.0)]);
        assert_eq!(weights(&servers), vec![1]);
    }

    #[test]
    fn two_nodes_rank_one_and_fifty_one() {
        let servers = normalize(&[entry("a", 7.0), entry("b", 8.0)]);
        assert_eq!(weights(&servers), vec![1, 51]);
    }

    #[test]
    fn weights_stay_in_range_for_large_groups() {
        let nodes: Vec<NodeEntry> = (0..250).map(|i| entry("h", i as f64)).collect();
        let servers = normalize(&nodes);
        assert!(servers.iter().all(|s| (1..=100).contains(&s.weight)));
        assert_eq!(servers.first().unwrap().weight, 1);
        assert_eq!(servers.last().unwrap().weight, 100);
    }

    #[test]
    fn rank_ignores_magnitude() {
        let servers = normalize(&[entry("a", 0.001), entry("b", 1e9)]);
        assert_eq!(weights(&servers), vec![1, 51]);
    }

    #[test]
    fn directive_format() {
        let server = WeightedServer {
            address: "10.0.0.1:8080".to_string(),
            weight: 34,
        };
        assert_eq!(server.directive(), "server 10.0.0.1:8080 weight=34;");
    }
}
