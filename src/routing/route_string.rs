//! Diagnostic rendering of map paths.

use crate::routing::matcher::MatchOutcome;
use crate::routing::specified::{NodeKind, SpecifiedRouting};

/// Render the nodes a successful match walked, e.g. `GRB-AA-CHI-STL`.
///
/// Location nodes with several codes render as `DFW/RDU`. Returns an empty
/// string for failed matches.
pub fn walked_route(graphs: &[&SpecifiedRouting], outcome: &MatchOutcome) -> String {
    outcome
        .path
        .iter()
        .filter_map(|&(g, n)| graphs.get(g).map(|graph| graph.node(n)))
        .map(|node| {
            let codes: Vec<&str> = node.codes.iter().map(String::as_str).collect();
            match node.kind {
                NodeKind::Any => "*".to_string(),
                _ => codes.join("/"),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}
