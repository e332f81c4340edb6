//! Whole jobs on random edge lists, checked against a sequential union-find

use petgraph::unionfind::UnionFind;
use proptest::prelude::*;
use stargraph_dataflow::{EngineConfig, LocalEngine, SUCCESS_MARKER};
use stargraph_orchestration::{JobConfig, Orchestrator};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn union_find_components(edges: &[(u64, u64)]) -> BTreeMap<u64, u64> {
    let size = edges
        .iter()
        .map(|&(u, v)| u.max(v) as usize + 1)
        .max()
        .unwrap_or(0);
    let mut uf = UnionFind::<usize>::new(size);
    for &(u, v) in edges {
        uf.union(u as usize, v as usize);
    }

    let mut minimum: BTreeMap<usize, u64> = BTreeMap::new();
    for &(u, v) in edges {
        for node in [u, v] {
            let entry = minimum.entry(uf.find(node as usize)).or_insert(node);
            *entry = (*entry).min(node);
        }
    }

    edges
        .iter()
        .flat_map(|&(u, v)| [u, v])
        .map(|node| (node, minimum[&uf.find(node as usize)]))
        .collect()
}

/// Mapping from the shards, or `None` if some node appears twice
fn read_mapping(output: &Path) -> Option<BTreeMap<u64, u64>> {
    assert!(output.join(SUCCESS_MARKER).exists(), "missing success marker");

    let mut mapping = BTreeMap::new();
    for entry in fs::read_dir(output).unwrap() {
        let path = entry.unwrap().path();
        if !path.file_name().unwrap().to_string_lossy().starts_with("part-") {
            continue;
        }
        for line in fs::read_to_string(&path).unwrap().lines() {
            let (node, rep) = line.split_once(' ').unwrap();
            if mapping
                .insert(node.parse::<u64>().unwrap(), rep.parse::<u64>().unwrap())
                .is_some()
            {
                return None;
            }
        }
    }
    Some(mapping)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_job_output_matches_union_find(
        edges in prop::collection::vec((0u64..40, 0u64..40), 0..60),
        partitions in 1usize..6,
    ) {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("edges.txt");
        let text: String = edges.iter().map(|(u, v)| format!("{} {}\n", u, v)).collect();
        fs::write(&input, text).unwrap();
        let output = dir.path().join("out");

        let engine = LocalEngine::start(
            EngineConfig::default().with_workers(2).with_partitions(partitions),
        )
        .unwrap();
        let report = Orchestrator::new(&engine, JobConfig::new(&input, &output))
            .unwrap()
            .execute()
            .unwrap();

        let expected = union_find_components(&edges);
        let mapping = read_mapping(&output);
        prop_assert!(mapping.is_some(), "a node was written more than once");
        prop_assert_eq!(mapping.unwrap(), expected.clone());
        prop_assert_eq!(report.records, edges.len());
        prop_assert_eq!(report.nodes, expected.len());
    }
}
