// ABOUTME: Foreign-key dependency graph over a set of participating tables
// ABOUTME: Queries constraint metadata and resolves edges to the caller's table names

use crate::utils::split_table;
use anyhow::{Context, Result};
use std::collections::HashMap;
use tokio_postgres::Client;

/// Outgoing foreign-key edges per table, restricted to the given tables.
///
/// An edge `a -> b` means `a` has a foreign key referencing `b`, so `a`'s rows
/// must be deleted before `b`'s and inserted after. Keys and edge targets use
/// the caller's own table spellings; constraints pointing at tables outside
/// the participating set are ignored, as are self-references (a row ordering
/// concern, not a table ordering one).
pub async fn foreign_key_graph(
    client: &Client,
    tables: &[String],
) -> Result<HashMap<String, Vec<String>>> {
    let rows = client
        .query(
            "SELECT tc.table_schema::text,
                    tc.table_name::text,
                    ctu.table_schema::text,
                    ctu.table_name::text
             FROM information_schema.table_constraints tc
             JOIN information_schema.constraint_table_usage ctu
               ON tc.constraint_name = ctu.constraint_name
              AND tc.constraint_schema = ctu.constraint_schema
             WHERE tc.constraint_type = 'FOREIGN KEY'",
            &[],
        )
        .await
        .context("Failed to query foreign key constraints")?;

    let raw_edges: Vec<(String, String, String, String)> = rows
        .iter()
        .map(|row| (row.get(0), row.get(1), row.get(2), row.get(3)))
        .collect();

    Ok(resolve_edges(tables, &raw_edges))
}

/// Resolve raw (child schema, child table, parent schema, parent table)
/// constraint rows against the participating table list.
fn resolve_edges(
    tables: &[String],
    raw_edges: &[(String, String, String, String)],
) -> HashMap<String, Vec<String>> {
    // Canonical spelling per (schema, name), as supplied by the caller.
    let canonical: HashMap<(&str, &str), &String> =
        tables.iter().map(|t| (split_table(t), t)).collect();

    let mut graph: HashMap<String, Vec<String>> =
        tables.iter().map(|t| (t.clone(), Vec::new())).collect();

    for (child_schema, child_name, parent_schema, parent_name) in raw_edges {
        let child = canonical.get(&(child_schema.as_str(), child_name.as_str()));
        let parent = canonical.get(&(parent_schema.as_str(), parent_name.as_str()));

        if let (Some(child), Some(parent)) = (child, parent) {
            if child == parent {
                continue;
            }
            let edges = graph.entry((*child).clone()).or_default();
            if !edges.contains(*parent) {
                edges.push((*parent).clone());
            }
        }
    }

    graph
}
