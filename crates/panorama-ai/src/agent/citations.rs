//! Citations assembled from search results and resolved entities in memory.

use std::collections::HashSet;

use panorama_traits::WorkingMemory;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub kind: String,
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Search relevance; resolved entities carry `0.0`.
    #[serde(default)]
    pub score: f32,
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn entity_citation(memory: &WorkingMemory, kind: &str, id_key: &str, title_key: &str) -> Option<Citation> {
    let id = memory.id(id_key)?;
    let entity = memory.entity(kind)?;
    Some(Citation {
        kind: kind.to_string(),
        id: id.to_string(),
        title: str_field(entity, title_key).unwrap_or_else(|| format!("({})", kind)),
        url: None,
        score: 0.0,
    })
}

/// Search hits first, then the resolved project and note, de-duplicated by
/// kind and id.
pub fn build_citations(memory: &WorkingMemory) -> Vec<Citation> {
    let hits = memory
        .list("searchResults")
        .unwrap_or_default()
        .iter()
        .filter_map(|hit| {
            Some(Citation {
                kind: str_field(hit, "kind")?,
                id: str_field(hit, "id")?,
                title: str_field(hit, "title").unwrap_or_else(|| "(doc)".to_string()),
                url: str_field(hit, "url"),
                score: hit.get("score").and_then(Value::as_f64).unwrap_or_default() as f32,
            })
        });
    let entities = [
        entity_citation(memory, "project", "projectId", "name"),
        entity_citation(memory, "note", "noteId", "title"),
    ];

    let mut seen = HashSet::new();
    hits.chain(entities.into_iter().flatten())
        .filter(|c| seen.insert((c.kind.clone(), c.id.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_empty_memory_has_no_citations() {
        assert!(build_citations(&WorkingMemory::new()).is_empty());
    }

    #[test]
    fn test_search_results_and_entities_deduplicated() {
        let mut memory = WorkingMemory::new();
        memory.set_list(
            "searchResults",
            vec![
                json!({"kind": "project", "id": "p1", "title": "Website Redesign", "url": null, "score": 0.9}),
                json!({"kind": "link", "id": "k1", "title": "Design doc", "url": "https://example.com", "score": 0.7}),
                json!({"kind": "task", "title": "no id"}),
            ],
        );
        memory.set_id("projectId", "p1");
        memory.set_entity("project", json!({"name": "Website Redesign"}));
        memory.set_id("noteId", "n1");
        memory.set_entity("note", json!({"title": "Kickoff"}));

        let citations = build_citations(&memory);
        assert_eq!(citations.len(), 3);
        assert_eq!(citations[0].score, 0.9);
        assert_eq!(citations[1].url.as_deref(), Some("https://example.com"));
        assert_eq!(citations[2].kind, "note");
        assert_eq!(citations[2].title, "Kickoff");
    }

    #[test]
    fn test_every_citation_serializes_a_score() {
        let mut memory = WorkingMemory::new();
        memory.set_list(
            "searchResults",
            vec![json!({"kind": "link", "id": "k1", "title": "Design doc"})],
        );
        memory.set_id("projectId", "p1");
        memory.set_entity("project", json!({"name": "Website Redesign"}));

        let citations = build_citations(&memory);
        assert_eq!(citations.len(), 2);
        assert!(citations.iter().all(|c| c.score == 0.0));

        let wire = serde_json::to_value(&citations[1]).unwrap();
        assert_eq!(
            wire,
            json!({"kind": "project", "id": "p1", "title": "Website Redesign", "score": 0.0})
        );
    }
}
