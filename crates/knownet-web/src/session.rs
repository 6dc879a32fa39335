//! Per-conversation session state.
//!
//! A session owns the chat transcript and the step-staged graph derived from
//! it. The step advances when a new assistant turn completes; regenerating
//! the last answer re-extracts without advancing.

use chrono::{DateTime, Utc};
use std::collections::HashSet;

use knownet_common::config::KnownetConfig;
use knownet_graph::builder::{from_kg_payload, from_triples, VisEdge, VisNode};
use knownet_graph::layout::Direction;
use knownet_graph::model::FlowElements;
use knownet_graph::sync::StepGraph;
use knownet_kg::extraction::{Extraction, Triple};
use knownet_kg::verify::Verification;
use knownet_llm::Message;

pub struct ChatSession {
    pub id: String,
    pub messages: Vec<Message>,
    pub active_step: usize,
    pub direction: Direction,
    /// Entities the model recognized in the latest user question.
    pub question_entities: Vec<String>,
    pub created_at: DateTime<Utc>,
    graph: StepGraph,
    seen_triples: HashSet<String>,
}

impl ChatSession {
    pub fn new(id: String, high_level_terms: Vec<String>) -> Self {
        Self {
            id,
            messages: Vec::new(),
            active_step: 0,
            direction: Direction::default(),
            question_entities: Vec::new(),
            created_at: Utc::now(),
            graph: StepGraph::new(high_level_terms),
            seen_triples: HashSet::new(),
        }
    }

    /// Start an assistant turn and return the step it belongs to. The first
    /// exchange is step 0; later non-regeneration turns advance the step.
    pub fn begin_turn(&mut self, regenerate: bool) -> usize {
        if !self.messages.is_empty() && !regenerate {
            self.active_step += 1;
        }
        self.active_step
    }

    /// Append the finished exchange to the transcript. Only the prose part
    /// of the assistant response is kept.
    pub fn record_exchange(&mut self, user_messages: &[Message], assistant_prose: &str) {
        for m in user_messages {
            // The client resends the transcript each turn; keep only the tail
            // we have not recorded yet.
            if m.role == "user"
                && !self
                    .messages
                    .iter()
                    .any(|seen| seen.role == m.role && seen.content == m.content)
            {
                self.messages.push(m.clone());
            }
        }
        self.messages.push(Message::assistant(assistant_prose));
    }

    /// Merge an extraction into the graph at the current step, returning the
    /// triples not seen before (the ones worth verifying).
    pub fn ingest_extraction(&mut self, extraction: &Extraction) -> Vec<Triple> {
        let fresh: Vec<Triple> = extraction
            .triples
            .iter()
            .filter(|t| !self.seen_triples.contains(&t.key()))
            .cloned()
            .collect();
        if fresh.is_empty() {
            return fresh;
        }
        for t in &fresh {
            self.seen_triples.insert(t.key());
        }
        let batch = from_triples(&fresh, &extraction.entity_categories, self.active_step);
        self.graph.merge(batch, self.active_step);
        fresh
    }

    /// Merge a knowledge-graph subgraph payload at the current step.
    pub fn ingest_kg_payload(&mut self, nodes: &[VisNode], edges: &[VisEdge]) {
        let batch = from_kg_payload(nodes, edges, self.active_step);
        self.graph.merge(batch, self.active_step);
    }

    pub fn apply_verifications(&mut self, results: &[Verification]) {
        self.graph.apply_verifications(results);
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    /// Clamp and set the active step.
    pub fn set_step(&mut self, step: usize) {
        self.active_step = step.min(self.graph.max_step());
    }

    pub fn max_step(&self) -> usize {
        self.graph.max_step()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Laid-out, step-filtered view of the session graph.
    pub fn graph_view(&mut self, config: &KnownetConfig, step: Option<usize>) -> FlowElements {
        self.graph.relayout(self.direction, &config.layout);
        let step = step.unwrap_or(self.active_step).min(self.graph.max_step());
        self.graph.view(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knownet_kg::extraction::extract_annotations;

    fn session() -> ChatSession {
        ChatSession::new("s1".to_string(), vec!["supplement".into()])
    }

    #[test]
    fn test_step_advances_between_turns_not_on_regenerate() {
        let mut s = session();
        assert_eq!(s.begin_turn(false), 0);
        s.record_exchange(&[Message::user("q1")], "a1");
        assert_eq!(s.begin_turn(false), 1);
        s.record_exchange(&[Message::user("q2")], "a2");
        assert_eq!(s.begin_turn(true), 1);
    }

    #[test]
    fn test_transcript_dedups_resent_history() {
        let mut s = session();
        s.record_exchange(&[Message::user("q1")], "a1");
        s.record_exchange(
            &[Message::user("q1"), Message::user("q2")],
            "a2",
        );
        let users: Vec<_> = s.messages.iter().filter(|m| m.role == "user").collect();
        assert_eq!(users.len(), 2);
        assert_eq!(s.messages.len(), 4);
    }

    #[test]
    fn test_ingest_extraction_dedups_across_turns() {
        let mut s = session();
        let ex = extract_annotations(
            "[Fish Oil]($N1) can [reduce]($R1, $N1, $N2) [cognitive decline]($N2).",
        );
        let fresh = s.ingest_extraction(&ex);
        assert_eq!(fresh.len(), 1);
        assert_eq!(s.node_count(), 2);

        s.begin_turn(false);
        let again = s.ingest_extraction(&ex);
        assert!(again.is_empty());
        assert_eq!(s.node_count(), 2);
    }

    #[test]
    fn test_graph_view_clamps_step() {
        let mut s = session();
        let ex = extract_annotations("[a]($N1) [treats]($R1, $N1, $N2) [b]($N2).");
        s.ingest_extraction(&ex);
        let cfg = KnownetConfig::default();
        let view = s.graph_view(&cfg, Some(99));
        assert_eq!(view.nodes.len(), 2);
        assert!(view.nodes.iter().all(|n| n.opacity == 1.0));
    }
}
