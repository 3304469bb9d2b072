// Reciprocal Rank Fusion (RRF) over retrieval hits

use std::collections::HashMap;

use docrag_core::types::{Payload, PointId, RetrievalHit};

/// Standard RRF k parameter (Cormack, Clarke and Buettcher, SIGIR 2009).
pub const RRF_K: usize = 60;

struct Fused {
    id: PointId,
    score: f64,
    payload_len: usize,
    payload: Payload,
}

fn serialized_len(payload: &Payload) -> usize {
    serde_json::to_string(payload).map(|s| s.len()).unwrap_or_default()
}

/// Merge a dense and a lexical ranking with RRF.
///
/// RRF_score(d) = sum_r 1 / (k + rank_r(d)), ranks 1-indexed. Only ranks
/// matter, raw scores are ignored. For an id present in both lists the
/// payload with the longer JSON serialization is kept, the first one seen on a
/// tie. Equal fused scores keep first-seen order (dense before lexical).
pub fn rrf_fuse(dense: &[RetrievalHit], lexical: &[RetrievalHit], limit: usize, k: usize) -> Vec<RetrievalHit> {
    let k_param = k as f64;
    let mut slots: Vec<Fused> = Vec::new();
    let mut by_id: HashMap<PointId, usize> = HashMap::new();

    for ranking in [dense, lexical] {
        for (rank, hit) in ranking.iter().enumerate() {
            let contribution = 1.0 / (k_param + (rank + 1) as f64);
            let len = serialized_len(&hit.payload);
            match by_id.get(&hit.id) {
                Some(&idx) => {
                    let slot = &mut slots[idx];
                    slot.score += contribution;
                    if slot.payload_len < len {
                        slot.payload_len = len;
                        slot.payload = hit.payload.clone();
                    }
                }
                None => {
                    by_id.insert(hit.id, slots.len());
                    slots.push(Fused { id: hit.id, score: contribution, payload_len: len, payload: hit.payload.clone() });
                }
            }
        }
    }

    // sort_by is stable
    slots.sort_by(|a, b| b.score.total_cmp(&a.score));
    slots
        .into_iter()
        .take(limit)
        .map(|s| RetrievalHit { id: s.id, score: s.score as f32, payload: s.payload })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hit(id: PointId, text: &str) -> RetrievalHit {
        let mut payload = Payload::new();
        payload.insert("text".into(), json!(text));
        RetrievalHit { id, score: 0.0, payload }
    }

    fn ids(hits: &[RetrievalHit]) -> Vec<PointId> {
        hits.iter().map(|h| h.id).collect()
    }

    #[test]
    fn shared_hit_ranks_first() {
        let dense = vec![hit(1, "a"), hit(2, "b"), hit(3, "c")];
        let lexical = vec![hit(2, "b"), hit(4, "d")];

        let fused = rrf_fuse(&dense, &lexical, 10, RRF_K);

        assert_eq!(fused[0].id, 2);
        assert!(ids(&fused).contains(&4));
        assert_eq!(fused.len(), 4);
        let expected = 1.0 / 62.0 + 1.0 / 61.0;
        assert!((f64::from(fused[0].score) - expected).abs() < 1e-6);
    }

    #[test]
    fn result_is_truncated_to_limit() {
        let dense = vec![hit(1, "a"), hit(2, "b"), hit(3, "c")];
        let lexical = vec![hit(2, "b"), hit(4, "d")];
        assert_eq!(rrf_fuse(&dense, &lexical, 2, RRF_K).len(), 2);
        assert!(rrf_fuse(&dense, &lexical, 0, RRF_K).is_empty());
    }

    #[test]
    fn ties_keep_first_seen_order() {
        // 1 and 5 both sit at rank 1 of one list
        let fused = rrf_fuse(&[hit(1, "a")], &[hit(5, "e")], 10, RRF_K);
        assert_eq!(ids(&fused), vec![1, 5]);
    }

    #[test]
    fn single_ranker_preserves_order() {
        let fused = rrf_fuse(&[], &[hit(7, "x"), hit(8, "y"), hit(9, "z")], 10, RRF_K);
        assert_eq!(ids(&fused), vec![7, 8, 9]);
        assert!(rrf_fuse(&[], &[], 10, RRF_K).is_empty());
    }

    #[test]
    fn longer_payload_wins() {
        let mut richer = hit(1, "same text");
        richer.payload.insert("file_name".into(), json!("manual.pdf"));
        let fused = rrf_fuse(&[hit(1, "same text")], &[richer], 10, RRF_K);
        assert_eq!(fused[0].file_name(), Some("manual.pdf"));

        // equal length keeps the dense payload
        let fused = rrf_fuse(&[hit(1, "aaa")], &[hit(1, "bbb")], 10, RRF_K);
        assert_eq!(fused[0].text(), Some("aaa"));
    }

    #[test]
    fn fusion_is_deterministic() {
        let dense = vec![hit(3, "c"), hit(1, "a"), hit(2, "b")];
        let lexical = vec![hit(2, "b"), hit(3, "c"), hit(6, "f")];
        assert_eq!(rrf_fuse(&dense, &lexical, 5, RRF_K), rrf_fuse(&dense, &lexical, 5, RRF_K));
    }
}
