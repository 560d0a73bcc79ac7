//! Maximal Marginal Relevance (MMR) selection.
//!
//! MMR picks results one at a time, each maximising
//! `λ × sim(query, doc) − (1 − λ) × max(sim(doc, selected))`.
//!
//! λ = 1.0 is pure relevance, λ = 0.0 is pure diversity.

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Select up to `k` candidate indices by maximal marginal relevance.
///
/// `candidates` should be ordered by descending relevance; ties in MMR score
/// go to the earlier candidate, so the selection is deterministic.
pub fn mmr_select(query: &[f32], candidates: &[&[f32]], k: usize, lambda: f32) -> Vec<usize> {
    if candidates.is_empty() || k == 0 {
        return Vec::new();
    }

    let relevance: Vec<f32> = candidates.iter().map(|c| cosine_similarity(query, c)).collect();
    // Highest similarity of each candidate to anything selected so far.
    let mut redundancy = vec![f32::NEG_INFINITY; candidates.len()];
    let mut selected: Vec<usize> = Vec::with_capacity(k.min(candidates.len()));

    while selected.len() < k.min(candidates.len()) {
        let mut best: Option<(usize, f32)> = None;
        for (idx, rel) in relevance.iter().enumerate() {
            if selected.contains(&idx) {
                continue;
            }
            let penalty = if selected.is_empty() { 0.0 } else { redundancy[idx] };
            let score = lambda * rel - (1.0 - lambda) * penalty;
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((idx, score));
            }
        }

        let Some((chosen, _)) = best else { break };
        selected.push(chosen);

        for (idx, candidate) in candidates.iter().enumerate() {
            let sim = cosine_similarity(candidates[chosen], candidate);
            if sim > redundancy[idx] {
                redundancy[idx] = sim;
            }
        }
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[2.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn empty_input_selects_nothing() {
        assert!(mmr_select(&[1.0, 0.0], &[], 5, 0.5).is_empty());
        assert!(mmr_select(&[1.0, 0.0], &[&[1.0, 0.0]], 0, 0.5).is_empty());
    }

    #[test]
    fn first_pick_is_most_relevant() {
        let a = [0.9f32, 0.1];
        let b = [1.0f32, 0.0];
        let picked = mmr_select(&[1.0, 0.0], &[&a, &b], 1, 0.5);
        assert_eq!(picked, vec![1]);
    }

    #[test]
    fn diversity_skips_near_duplicates() {
        let query = [1.0f32, 0.0, 0.0];
        let top = [0.8f32, 0.6, 0.0];
        let duplicate = [0.79f32, 0.61, 0.0];
        let different = [0.7f32, -0.7, 0.0];

        let picked = mmr_select(&query, &[&top, &duplicate, &different], 2, 0.5);
        assert_eq!(picked, vec![0, 2]);

        // pure relevance keeps the duplicate
        let picked = mmr_select(&query, &[&top, &duplicate, &different], 2, 1.0);
        assert_eq!(picked, vec![0, 1]);
    }

    #[test]
    fn returns_at_most_candidate_count() {
        let a = [1.0f32, 0.0];
        let b = [0.0f32, 1.0];
        let picked = mmr_select(&[1.0, 1.0], &[&a, &b], 5, 0.5);
        assert_eq!(picked.len(), 2);
    }
}
