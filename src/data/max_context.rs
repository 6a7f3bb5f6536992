// ============================================================
// Layer 4 — Max-Context Resolver
// ============================================================
// With overlapping windows one subword can be scored by several
// windows. Only one of them should count: the window where the
// subword has the most context on both sides.
//
//   Doc:    the man went to the store and bought a gallon of milk
//   Span B: to the store and bought
//   Span C: and bought a gallon of
//
// "bought" has 4 left / 0 right context in B and 1 left / 3 right
// in C. The score is min(left, right) + 0.01 * span length, so C
// (score 1.05) owns it, not B (score 0.05).
//
// The 0.01 * length term breaks ties in favour of longer spans.

use crate::domain::feature::DocSpan;

/// True when span `cur_span_index` is the owner of subword `position`.
pub fn is_max_context(doc_spans: &[DocSpan], cur_span_index: usize, position: usize) -> bool {
    best_span_for(doc_spans, position) == Some(cur_span_index)
}

/// Index of the owning span for `position`, or None if no span covers it.
/// The first span reaching the maximum score wins.
pub fn best_span_for(doc_spans: &[DocSpan], position: usize) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;

    for (span_index, span) in doc_spans.iter().enumerate() {
        if !span.contains(position) {
            continue;
        }
        let end   = span.end_exclusive() - 1;
        let left  = position - span.start;
        let right = end - position;
        let score = left.min(right) as f64 + 0.01 * span.length as f64;

        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((span_index, score)),
        }
    }

    best.map(|(index, _)| index)
}
