//! Audit prompt sent to every provider.

use crate::model::TrackedTarget;
use crate::normalize::MAX_MARKET_LEADERS;

/// Render the audit prompt for one tracked target.
pub fn audit_prompt(target: &TrackedTarget) -> String {
    let brand = sanitize(&target.brand);
    let category = sanitize(&target.category);
    let use_case = sanitize(&target.use_case);

    format!(
        r#"Act as a senior market analyst with live web search.
Audit '{brand}' (Category: {category}) for the use case '{use_case}'.

1. Identify the 5 most important decision vectors buyers use for this use case.
   Assign each an importance weight; the weights must sum to 100.
2. For every vector, state whether it is Quantitative or Qualitative, the KPI
   that measures it, how you sourced it, and the key web sources you relied on,
   each with a confidence score from 1 to 10.
3. Score '{brand}' from 0 to 10 on every vector, estimate its market rank, and
   cite one piece of evidence per vector.
4. List up to {max_leaders} market leaders for this use case (excluding '{brand}')
   with the same rank, scores and citations.

Output STRICT JSON only, no commentary:
{{
  "market_vectors": {{"<vector>": <weight>}},
  "vector_definitions": {{
    "<vector>": {{
      "type": "Quantitative" | "Qualitative",
      "kpi": "<kpi>",
      "source_logic": "<how this was sourced>",
      "key_sources": [{{"domain": "<domain>", "score": <1-10>}}]
    }}
  }},
  "target_brand_analysis": {{
    "rank": <integer>,
    "scores": {{"<vector>": <0-10>}},
    "citations": {{"<vector>": "<url or evidence>"}}
  }},
  "market_leaders": [
    {{"brand": "<name>", "rank": <integer>, "scores": {{"<vector>": <0-10>}}, "citations": {{"<vector>": "<url or evidence>"}}}}
  ]
}}
"#,
        max_leaders = MAX_MARKET_LEADERS,
    )
}

/// Quotes would let a target name break out of the prompt's quoting.
fn sanitize(s: &str) -> String {
    s.trim().replace(['\'', '"', '`'], "")
}
