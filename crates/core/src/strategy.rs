use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Direct,
    MapReduce,
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Direct => "direct",
            Strategy::MapReduce => "map_reduce",
        }
    }
}

/// Contexts up to `threshold_chars` go through a single generation call.
pub fn select_strategy(total_context_chars: usize, threshold_chars: usize) -> Strategy {
    if total_context_chars <= threshold_chars {
        Strategy::Direct
    } else {
        Strategy::MapReduce
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: usize = 3_200_000;

    #[test]
    fn small_corpus_is_direct() {
        assert_eq!(select_strategy(0, THRESHOLD), Strategy::Direct);
        assert_eq!(select_strategy(THRESHOLD, THRESHOLD), Strategy::Direct);
    }

    #[test]
    fn large_corpus_is_map_reduce() {
        assert_eq!(select_strategy(THRESHOLD + 1, THRESHOLD), Strategy::MapReduce);
    }

    #[test]
    fn names_match_wire_format() {
        for strategy in [Strategy::Direct, Strategy::MapReduce] {
            let json = serde_json::to_value(strategy).unwrap();
            assert_eq!(json, strategy.name());
        }
    }
}
