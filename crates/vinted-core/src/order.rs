use serde::{Deserialize, Serialize};

/// Sort order accepted by the catalog search endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchOrder {
    #[default]
    NewestFirst,
    Relevance,
    PriceHighToLow,
    PriceLowToHigh,
}

impl SearchOrder {
    /// Parses a wire value, falling back to [`SearchOrder::NewestFirst`] for
    /// anything unrecognized.
    ///
    /// Surrounding whitespace is ignored, so a padded path segment such as
    /// `"relevance "` still selects its order. Matching is otherwise exact:
    /// `"Relevance"` falls back.
    #[must_use]
    pub fn parse_lossy(raw: &str) -> Self {
        match raw.trim() {
            "relevance" => Self::Relevance,
            "price_high_to_low" => Self::PriceHighToLow,
            "price_low_to_high" => Self::PriceLowToHigh,
            _ => Self::NewestFirst,
        }
    }

    /// The value sent as the `order` query parameter.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NewestFirst => "newest_first",
            Self::Relevance => "relevance",
            Self::PriceHighToLow => "price_high_to_low",
            Self::PriceLowToHigh => "price_low_to_high",
        }
    }
}

impl std::fmt::Display for SearchOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
