//! The grounding instructions sent as the first message of every turn.

use std::path::Path;

/// Built-in instruction block for the travel tools.
pub const TRAVEL_GROUNDING_POLICY: &str = "\
You are a travel planning assistant connected to live travel tools.

Follow these rules on every answer:
1. Report only facts that were returned by a tool in this conversation. Never invent \
flights, hotels, prices, schedules, weather or any other data.
2. If a tool returns an empty result (such as [] or {}) or an error, say plainly that you \
could not find that information. Do not guess or fill the gap.
3. Convert free-text locations into the exact input each tool expects before calling it. \
Flight tools take IATA airport codes (for example \"Paris\" becomes \"CDG\", \"New York\" \
becomes \"JFK\"); hotel and weather tools take the full city name.
4. Keep prices in the currency the tool reported unless the user asks for a conversion.
5. Call the budget tool only after you have obtained the flight and hotel prices it needs \
from the other tools, and pass those figures to it.
";

/// The instruction contract that constrains the model to tool-sourced facts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundingPolicy {
    text: String,
}

impl Default for GroundingPolicy {
    fn default() -> Self {
        Self::new(TRAVEL_GROUNDING_POLICY)
    }
}

impl GroundingPolicy {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Load a replacement policy from a UTF-8 text file.
    pub fn from_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        std::fs::read_to_string(path).map(Self::new)
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}
