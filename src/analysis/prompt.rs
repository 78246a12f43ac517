use super::types::AnalysisPrompt;

const ANALYSIS_PROMPT: &str = r#"Analyze this image.

Be precise and factual. Describe only what is actually visible.

Respond with a JSON object with these fields:
- analysis: a detailed, objective description of the image content
- tags: an array of relevant, specific tags
- confidence: a confidence score between 0 and 1

Guidelines:
1. Describe exactly what you see, not what you imagine or assume.
2. Be specific about people, objects, colors and settings.
3. Do not make assumptions about things that are not visible.
4. If you are unsure about something, say so and lower the confidence score.

Example response:
{
  "analysis": "A woman with long black hair wearing a red dress, standing in a room",
  "tags": ["woman", "red dress", "portrait", "indoor", "long black hair"],
  "confidence": 0.95
}

Respond with ONLY the JSON object, no other text."#;

/// The fixed instruction sent with every image.
pub fn build_prompt() -> AnalysisPrompt {
    AnalysisPrompt(ANALYSIS_PROMPT)
}
