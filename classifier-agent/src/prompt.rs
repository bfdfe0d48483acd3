//! Prompt assembly for the crime classifier.
//!
//! Builds the fixed-taxonomy classification request: the model is
//! given the category list and a required JSON response shape, so
//! parsing stays tolerant but narrow.

use casefile::CrimeCategory;

/// Assembles classification prompts.
pub struct PromptAssembler;

impl PromptAssembler {
    /// Build the system prompt establishing the classifier role.
    pub fn build_system_prompt() -> String {
        let mut prompt = String::new();

        prompt.push_str("You are the crime-classification component of a cybercrime helpline.\n");
        prompt.push_str("Classify the caller's incident narrative into exactly one category.\n\n");

        prompt.push_str("## CATEGORIES\n\n");
        for category in CrimeCategory::taxonomy() {
            prompt.push_str(&format!("- {}\n", category.label()));
        }

        prompt.push_str("\n## REQUIRED RESPONSE FORMAT\n\n");
        prompt.push_str("Respond with a single JSON object and nothing else:\n\n");
        prompt.push_str("```json\n");
        prompt.push_str("{\n");
        prompt.push_str("  \"category\": \"<one category label from the list>\",\n");
        prompt.push_str("  \"confidence\": 0.0-1.0\n");
        prompt.push_str("}\n");
        prompt.push_str("```\n\n");
        prompt.push_str("Use \"Other\" when no category fits. Do not invent categories.\n");

        prompt
    }

    /// Build the user prompt carrying the narrative.
    pub fn build_narrative_prompt(narrative: &str) -> String {
        format!("Incident narrative:\n\n{}\n\nClassify it now.", narrative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_lists_taxonomy() {
        let prompt = PromptAssembler::build_system_prompt();

        assert!(prompt.contains("CATEGORIES"));
        assert!(prompt.contains("REQUIRED RESPONSE FORMAT"));
        assert!(prompt.contains("Phishing/Financial Fraud"));
        assert!(prompt.contains("Identity Theft"));
        // The failure-only category is never offered to the model.
        assert!(!prompt.contains("Unclassified"));
    }

    #[test]
    fn test_narrative_prompt() {
        let prompt = PromptAssembler::build_narrative_prompt("someone hacked my email");
        assert!(prompt.contains("someone hacked my email"));
    }
}
