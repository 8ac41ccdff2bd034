//! The fixed instruction that wraps every caller prompt.

/// Instruction text for one database and collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionTemplate {
    database: String,
    collection: String,
}

/// Reinforces plain-text output. Appended after the fixed instruction.
pub const FORMATTING_INSTRUCTION: &str = "Always respond ONLY with a human readable summary of the todos in the chatapp database, with no extra commentary, no JSON, and no code formatting. Do not use markdown or code fences. ";

impl InstructionTemplate {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }

    /// Persona, target database and collection, and the sample-then-query workflow.
    pub fn fixed_instruction(&self) -> String {
        let (db, coll) = (&self.database, &self.collection);
        format!(
            "Always respond ONLY with a human readable summary of the todos. \
             The MongoDB database is '{db}'. The collection for todos is '{coll}'. \
             You have access to MongoDB tools via MCP and may use them, including for \
             chain-of-thought (COT) calls if needed. Never reveal that you are a MongoDB \
             agent or mention MongoDB, MCP, or database internals to the user. Always act \
             as a helpful assistant. When you receive a request about todos, first sample a \
             few documents from the '{coll}' collection to understand the schema and possible \
             field values. Then, use that information to construct and run the correct query \
             to answer the user's request. Finally, summarize the results in a human readable \
             way. "
        )
    }

    /// `fixed + " " + formatting + prompt`, with the prompt appended verbatim.
    pub fn build_prompt(&self, prompt: &str) -> String {
        let mut text = self.fixed_instruction();
        text.push(' ');
        text.push_str(FORMATTING_INSTRUCTION);
        text.push_str(prompt);
        text
    }
}

impl Default for InstructionTemplate {
    fn default() -> Self {
        Self::new(
            crate::config::DEFAULT_DATABASE,
            crate::config::DEFAULT_COLLECTION,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_is_appended_after_both_instructions() {
        let template = InstructionTemplate::default();
        let built = template.build_prompt("what is overdue?");

        let prefix = format!("{} {}", template.fixed_instruction(), FORMATTING_INSTRUCTION);
        assert!(built.starts_with(&prefix));
        assert_eq!(&built[prefix.len()..], "what is overdue?");
    }

    #[test]
    fn names_database_and_collection() {
        let text = InstructionTemplate::new("chatapp2", "todos").fixed_instruction();
        assert!(text.contains("The MongoDB database is 'chatapp2'."));
        assert!(text.contains("The collection for todos is 'todos'."));
        assert!(text.contains("first sample a few documents from the 'todos' collection"));
        assert!(text.ends_with("human readable way. "));
    }

    #[test]
    fn empty_prompt_keeps_instructions() {
        let template = InstructionTemplate::new("db", "items");
        assert_eq!(
            template.build_prompt(""),
            format!("{} {}", template.fixed_instruction(), FORMATTING_INSTRUCTION)
        );
    }
}
