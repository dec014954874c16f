// Prompt templates for the combining step

use crate::models::QueryOutcome;

/// Prompt sent to the combiner model.
/// `{{user_message}}` and `{{responses}}` are filled by [`build_combiner_prompt`].
pub const COMBINER_PROMPT_TEMPLATE: &str = r#"Several AI models answered the same message from a user. Combine their answers into a single reply.

User message:
{{user_message}}

Model responses:
{{responses}}

Guidelines:
- Start with a concise summary of the points the models agree on
- Follow with a section titled "Unique insights" listing valuable points only one model made, labelled with that model's name
- Skip contributions that repeat what is already covered
- Reply directly to the user; do not describe this process
"#;

/// Render the combiner prompt for the successful outcomes of a round
pub fn build_combiner_prompt<'a, I>(user_message: &str, successes: I) -> String
where
    I: IntoIterator<Item = &'a QueryOutcome>,
{
    let responses = successes
        .into_iter()
        .filter_map(|o| o.text().map(|text| format!("### {}\n{}", o.model.display_name, text.trim())))
        .collect::<Vec<_>>()
        .join("\n\n");

    COMBINER_PROMPT_TEMPLATE
        .replace("{{user_message}}", user_message.trim())
        .replace("{{responses}}", &responses)
}
