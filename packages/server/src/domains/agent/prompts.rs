//! Prompt templates for the assistant, extraction and summarization.

use chrono::NaiveDate;

/// Reply used whenever the chat model is unreachable or unconfigured.
pub const DEGRADED_REPLY: &str =
    "I'm having trouble reaching my language model right now. Please try again in a moment.";

/// System prompt for the main chat turn. Context blocks are the
/// assembled bracket-tagged data sections.
pub fn system_prompt(context_blocks: &str, today: NaiveDate) -> String {
    let mut prompt = format!(
        "You are Aria, an assistant for worship team leaders. You help them remember \
what they know about their volunteers, look up Planning Center schedules and songs, \
and keep track of follow-ups.\n\
Today's date is {}.\n\n\
Guidelines:\n\
- Data inside bracket tags like [SERVICE TEAM SCHEDULE] or [SONG DATA] comes from \
live systems and is authoritative. Prefer it over memory.\n\
- Interaction snippets are past notes the leader recorded. Use them to answer \
questions about volunteers.\n\
- Be warm and concise. Answer in a few sentences unless listing data.\n\
- Never invent contact details, schedules or song data. If the information is not \
in the context, say you don't have it.",
        today.format("%A, %B %-d, %Y")
    );

    if !context_blocks.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(context_blocks);
    }
    prompt
}

/// Prompt for structured extraction from a recorded interaction.
/// The model must answer with bare JSON; the parser tolerates fenced
/// code blocks anyway.
pub fn extraction_prompt(content: &str) -> String {
    format!(
        "Extract structured data from this note a worship leader recorded about their \
volunteers.\n\n\
Note: {content}\n\n\
Respond with JSON only, using this shape:\n\
{{\n\
  \"volunteers\": [\"full names mentioned\"],\n\
  \"category\": \"prayer_request\" | \"family_update\" | \"preference\" | \"availability\" | \"general\",\n\
  \"summary\": \"one sentence\",\n\
  \"details\": {{\n\
    \"prayer_requests\": [],\n\
    \"family_updates\": [],\n\
    \"preferences\": [],\n\
    \"availability_notes\": []\n\
  }}\n\
}}"
    )
}

/// Prompt to condense a long chat session into a running summary.
pub fn summary_prompt(transcript: &str) -> String {
    format!(
        "Summarize this conversation between a worship leader and their assistant in \
3-4 sentences. Keep names, dates and decisions; drop pleasantries.\n\n{transcript}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_carries_date_and_context() {
        let today = NaiveDate::from_ymd_opt(2024, 12, 15).unwrap();
        let prompt = system_prompt("[SONG DATA]\nTitle: Oceans\n[END SONG DATA]", today);
        assert!(prompt.contains("December 15, 2024"));
        assert!(prompt.contains("[SONG DATA]"));
        assert!(prompt.contains("You are Aria"));
    }

    #[test]
    fn empty_context_adds_no_trailing_blocks() {
        let today = NaiveDate::from_ymd_opt(2024, 12, 15).unwrap();
        let prompt = system_prompt("", today);
        assert!(!prompt.ends_with("\n\n"));
    }
}
