use crate::models::{Message, MessageSender};

pub const IMAGE_NOTE: &str =
    "\n\nUser has shared an image. Please analyze it in the context of their message.";

/// One line per exchanged message. System messages never reach the model.
pub fn build_transcript(messages: &[Message]) -> String {
    let mut transcript = String::new();
    for message in messages {
        match message.sender {
            MessageSender::User => {
                transcript.push_str(&format!("Patient: {}\n", message.content));
            }
            MessageSender::Ai => {
                transcript.push_str(&format!("AI Doctor: {}\n", message.content));
            }
            MessageSender::System => {}
        }
    }
    transcript
}

/// `messages` must already include the latest user message.
pub fn build_prompt(system_prompt: &str, messages: &[Message], latest: &str, has_image: bool) -> String {
    let mut prompt = format!(
        "{}\n\nConversation so far:\n{}\n\nLatest user message: {}",
        system_prompt,
        build_transcript(messages),
        latest
    );

    if has_image {
        prompt.push_str(IMAGE_NOTE);
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(content: &str, sender: MessageSender, previous: Option<&Message>) -> Message {
        Message::after(previous, content.to_string(), sender, None)
    }

    #[test]
    fn test_transcript_skips_system_messages() {
        let welcome = message("Hello! I'm Dr. Chen", MessageSender::System, None);
        let question = message("My son has a fever", MessageSender::User, Some(&welcome));
        let answer = message("How old is he?", MessageSender::Ai, Some(&question));

        let transcript = build_transcript(&[welcome, question, answer]);

        assert_eq!(transcript, "Patient: My son has a fever\nAI Doctor: How old is he?\n");
    }

    #[test]
    fn test_prompt_layout() {
        let question = message("I feel dizzy", MessageSender::User, None);

        let prompt = build_prompt("You are a doctor.", &[question], "I feel dizzy", false);

        assert_eq!(
            prompt,
            "You are a doctor.\n\nConversation so far:\nPatient: I feel dizzy\n\n\nLatest user message: I feel dizzy"
        );
    }

    #[test]
    fn test_prompt_mentions_image() {
        let question = message("What is this rash?", MessageSender::User, None);

        let prompt = build_prompt("You are a dermatologist.", &[question], "What is this rash?", true);

        assert!(prompt.ends_with(IMAGE_NOTE));
        assert!(prompt.contains("Latest user message: What is this rash?"));
    }
}
