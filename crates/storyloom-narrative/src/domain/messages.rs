//! Participant-facing texts.

/// First line of the reply a participant gets on first contact.
pub const DEFAULT_WELCOME_TEXT: &str = "Welcome to FAN Club's text based adventure game! \
We will all be playing a game together in real time. \
We will be put in a scenario starting in this apartment and we will all suggest a course of action. \
An AI will gather all our suggestions, select the most representative suggestion, and continue the adventure. \
Every 10 minutes, the AI will update everyone with the next step in the adventure. \
Feel free to be as creative as you want! (BUT RESPONSES ARE NOT ANONYMOUS) Here is the scenario...";

/// Reply to every proposal, accepted or not.
pub const DEFAULT_ACK_TEXT: &str = "Your input has been received! Waiting for all players...";

/// Broadcast when a round closes without any proposals.
pub const EMPTY_ROUND_REMINDER: &str = "No actions were submitted this round. The story is waiting on you! \
Reply with what the group should do next.";

/// Formats the broadcast announcing a round's outcome.
#[must_use]
pub fn round_result(display_name: &str, proposal: &str, narration: &str) -> String {
    format!(
        "The AI has spoken! The next action (submitted by {display_name}) is:\n\n{proposal}\n\nThe result of the action is:\n\n{narration}"
    )
}
