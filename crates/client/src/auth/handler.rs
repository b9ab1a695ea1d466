//! Overridable reactions to authentication messages.

use protocol::auth::{
    AuthChallenge, AuthError, AuthInfo, AuthInitialization, AuthStartMethod, AuthVerification,
};
use protocol::Envelope;
use tracing::{debug, error, info, warn};

use super::prompt::{Prompter, TerminalPrompter};

/// Reaction hooks invoked by [`AuthSession`](super::AuthSession).
///
/// Every hook has a default. Implementors usually only supply
/// [`prompter`](AuthHandler::prompter) and override the hooks whose
/// presentation they want to change; the dispatch and reply shaping stay in
/// the session.
pub trait AuthHandler: Send {
    /// The interactive surface used by the default hooks.
    fn prompter(&mut self) -> &mut dyn Prompter;

    /// Choose which of the offered methods to use. Defaults to all of them,
    /// in the peer's order.
    fn on_initialization(&mut self, msg: &AuthInitialization) -> Vec<String> {
        msg.methods.clone()
    }

    fn on_start_method(&mut self, msg: &AuthStartMethod) {
        debug!(method = %msg.method, "Authentication method started");
    }

    /// Collect one answer per question, in question order.
    fn on_challenge(&mut self, msg: &AuthChallenge) -> Vec<String> {
        let prompter = self.prompter();

        if let Some(username) = msg.extra_value("username") {
            prompter.display(&format!("Authentication for {}", username));
        }
        if let Some(instructions) = msg.extra_value("instructions") {
            if !instructions.is_empty() {
                prompter.display(instructions);
            }
        }

        msg.questions
            .iter()
            .map(|question| {
                let answer = if question.echo() {
                    prompter.prompt(&question.text)
                } else {
                    prompter.prompt_secret(&question.text)
                };
                answer.unwrap_or_default()
            })
            .collect()
    }

    /// Ask the user to confirm. Only `y` or `yes` (any case) is affirmative.
    fn on_verification(&mut self, msg: &AuthVerification) -> bool {
        let prompter = self.prompter();
        prompter.display(&msg.text);

        let answer = prompter.prompt("Enter [y/N]> ").unwrap_or_default();
        is_affirmative(&answer)
    }

    fn on_info(&mut self, msg: &AuthInfo) {
        self.prompter().display(&msg.text);
    }

    fn on_error(&mut self, msg: &AuthError) {
        if msg.is_fatal() {
            error!(text = %msg.text, "Fatal authentication error");
        } else {
            warn!(text = %msg.text, "Authentication error");
        }
    }

    fn on_finished(&mut self) {
        info!("Authentication finished");
    }

    fn on_unknown(&mut self, envelope: &Envelope) {
        warn!(kind = %envelope.kind, "Unknown authentication message");
    }
}

impl<H: AuthHandler + ?Sized> AuthHandler for Box<H> {
    fn prompter(&mut self) -> &mut dyn Prompter {
        (**self).prompter()
    }

    fn on_initialization(&mut self, msg: &AuthInitialization) -> Vec<String> {
        (**self).on_initialization(msg)
    }

    fn on_start_method(&mut self, msg: &AuthStartMethod) {
        (**self).on_start_method(msg)
    }

    fn on_challenge(&mut self, msg: &AuthChallenge) -> Vec<String> {
        (**self).on_challenge(msg)
    }

    fn on_verification(&mut self, msg: &AuthVerification) -> bool {
        (**self).on_verification(msg)
    }

    fn on_info(&mut self, msg: &AuthInfo) {
        (**self).on_info(msg)
    }

    fn on_error(&mut self, msg: &AuthError) {
        (**self).on_error(msg)
    }

    fn on_finished(&mut self) {
        (**self).on_finished()
    }

    fn on_unknown(&mut self, envelope: &Envelope) {
        (**self).on_unknown(envelope)
    }
}

/// Case-insensitive `y` / `yes`.
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Handler that uses every default hook over a given prompter.
#[derive(Debug, Default, Clone)]
pub struct StandardAuthHandler<P = TerminalPrompter> {
    prompter: P,
}

impl<P: Prompter> StandardAuthHandler<P> {
    pub fn new(prompter: P) -> Self {
        Self { prompter }
    }

    /// Borrow the underlying prompter.
    pub fn prompter_ref(&self) -> &P {
        &self.prompter
    }
}

impl<P: Prompter> AuthHandler for StandardAuthHandler<P> {
    fn prompter(&mut self) -> &mut dyn Prompter {
        &mut self.prompter
    }
}
