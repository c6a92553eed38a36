use std::sync::Arc;

use charisma_core::collab::{EmotionTagger, GenerateContext, PromptKind, TextGenerator};
use charisma_core::config::SessionConfig;
use charisma_core::roles::{Role, Sender};
use charisma_core::transcript::ConversationSnapshot;
use charisma_dialogue::accuracy::score_paraphrase_accuracy;
use charisma_dialogue::generate::{follow_up_invitation, TemplateGenerator};
use charisma_dialogue::hardship::detect_hardship;
use charisma_dialogue::paraphrase::violates_paraphrase_rules;
use charisma_dialogue::topic::{is_usable_topic, DEFAULT_TOPIC};
use charisma_dialogue::{classify_confirmation, is_goodbye, Confirmation};

use crate::bridge::SessionBridge;
use crate::state::ConversationState;

const GREETING: &str =
    "Hello! I'm Charisma Bot. We'll take turns as speaker and listener: one of us shares, \
     the other repeats it back to show they understood.";

const TOPIC_PROMPT: &str =
    "First, let's pick an issue to practice on. It could be balancing work and personal time, \
     sharing household responsibilities, or anything on your mind. What would you like to \
     focus on?";

const TOPIC_REPROMPT: &str =
    "Could you tell me a little more? A short phrase about the issue is all we need.";

const REPEAT_BACK_PROMPT: &str =
    "Now, please repeat that back to me in your own words.";

const MISHEARD_NOTICE: &str = "You may have misheard me. Let me say it again.";

const REPEAT_ACCEPTED: &str = "That's right. Thank you for listening so closely.";

const CONFIRM_PROMPT: &str = "Did I understand you correctly?";

const RECLARIFY_PROMPT: &str = "Just to be sure, did I capture what you meant?";

const RETRY_PARAPHRASE_NOTICE: &str = "I apologize. Let me try that again.";

const GOODBYE_LINE: &str = "It was nice talking to you. Goodbye!";

const CLOSING_THANKS: &str =
    "Thank you for practicing with me today. These listening skills grow with every conversation.";

/// How many reprompts issue selection spends before the default topic.
const TOPIC_ATTEMPTS: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    IssueSelection,
    Speaking,
    Listening,
    ProblemSolving,
    Terminated,
}

/// The per-session conversation driver. Runs strictly sequentially on
/// the worker task: every `speak`/`listen` blocks this machine's own
/// control flow and nothing else.
pub struct ConversationMachine {
    bridge: SessionBridge,
    state: ConversationState,
    generator: Arc<dyn TextGenerator>,
    emotions: Arc<dyn EmotionTagger>,
    config: SessionConfig,
}

impl ConversationMachine {
    pub fn new(
        bridge: SessionBridge,
        state: ConversationState,
        generator: Arc<dyn TextGenerator>,
        emotions: Arc<dyn EmotionTagger>,
        config: SessionConfig,
    ) -> Self {
        Self {
            bridge,
            state,
            generator,
            emotions,
            config,
        }
    }

    /// Drive the conversation to termination and export the final state.
    pub async fn run(mut self) -> ConversationSnapshot {
        let mut phase = Phase::IssueSelection;
        while phase != Phase::Terminated {
            phase = match phase {
                Phase::IssueSelection => self.issue_selection().await,
                Phase::Speaking => self.speaking_round().await,
                Phase::Listening => self.listening_round().await,
                Phase::ProblemSolving => self.problem_solving().await,
                Phase::Terminated => unreachable!(),
            };
        }

        tracing::info!(
            session_id = %self.state.session_id(),
            rounds = self.state.total_rounds(),
            topic = %self.state.topic(),
            "conversation terminated"
        );
        self.state.terminate();
        self.state.snapshot()
    }

    async fn issue_selection(&mut self) -> Phase {
        self.say(GREETING).await;
        self.say(TOPIC_PROMPT).await;

        for _ in 0..TOPIC_ATTEMPTS {
            let answer = self.hear().await;
            if is_goodbye(&answer) {
                return self.say_goodbye().await;
            }
            if is_usable_topic(&answer) {
                let topic = self.normalize_topic(&answer).await;
                self.state.set_topic(&topic);
                self.say(&format!("Great, let's talk about {topic}.")).await;
                return self.phase_for_role(self.state.bot_role());
            }
            self.say(TOPIC_REPROMPT).await;
        }

        self.state.set_topic(DEFAULT_TOPIC);
        self.say(&format!(
            "Let's start with something many people face: {DEFAULT_TOPIC}."
        ))
        .await;
        self.phase_for_role(self.state.bot_role())
    }

    async fn speaking_round(&mut self) -> Phase {
        let ctx = GenerateContext {
            topic: self.state.topic().to_string(),
            character: Some(self.state.character()),
            ..Default::default()
        };
        let statement = self.generate_or_template(PromptKind::IStatement, &ctx).await;

        self.say(&statement).await;
        self.say(REPEAT_BACK_PROMPT).await;

        let reply = self.hear().await;
        if is_goodbye(&reply) {
            return self.say_goodbye().await;
        }

        if score_paraphrase_accuracy(&statement, &reply) {
            self.say(REPEAT_ACCEPTED).await;
        } else {
            // Low overlap often just means mishearing; say it once more.
            self.say(MISHEARD_NOTICE).await;
            self.say(&statement).await;

            let retry = self.hear().await;
            if is_goodbye(&retry) {
                return self.say_goodbye().await;
            }

            if score_paraphrase_accuracy(&statement, &retry) {
                self.say(REPEAT_ACCEPTED).await;
            } else {
                // One corrective restatement, then the round advances
                // regardless; a single exchange never stalls the session.
                self.say(&format!("Not quite. The key point was this: {statement}"))
                    .await;
            }
        }

        self.complete_round().await
    }

    async fn listening_round(&mut self) -> Phase {
        self.say("Now you have the floor; I'm listening.").await;

        let mut input = self.hear().await;
        if is_goodbye(&input) {
            return self.say_goodbye().await;
        }

        // A bare "yes"/"okay" carries nothing to paraphrase; invite more.
        if classify_confirmation(&input) == Confirmation::Affirmative
            && input.split_whitespace().count() <= 3
        {
            self.say(follow_up_invitation()).await;
            input = self.hear().await;
            if is_goodbye(&input) {
                return self.say_goodbye().await;
            }
        }

        let paraphrase = self.paraphrase_of(&input).await;
        self.say(&paraphrase).await;
        self.say(CONFIRM_PROMPT).await;

        let confirmation = self.hear().await;
        if is_goodbye(&confirmation) {
            return self.say_goodbye().await;
        }

        match classify_confirmation(&confirmation) {
            Confirmation::Affirmative => {
                let ctx = GenerateContext {
                    input: input.clone(),
                    emotion: self.emotions.tag(&input),
                    character: Some(self.state.character()),
                    ..Default::default()
                };
                let validation = self.generate_or_template(PromptKind::Validation, &ctx).await;
                self.say(&validation).await;
            }
            Confirmation::Ambiguous => {
                // One reclarification, then advance whatever the answer.
                self.say(RECLARIFY_PROMPT).await;
                let second = self.hear().await;
                if is_goodbye(&second) {
                    return self.say_goodbye().await;
                }
                if classify_confirmation(&second) == Confirmation::Negative {
                    self.improved_paraphrase(&input).await;
                } else {
                    self.say("Thank you. Let's keep going.").await;
                }
            }
            Confirmation::Negative => {
                self.improved_paraphrase(&input).await;
            }
        }

        self.complete_round().await
    }

    async fn problem_solving(&mut self) -> Phase {
        let topic = self.state.topic().to_string();
        self.say(&format!(
            "We've both had a turn as speaker and listener. What do you think we could do \
             together about {topic}?"
        ))
        .await;

        let suggestion = self.hear().await;
        if is_goodbye(&suggestion) {
            return self.say_goodbye().await;
        }

        let ctx = GenerateContext {
            input: suggestion.clone(),
            topic,
            emotion: self.emotions.tag(&suggestion),
            character: Some(self.state.character()),
        };
        let kind = if detect_hardship(&suggestion) {
            PromptKind::Empathetic
        } else {
            PromptKind::Collaborative
        };
        let reply = self.generate_or_template(kind, &ctx).await;
        self.say(&reply).await;

        self.say(CLOSING_THANKS).await;
        self.say_goodbye().await
    }

    /// Credit the round, then decide what comes next: problem solving
    /// once both roles hit the minimum, termination at the hard cap,
    /// otherwise a role flip and another round.
    async fn complete_round(&mut self) -> Phase {
        self.state.complete_round();

        if self.state.both_roles_completed(self.config.min_rounds_per_role) {
            return Phase::ProblemSolving;
        }
        if self.state.round_cap_reached(self.config.max_total_rounds) {
            tracing::info!(
                session_id = %self.state.session_id(),
                rounds = self.state.total_rounds(),
                "round cap reached"
            );
            return Phase::Terminated;
        }

        let bot_role = self.state.switch_roles();
        self.say(&format!(
            "Let's switch roles. I will now be the {bot_role}, and you will be the {}.",
            bot_role.flip()
        ))
        .await;
        self.phase_for_role(bot_role)
    }

    fn phase_for_role(&self, bot_role: Role) -> Phase {
        match bot_role {
            Role::Speaker => Phase::Speaking,
            Role::Listener => Phase::Listening,
        }
    }

    async fn say_goodbye(&mut self) -> Phase {
        self.say(GOODBYE_LINE).await;
        Phase::Terminated
    }

    /// Speak and record a bot line, then give the exchange room to
    /// breathe.
    async fn say(&mut self, text: &str) {
        self.bridge.speak(text).await;
        self.state.record_bot(text, "neutral");
        if !self.config.inter_turn_pause.is_zero() {
            tokio::time::sleep(self.config.inter_turn_pause).await;
        }
    }

    /// Listen for the user, echo their line into the room, and record it.
    async fn hear(&mut self) -> String {
        let text = self.bridge.listen().await;
        let emotion = self.emotions.tag(&text);
        self.bridge.post_message(Sender::User, &text);
        self.state.record_user(&text, &emotion);
        text
    }

    async fn normalize_topic(&mut self, answer: &str) -> String {
        let ctx = GenerateContext {
            input: answer.to_string(),
            character: Some(self.state.character()),
            ..Default::default()
        };
        self.generate_or_template(PromptKind::TopicSummary, &ctx).await
    }

    async fn paraphrase_of(&mut self, input: &str) -> String {
        let ctx = GenerateContext {
            input: input.to_string(),
            emotion: self.emotions.tag(input),
            character: Some(self.state.character()),
            ..Default::default()
        };
        self.generate_or_template(PromptKind::Paraphrase, &ctx).await
    }

    async fn improved_paraphrase(&mut self, input: &str) {
        self.say(RETRY_PARAPHRASE_NOTICE).await;
        let improved = self.paraphrase_of(input).await;
        self.say(&improved).await;
        self.say("Thank you for helping me understand. Let's continue.").await;
    }

    /// Ask the generator, keep its output only if it holds up, and fall
    /// back to the deterministic templates otherwise. Collaborator
    /// failure degrades the wording, never the conversation.
    async fn generate_or_template(&self, kind: PromptKind, ctx: &GenerateContext) -> String {
        match self.generator.generate(kind, ctx).await {
            Ok(text) if generated_output_usable(kind, &text, ctx) => text,
            Ok(text) => {
                tracing::debug!(
                    session_id = %self.state.session_id(),
                    kind = kind.as_str(),
                    rejected = %text,
                    "generator output failed validation, using template"
                );
                TemplateGenerator::render(kind, ctx)
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %self.state.session_id(),
                    kind = kind.as_str(),
                    error = %e,
                    "generator unavailable, using template"
                );
                TemplateGenerator::render(kind, ctx)
            }
        }
    }
}

/// Acceptance gate for generator output, per prompt kind.
fn generated_output_usable(kind: PromptKind, text: &str, ctx: &GenerateContext) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }
    match kind {
        PromptKind::Paraphrase => !violates_paraphrase_rules(&ctx.input, trimmed),
        PromptKind::IStatement => {
            !trimmed.contains('?') && trimmed.split_whitespace().count() <= 25
        }
        PromptKind::TopicSummary => {
            let count = trimmed.split_whitespace().count();
            (1..=8).contains(&count)
        }
        PromptKind::Validation | PromptKind::Collaborative | PromptKind::Empathetic => true,
    }
}
