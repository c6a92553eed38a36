use crate::text::words;

/// Openers that frame a restatement from the listener's perspective. A
/// paraphrase must begin with one of these.
pub const PERSPECTIVE_OPENERS: &[&str] = &[
    "i hear you saying",
    "i hear you expressing",
    "i hear you asking",
    "i hear you sharing",
    "it sounds like",
    "what i understand is",
    "what i'm hearing is",
    "i understand that",
    "i understand you're saying",
];

/// First-person claims that must not survive unshifted from input to
/// paraphrase.
const FIRST_PERSON_CLAIMS: &[&str] = &["i need", "i love", "i want", "i think"];

const FILLER_WORDS: &[&str] = &["um", "uh", "like", "you know", "well"];

/// The hard rules a paraphrase must satisfy, whoever produced it:
/// no verbatim containment in either direction, no unshifted
/// first-person claims, and a perspective-framing opener. Generator
/// output violating any of these is discarded for the deterministic
/// fallback.
pub fn violates_paraphrase_rules(original: &str, candidate: &str) -> bool {
    let original_norm = words(original).join(" ");
    let candidate_norm = words(candidate).join(" ");

    if original_norm.is_empty() || candidate_norm.is_empty() {
        return true;
    }

    if candidate_norm.contains(&original_norm) || original_norm.contains(&candidate_norm) {
        return true;
    }

    for claim in FIRST_PERSON_CLAIMS {
        if original_norm.contains(claim) && candidate_norm.contains(claim) {
            return true;
        }
    }

    !PERSPECTIVE_OPENERS
        .iter()
        .any(|opener| candidate_norm.starts_with(opener))
}

/// Drop spoken filler ("um", "uh", "you know", ...) before paraphrasing.
pub fn strip_fillers(text: &str) -> String {
    let mut padded = format!(" {} ", text.trim());
    for filler in FILLER_WORDS {
        loop {
            let lowered = padded.to_lowercase();
            if lowered.len() != padded.len() {
                // Non-ASCII input; skip filler stripping rather than
                // risk splitting a character.
                return text.trim().to_string();
            }
            match lowered.find(&format!(" {filler} ")) {
                Some(idx) => {
                    let end = idx + filler.len() + 1;
                    padded.replace_range(idx..end, "");
                }
                None => break,
            }
        }
    }
    padded.trim().to_string()
}

/// Deterministic paraphrase used whenever the generation collaborator is
/// unavailable or its output breaks the rules. The output of this
/// function always satisfies `violates_paraphrase_rules == false`.
pub fn fallback_paraphrase(text: &str) -> String {
    let cleaned = strip_fillers(text);
    let lower = cleaned.to_lowercase();
    let lower = lower.trim();

    // Pronouns in the restated remainder shift too ("my" -> "your").
    let templated = if let Some(rest) = lower.strip_prefix("i have been ") {
        format!("I hear you saying that you've been {}", terminated(&shift_pronouns(rest)))
    } else if let Some(rest) = lower.strip_prefix("i feel ") {
        format!("It sounds like you're feeling {}", terminated(&shift_pronouns(rest)))
    } else if let Some(rest) = lower.strip_prefix("i think ") {
        format!("I hear you expressing the belief that {}", terminated(&shift_pronouns(rest)))
    } else if let Some(rest) = lower.strip_prefix("i want ") {
        format!("It sounds like you're hoping {}", terminated(&shift_pronouns(rest)))
    } else if let Some(rest) = lower.strip_prefix("i need ") {
        format!("I hear you saying that you need {}", terminated(&shift_pronouns(rest)))
    } else if let Some(rest) = lower.strip_prefix("i love ") {
        format!("It sounds like you're expressing that you love {}", terminated(&shift_pronouns(rest)))
    } else if let Some(rest) = lower.strip_prefix("i'm ").or_else(|| lower.strip_prefix("i am ")) {
        format!("I hear you saying that you're {}", terminated(&shift_pronouns(rest)))
    } else if let Some(rest) = lower.strip_prefix("i don't ") {
        format!("I understand you're saying that you don't {}", terminated(&shift_pronouns(rest)))
    } else if lower.contains('?') {
        "I hear you asking about something that matters to you.".to_string()
    } else {
        let shifted = shift_pronouns(lower);
        format!("What I'm hearing is that {}", terminated(&shifted))
    };

    if violates_paraphrase_rules(&cleaned, &templated) {
        // Last resort for input the transforms cannot reshape (e.g. no
        // first-person content at all, so containment would remain).
        return "I hear you sharing something meaningful, and I want to be sure I understand it \
                correctly."
            .to_string();
    }

    templated
}

fn terminated(s: &str) -> String {
    let trimmed = s.trim_end_matches(['.', '!', '?', ',']).trim();
    format!("{trimmed}.")
}

fn shift_pronouns(text: &str) -> String {
    let mut out = Vec::new();
    for word in text.split_whitespace() {
        let stripped: String = word
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '\'')
            .collect();
        let shifted = match stripped.as_str() {
            "i" => "you",
            "i'm" => "you're",
            "i've" => "you've",
            "my" => "your",
            "mine" => "yours",
            "me" => "you",
            "am" => "are",
            other => other,
        };
        out.push(shifted.to_string());
    }
    out.join(" ")
}
