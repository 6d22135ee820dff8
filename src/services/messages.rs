//! Channel-facing texts and embeds.

use time::{OffsetDateTime, UtcOffset, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    dao::models::SessionId,
    state::question::ActiveQuestion,
    transport::{Embed, EmbedField, OutgoingMessage},
};

/// Fresh question.
pub const BLURPLE: u32 = 0x5865F2;
/// Fully correct answer.
pub const GREEN: u32 = 0x2ECC71;
/// Partially correct answer.
pub const ORANGE: u32 = 0xE67E22;
/// Skipped question.
pub const DARK_GREY: u32 = 0x607D8B;
/// Leaderboard.
pub const GOLD: u32 = 0xF1C40F;
/// Informational.
pub const BLUE: u32 = 0x3498DB;

const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute] UTC");

/// `YYYY-MM-DD HH:MM UTC`, or `N/A` when unavailable.
pub fn format_timestamp(timestamp: Option<OffsetDateTime>) -> String {
    timestamp
        .and_then(|ts| ts.to_offset(UtcOffset::UTC).format(TIMESTAMP_FORMAT).ok())
        .unwrap_or_else(|| "N/A".to_owned())
}

/// Capitalise the first letter of every word and lowercase the rest.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_is_letter = false;
    for ch in text.chars() {
        if previous_is_letter {
            out.extend(ch.to_lowercase());
        } else {
            out.extend(ch.to_uppercase());
        }
        previous_is_letter = ch.is_alphabetic();
    }
    out
}

fn difficulty_display(label: &str) -> String {
    title_case(&label.to_lowercase().replace(" knowledge", ""))
}

/// Confirmation sent when a session starts.
pub fn session_started(session: SessionId, start_time: Option<OffsetDateTime>) -> String {
    format!(
        "New quiz session #{session} has started at {}!",
        format_timestamp(start_time)
    )
}

/// Posted when a question is due but no session is running.
pub fn no_session_notice() -> OutgoingMessage {
    OutgoingMessage::text(
        "An admin needs to start a quiz session with `/start-session` before questions can be asked.",
    )
}

/// Posted when the topic catalog is empty.
pub fn no_topics_notice(source: &str) -> OutgoingMessage {
    OutgoingMessage::text(format!(
        "Error: Could not load topics for the quiz. Admin check `{source}`."
    ))
}

/// Posted when the judge could not produce a question.
pub fn generation_failed_notice(reason: &str) -> OutgoingMessage {
    OutgoingMessage::text(format!(
        "Oops! I had trouble thinking of a new question ({reason}). An admin can use `/skip-question` to try again."
    ))
}

/// Card announcing a freshly generated question.
pub fn question_embed(
    text: &str,
    topic: &str,
    difficulty_label: &str,
    points: i64,
    session: SessionId,
) -> Embed {
    Embed {
        title: Some(format!("🧠 New Quiz Question! ({points} Points)")),
        description: Some(text.to_owned()),
        color: Some(BLURPLE),
        fields: vec![
            EmbedField {
                name: "Topic".into(),
                value: title_case(topic),
                inline: true,
            },
            EmbedField {
                name: "Difficulty".into(),
                value: difficulty_display(difficulty_label),
                inline: true,
            },
        ],
        footer: Some(format!("Session #{session} | Use /answer <your answer>")),
    }
}

/// Question card recoloured and stamped with the resolver.
pub fn resolved_embed(
    question: &ActiveQuestion,
    session: SessionId,
    resolver_name: &str,
    fully_correct: bool,
) -> Embed {
    Embed {
        color: Some(if fully_correct { GREEN } else { ORANGE }),
        footer: Some(format!("Answered by {resolver_name} | Session #{session}")),
        ..question_embed(
            &question.text,
            &question.topic,
            &question.difficulty_label,
            question.points,
            session,
        )
    }
}

/// Public message for a fully correct answer.
pub fn correct_announcement(mention: &str, points: i64, intended_answer: &str) -> String {
    format!(
        "🏆 {mention} answered correctly and earned {points} points!\nThe answer was: **{intended_answer}**"
    )
}

/// Public message for a partially correct answer.
pub fn partial_announcement(
    mention: &str,
    points: i64,
    explanation: Option<&str>,
    intended_answer: &str,
) -> String {
    let mut lines = vec![format!(
        "🤔 {mention} was partially correct and earned {points} points!"
    )];
    lines.extend(explanation.map(str::to_owned));
    lines.push(format!(
        "The full intended answer was: **{intended_answer}**"
    ));
    lines.join("\n")
}

/// Question and intended answer, for skips.
pub fn reveal(question: &str, intended_answer: &str) -> String {
    format!("The question was: \"{question}\"\nThe intended answer was: **{intended_answer}**.")
}

/// Edit applied to the card of a skipped question.
pub fn skipped_message(
    question: &ActiveQuestion,
    session: SessionId,
    reason: &str,
) -> OutgoingMessage {
    OutgoingMessage::embed(Embed {
        title: Some("🧠 Quiz Question".into()),
        description: Some(format!(
            "**This question was skipped.**\n\nOriginal Question: {}\nIntended Answer: **{}**",
            question.text, question.intended_answer
        )),
        color: Some(DARK_GREY),
        fields: vec![EmbedField {
            name: "Status".into(),
            value: "Skipped".into(),
            inline: true,
        }],
        footer: Some(format!("Skipped | Session #{session}")),
    })
    .with_content(format!("This question has been skipped. {reason}"))
}

/// One leaderboard line, already resolved to a display name.
pub struct LeaderboardLine {
    /// Player display name.
    pub name: String,
    /// Session score.
    pub score: i64,
}

/// Top scores of a session, medals for the first three.
pub fn leaderboard_embed(
    session: SessionId,
    start_time: Option<OffsetDateTime>,
    lines: &[LeaderboardLine],
) -> Embed {
    let footer = start_time.map(|ts| format!("Session Started: {}", format_timestamp(Some(ts))));
    let title = Some(format!("Leaderboard - Quiz Session #{session}"));

    if lines.is_empty() {
        return Embed {
            title,
            description: Some(
                "No scores yet for this session. Be the first to answer correctly!".into(),
            ),
            color: Some(BLUE),
            fields: Vec::new(),
            footer,
        };
    }

    let description = lines
        .iter()
        .enumerate()
        .map(|(index, line)| {
            let rank = index + 1;
            let medal = match rank {
                1 => "🥇 ",
                2 => "🥈 ",
                3 => "🥉 ",
                _ => "",
            };
            format!("{medal}{rank}. {}: {} points", line.name, line.score)
        })
        .collect::<Vec<_>>()
        .join("\n");

    Embed {
        title,
        description: Some(description),
        color: Some(GOLD),
        fields: Vec::new(),
        footer,
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::transport::MessageId;

    fn question() -> ActiveQuestion {
        ActiveQuestion::new(
            "Which consensus mechanism replaced Proof-of-Work on Ethereum?".into(),
            "Proof-of-Stake".into(),
            "ethereum merge".into(),
            "intermediate knowledge".into(),
            2,
            MessageId(1),
            datetime!(2024-05-01 12:00 UTC),
        )
    }

    #[test]
    fn timestamps_render_in_utc() {
        let ts = datetime!(2024-05-01 14:05 +02:00);
        assert_eq!(format_timestamp(Some(ts)), "2024-05-01 12:05 UTC");
        assert_eq!(format_timestamp(None), "N/A");
    }

    #[test]
    fn title_case_matches_word_boundaries() {
        assert_eq!(title_case("bitcoin BASICS"), "Bitcoin Basics");
        assert_eq!(title_case("layer-2 scaling"), "Layer-2 Scaling");
    }

    #[test]
    fn question_card_lists_topic_and_difficulty() {
        let q = question();
        let embed = question_embed(
            &q.text,
            &q.topic,
            &q.difficulty_label,
            q.points,
            SessionId(3),
        );
        assert_eq!(embed.title.as_deref(), Some("🧠 New Quiz Question! (2 Points)"));
        assert_eq!(embed.fields[0].value, "Ethereum Merge");
        assert_eq!(embed.fields[1].value, "Intermediate");
        assert_eq!(
            embed.footer.as_deref(),
            Some("Session #3 | Use /answer <your answer>")
        );
    }

    #[test]
    fn resolved_card_is_recoloured_and_stamped() {
        let embed = resolved_embed(&question(), SessionId(3), "ada", false);
        assert_eq!(embed.color, Some(ORANGE));
        assert_eq!(embed.footer.as_deref(), Some("Answered by ada | Session #3"));
        assert_eq!(embed.fields.len(), 2);
    }

    #[test]
    fn partial_announcement_skips_missing_explanation() {
        let text = partial_announcement("<@1>", 1, None, "Proof-of-Stake");
        assert_eq!(
            text,
            "🤔 <@1> was partially correct and earned 1 points!\nThe full intended answer was: **Proof-of-Stake**"
        );
    }

    #[test]
    fn leaderboard_awards_medals_to_top_three() {
        let lines: Vec<_> = [("ada", 9), ("bob", 5), ("cy", 2), ("dee", -2)]
            .into_iter()
            .map(|(name, score)| LeaderboardLine {
                name: name.into(),
                score,
            })
            .collect();
        let embed = leaderboard_embed(SessionId(1), None, &lines);
        assert_eq!(
            embed.description.as_deref(),
            Some("🥇 1. ada: 9 points\n🥈 2. bob: 5 points\n🥉 3. cy: 2 points\n4. dee: -2 points")
        );
        assert_eq!(embed.color, Some(GOLD));
    }
}
