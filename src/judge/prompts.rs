use crate::state::question::DifficultyTier;

pub const GENERATION_TEMPERATURE: f32 = 0.7;
pub const EVALUATION_TEMPERATURE: f32 = 0.2;

pub fn question_prompt(topic: &str, tier: DifficultyTier) -> String {
    format!(
        r#"You are an AI that generates quiz questions for a Discord bot.
The questions should have short, concise answers (a few words at most, ideally one or two).
They can be fill-in-the-blank or conceptual questions.
The topics are related to: Bitcoin, Web3, Decentralization, Blockchain.

Generate a question on the topic: "{topic}"
The desired difficulty level is: "{difficulty}" (e.g., basic knowledge, intermediate knowledge, advanced knowledge).

Your response MUST be a JSON object with the following exact keys:
- "question": A string containing the question.
- "intended_answer": A string containing the concise, correct answer.
- "difficulty_assessment": A string assessing the actual difficulty of the generated question (e.g., "basic knowledge", "intermediate", "advanced").

Example of a "basic knowledge" question about Bitcoin:
{{
    "question": "What is the smallest unit of Bitcoin called?",
    "intended_answer": "satoshi",
    "difficulty_assessment": "basic knowledge"
}}

Ensure the "intended_answer" is very specific and what you expect the user to type.
The entire response should be ONLY the JSON object, with no text outside it."#,
        difficulty = tier.prompt_label(),
    )
}

pub fn evaluation_prompt(question: &str, intended_answer: &str, answer: &str) -> String {
    format!(
        r#"You are an AI evaluating a user's answer to a quiz question.
The original question was: "{question}"
The intended concise correct answer is: "{intended_answer}"
The user's answer was: "{answer}"

Determine if the answer is "Correct", "Incorrect", or "Partially correct".
- "Correct": essentially the same as the intended answer; minor phrasing differences are fine if the core concept is identical.
- "Partially correct": captures some aspect of the correct answer but is incomplete, mixes correct and incorrect information, or is a less precise related concept.
- "Incorrect": the answer is wrong.

Your response MUST be a JSON object with the following exact keys:
- "status": either "Correct", "Incorrect", or "Partially correct".
- "explanation": for "Partially correct", a brief note on what makes it partial; otherwise null or a very brief confirmation.

Example:
{{
    "status": "Partially correct",
    "explanation": "The user mentioned Proof-of-Work but missed Proof-of-Stake."
}}

The entire response should be ONLY the JSON object. Be strict but fair; the intended answer is the primary reference."#
    )
}
