//! Multi-character script parsing.
//!
//! A script is a sequence of `Speaker: dialogue` lines. Lines without a
//! colon are stage directions and are skipped.

use crate::models::{CharacterVoice, DialogueSegment};

/// Character id used for speakers missing from the cast.
pub const NARRATOR_ID: &str = "narrator";

/// Voice used for speakers missing from the cast.
#[derive(Debug, Clone)]
pub struct Narrator {
    pub voice_id: String,
    pub voice_name: String,
}

/// Parse `script` into ordered dialogue segments.
///
/// Speakers match cast names case-insensitively; unknown speakers fall
/// back to the narrator. Lines with empty dialogue are dropped.
pub fn parse_script(
    script: &str,
    cast: &[CharacterVoice],
    narrator: &Narrator,
) -> Vec<DialogueSegment> {
    script
        .lines()
        .filter_map(|line| line.split_once(':'))
        .filter_map(|(speaker, dialogue)| {
            let text = dialogue.trim();
            if text.is_empty() {
                return None;
            }

            let speaker = speaker.trim().to_lowercase();
            let character = cast.iter().find(|c| c.name.to_lowercase() == speaker);

            let segment = match character {
                Some(c) => DialogueSegment {
                    id: uuid::Uuid::new_v4().to_string(),
                    character_id: c.id.clone(),
                    voice_id: c.voice_id.clone(),
                    voice_name: c.voice_name.clone(),
                    text: text.to_string(),
                },
                None => DialogueSegment {
                    id: uuid::Uuid::new_v4().to_string(),
                    character_id: NARRATOR_ID.to_string(),
                    voice_id: narrator.voice_id.clone(),
                    voice_name: narrator.voice_name.clone(),
                    text: text.to_string(),
                },
            };
            Some(segment)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn narrator() -> Narrator {
        Narrator {
            voice_id: "voiceN".to_string(),
            voice_name: "Narrator".to_string(),
        }
    }

    fn cast() -> Vec<CharacterVoice> {
        vec![
            CharacterVoice::new("Alice", "voiceA", "Aria"),
            CharacterVoice::new("Bob", "voiceB", "Brian"),
        ]
    }

    #[test]
    fn parses_two_speakers_in_order() {
        let segments = parse_script("Alice: Hi there\nBob: Hello!", &cast(), &narrator());
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].voice_id, "voiceA");
        assert_eq!(segments[0].text, "Hi there");
        assert_eq!(segments[1].voice_id, "voiceB");
        assert_eq!(segments[1].text, "Hello!");
    }

    #[test]
    fn speaker_match_ignores_case() {
        let segments = parse_script("  aLiCe : Hey", &cast(), &narrator());
        assert_eq!(segments[0].voice_id, "voiceA");
    }

    #[test]
    fn unknown_speaker_uses_narrator() {
        let segments = parse_script("Carol: Who goes there?", &cast(), &narrator());
        assert_eq!(segments[0].character_id, NARRATOR_ID);
        assert_eq!(segments[0].voice_id, "voiceN");
    }

    #[test]
    fn keeps_later_colons_in_dialogue() {
        let segments = parse_script("Bob: Meet at 10:30: sharp", &cast(), &narrator());
        assert_eq!(segments[0].text, "Meet at 10:30: sharp");
    }

    #[test]
    fn skips_directions_and_empty_lines() {
        let script = "(door creaks)\nAlice:   \n\nBob: Run";
        let segments = parse_script(script, &cast(), &narrator());
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "Run");
    }
}
