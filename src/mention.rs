//! Bot mention detection.
//!
//! Chat adapters hand the dispatcher only the text that follows the bot
//! mention. Mentions count only at the very start of a message.

use regex::Regex;

use crate::config::Platform;

/// Finds the bot mention at the start of a message and strips it.
pub trait MentionExtractor: Send + Sync {
    /// Returns the text after the mention and whether a mention was found.
    /// When nothing is found the input comes back unchanged.
    fn find_and_trim(&self, text: &str) -> (String, bool);
}

/// `@Name` mentions, matched case-insensitively on a word boundary.
pub struct PrefixMention {
    pattern: Regex,
}

impl PrefixMention {
    pub fn new(bot_name: &str) -> Result<Self, regex::Error> {
        let name = bot_name.trim_start_matches('@');
        let pattern = Regex::new(&format!(r"(?i)^@{}\b", regex::escape(name)))?;
        Ok(Self { pattern })
    }
}

impl MentionExtractor for PrefixMention {
    fn find_and_trim(&self, text: &str) -> (String, bool) {
        match self.pattern.find(text) {
            Some(m) => (text[m.end()..].to_string(), true),
            None => (text.to_string(), false),
        }
    }
}

/// `<at>Name</at>` mentions as sent by tag-based platforms.
pub struct TagMention {
    pattern: Regex,
}

impl TagMention {
    pub fn new(bot_name: &str) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!(r"^<at>{}</at>", regex::escape(bot_name)))?;
        Ok(Self { pattern })
    }
}

impl MentionExtractor for TagMention {
    fn find_and_trim(&self, text: &str) -> (String, bool) {
        match self.pattern.find(text) {
            Some(m) => (text[m.end()..].to_string(), true),
            None => (text.to_string(), false),
        }
    }
}

/// Pick the extractor a platform uses.
pub fn for_platform(
    platform: Platform,
    bot_name: &str,
) -> Result<Box<dyn MentionExtractor>, regex::Error> {
    Ok(match platform {
        Platform::Teams => Box::new(TagMention::new(bot_name)?),
        _ => Box::new(PrefixMention::new(bot_name)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefix(text: &str) -> (String, bool) {
        PrefixMention::new("Botkube").unwrap().find_and_trim(text)
    }

    fn tag(text: &str) -> (String, bool) {
        TagMention::new("Botkube").unwrap().find_and_trim(text)
    }

    #[test]
    fn prefix_mention() {
        assert_eq!(prefix("@Botkube k get pods"), (" k get pods".into(), true));
    }

    #[test]
    fn prefix_lowercase() {
        assert_eq!(prefix("@botkube k get pods"), (" k get pods".into(), true));
    }

    #[test]
    fn prefix_uppercase() {
        assert_eq!(prefix("@BOTKUBE k get pods"), (" k get pods".into(), true));
    }

    #[test]
    fn prefix_not_at_beginning() {
        let (_, found) = prefix("Not at the beginning @Botkube k get pods");
        assert!(!found);
    }

    #[test]
    fn prefix_different_name() {
        let (_, found) = prefix("@bootkube k get pods");
        assert!(!found);
    }

    #[test]
    fn prefix_longer_name_is_not_a_match() {
        let (_, found) = prefix("@Botkubes k get pods");
        assert!(!found);
    }

    #[test]
    fn prefix_accepts_name_with_at_sign() {
        let m = PrefixMention::new("@Botkube").unwrap();
        assert_eq!(m.find_and_trim("@Botkube ping"), (" ping".into(), true));
    }

    #[test]
    fn tag_mention() {
        assert_eq!(tag("<at>Botkube</at> k get pods"), (" k get pods".into(), true));
    }

    #[test]
    fn tag_not_at_beginning() {
        let input = "Not at the beginning <at>Botkube</at> k get pods";
        assert_eq!(tag(input), (input.into(), false));
    }

    #[test]
    fn tag_different_name() {
        let input = "<at>bootkube</at> k get pods";
        assert_eq!(tag(input), (input.into(), false));
    }

    #[test]
    fn platform_selection() {
        let teams = for_platform(Platform::Teams, "Botkube").unwrap();
        assert!(teams.find_and_trim("<at>Botkube</at> ping").1);
        let mm = for_platform(Platform::Mattermost, "Botkube").unwrap();
        assert!(mm.find_and_trim("@Botkube ping").1);
    }
}
