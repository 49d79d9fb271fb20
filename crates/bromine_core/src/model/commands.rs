//! Slash-command menu entries.

/// Commands offered when the user types `/` in the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlashCommand {
    Text,
    Heading1,
    Heading2,
    BulletList,
    NumberedList,
    Divider,
    CodeBlock,
    LinkToNote,
}

impl SlashCommand {
    /// Menu order.
    pub const ALL: [SlashCommand; 8] = [
        Self::Text,
        Self::Heading1,
        Self::Heading2,
        Self::BulletList,
        Self::NumberedList,
        Self::Divider,
        Self::CodeBlock,
        Self::LinkToNote,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Heading1 => "Heading 1",
            Self::Heading2 => "Heading 2",
            Self::BulletList => "Bullet List",
            Self::NumberedList => "Numbered List",
            Self::Divider => "Divider",
            Self::CodeBlock => "Code Block",
            Self::LinkToNote => "Link to Note",
        }
    }

    /// Commands whose title contains `query`, case-insensitive, in menu order.
    pub fn matching(query: &str) -> Vec<SlashCommand> {
        let query = query.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .filter(|command| command.title().to_lowercase().contains(&query))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::SlashCommand;

    #[test]
    fn empty_query_lists_every_command() {
        assert_eq!(SlashCommand::matching(""), SlashCommand::ALL.to_vec());
    }

    #[test]
    fn query_filters_by_title() {
        assert_eq!(
            SlashCommand::matching("HEAD"),
            vec![SlashCommand::Heading1, SlashCommand::Heading2]
        );
        assert_eq!(SlashCommand::matching("note"), vec![SlashCommand::LinkToNote]);
        assert!(SlashCommand::matching("zzz").is_empty());
    }
}
