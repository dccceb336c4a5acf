use poise::serenity_prelude::MessageBuilder;

/// `push_safe` が扱わない Markdown 記号
const EXTRA_MARKDOWN_CHARS: [char; 3] = ['~', '|', '>'];
const ZWSP: char = '\u{200B}';

/// Discord の Markdown を無効化し、メンションが飛ばないようにする。
///
/// `*` `_` `` ` `` と `@everyone` / `@here`、招待リンクは serenity の `push_safe` に任せ、
/// 残りの記号とユーザー・チャンネルメンションだけここで処理する。
pub fn escape_and_defuse(input: &str) -> String {
    let safe = MessageBuilder::new()
        .push_safe(input.replace('\\', "\\\\"))
        .build();

    let mut out = String::with_capacity(safe.len() + 8);
    for c in safe.chars() {
        if EXTRA_MARKDOWN_CHARS.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    defuse_mentions(&out)
}

/// `@` と `<#` の直後にゼロ幅スペースを挟む（既に挟まっていれば何もしない）
fn defuse_mentions(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut prev: Option<char> = None;
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        out.push(c);
        let mention_start = match c {
            '@' => true,
            '#' => prev == Some('<'),
            _ => false,
        };
        if mention_start && chars.peek().is_some_and(|n| !n.is_whitespace() && *n != ZWSP) {
            out.push(ZWSP);
        }
        prev = Some(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_titles_pass_through() {
        assert_eq!(escape_and_defuse("My Song"), "My Song");
    }

    #[test]
    fn markdown_is_escaped() {
        assert_eq!(escape_and_defuse("**loud** _song_"), "\\*\\*loud\\*\\* \\_song\\_");
        assert_eq!(escape_and_defuse("a`b|c"), "a\\`b\\|c");
    }

    #[test]
    fn mass_mentions_are_defused() {
        assert_eq!(escape_and_defuse("@everyone"), "@\u{200B}everyone");
        assert_eq!(escape_and_defuse("hi @here"), "hi @\u{200B}here");
    }

    #[test]
    fn user_and_channel_mentions_are_defused() {
        assert_eq!(escape_and_defuse("<@123>"), "<@\u{200B}123\\>");
        assert_eq!(escape_and_defuse("<#456>"), "<#\u{200B}456\\>");
    }

    #[test]
    fn backslashes_are_escaped_once() {
        assert_eq!(escape_and_defuse("a\\b"), "a\\\\b");
        assert_eq!(escape_and_defuse("\\*"), "\\\\\\*");
    }

    #[test]
    fn mentions_get_a_single_zero_width_space() {
        let out = escape_and_defuse("@everyone <@1>");
        assert_eq!(out.matches('\u{200B}').count(), 2);
        assert!(!out.contains("@everyone"));
    }

    #[test]
    fn lone_at_sign_is_left_alone() {
        assert_eq!(escape_and_defuse("me @ home"), "me @ home");
    }
}
