const SPECIAL: &str = "_*[]()~`>#+-=|{}.!\\";

/// Escape every character Telegram MarkdownV2 treats as markup.
pub fn escape_markdown_v2(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for ch in text.chars() {
        if SPECIAL.contains(ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
