/// Maximum length of a single Discord message, in characters.
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

/// Split `content` into chunks of at most `max_len` characters.
///
/// Lines are packed greedily and joined with `\n`. A line that does not fit
/// on its own is packed word by word (joined with a space), and a word longer
/// than `max_len` is cut every `max_len` characters. Lengths are counted in
/// `char`s so multi-byte text is never cut inside a character.
pub fn split_message(content: &str, max_len: usize) -> Vec<String> {
    let max_len = max_len.max(1);
    if content.is_empty() {
        return Vec::new();
    }
    if char_len(content) <= max_len {
        return vec![content.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in content.split('\n') {
        if fits(&current, "\n", line, max_len) {
            push_with_separator(&mut current, "\n", line);
            continue;
        }

        flush(&mut chunks, &mut current);

        if char_len(line) <= max_len {
            current.push_str(line);
            continue;
        }

        for word in line.split(' ') {
            if fits(&current, " ", word, max_len) {
                push_with_separator(&mut current, " ", word);
                continue;
            }

            flush(&mut chunks, &mut current);

            if char_len(word) <= max_len {
                current.push_str(word);
            } else {
                let mut pieces = hard_split(word, max_len);
                // The tail keeps accumulating following words.
                if let Some(tail) = pieces.pop() {
                    chunks.extend(pieces);
                    current = tail;
                }
            }
        }
    }

    flush(&mut chunks, &mut current);
    chunks
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn fits(current: &str, separator: &str, next: &str, max_len: usize) -> bool {
    let sep = if current.is_empty() { 0 } else { char_len(separator) };
    char_len(current) + sep + char_len(next) <= max_len
}

fn push_with_separator(current: &mut String, separator: &str, next: &str) {
    if !current.is_empty() {
        current.push_str(separator);
    }
    current.push_str(next);
}

fn flush(chunks: &mut Vec<String>, current: &mut String) {
    if !current.is_empty() {
        chunks.push(std::mem::take(current));
    }
}

fn hard_split(word: &str, max_len: usize) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    chars
        .chunks(max_len)
        .map(|piece| piece.iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_within(chunks: &[String], max_len: usize) {
        for chunk in chunks {
            assert!(!chunk.is_empty());
            assert!(
                chunk.chars().count() <= max_len,
                "chunk of {} chars exceeds {max_len}",
                chunk.chars().count()
            );
        }
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(split_message("", 10).is_empty());
    }

    #[test]
    fn short_input_is_returned_as_is() {
        assert_eq!(split_message("hello\nworld", 2000), vec!["hello\nworld"]);
        assert_eq!(split_message("exactly10!", 10), vec!["exactly10!"]);
    }

    #[test]
    fn unbroken_text_is_cut_at_the_limit() {
        assert_eq!(split_message("1234567890", 5), vec!["12345", "67890"]);
    }

    #[test]
    fn newline_is_kept_when_both_lines_fit() {
        let text = format!("{}\n{}", "a".repeat(100), "b".repeat(100));
        assert_eq!(split_message(&text, 250), vec![text.clone()]);
        assert_eq!(
            split_message(&text, 150),
            vec!["a".repeat(100), "b".repeat(100)]
        );
    }

    #[test]
    fn lines_are_packed_greedily() {
        let text = "aaaa\nbbbb\ncccc\ndddd";
        let chunks = split_message(text, 10);
        assert_eq!(chunks, vec!["aaaa\nbbbb", "cccc\ndddd"]);
        assert_eq!(chunks.join("\n"), text);
    }

    #[test]
    fn long_lines_are_packed_by_words() {
        let text = "the quick brown fox jumps over the lazy dog";
        let chunks = split_message(text, 15);
        assert_within(&chunks, 15);
        assert_eq!(chunks, vec!["the quick brown", "fox jumps over", "the lazy dog"]);
        assert_eq!(chunks.join(" "), text);
    }

    #[test]
    fn oversized_words_are_hard_split() {
        let word = "x".repeat(25);
        let chunks = split_message(&format!("{word} end"), 10);
        assert_within(&chunks, 10);
        assert_eq!(chunks, vec!["xxxxxxxxxx", "xxxxxxxxxx", "xxxxx end"]);
    }

    #[test]
    fn multibyte_text_is_never_cut_inside_a_char() {
        let text = "日本語のテキスト".repeat(10);
        let chunks = split_message(&text, 7);
        assert_within(&chunks, 7);
        assert_eq!(chunks.concat(), text);

        let emoji = "🦀".repeat(2001);
        let chunks = split_message(&emoji, DISCORD_MESSAGE_LIMIT);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 2000);
        assert_eq!(chunks[1], "🦀");
    }

    #[test]
    fn discord_sized_reply_keeps_paragraphs_whole() {
        let paragraph = "word ".repeat(300);
        let paragraph = paragraph.trim_end();
        let text = [paragraph; 4].join("\n");
        let chunks = split_message(&text, DISCORD_MESSAGE_LIMIT);
        assert_within(&chunks, DISCORD_MESSAGE_LIMIT);
        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(|c| c == paragraph));
    }
}
