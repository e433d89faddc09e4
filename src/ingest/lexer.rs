/// Lexer state structure for scanning hashtag tokens out of a post body
pub struct Lexer<'a> {
    pub input: &'a str,
    pub byte_pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, byte_pos: 0 }
    }

    /// Checks current value of the input stream under the cursor without advancing its position
    pub fn peek_char(&self) -> Option<char> {
        self.input[self.byte_pos..].chars().next()
    }

    /// Advances the cursor position forward one element (if the next element is not the EOF),
    /// returning the value of the previous element
    pub fn next(&mut self) -> Option<char> {
        let ch = self.peek_char();
        if let Some(utf) = ch {
            self.byte_pos += utf.len_utf8();
            Some(utf)
        } else {
            None
        }
    }

    /// Consumes all consecutive word characters, returning the consumed characters to the
    /// caller, or `None` if the character under the cursor is not a word character
    pub fn next_word_chars(&mut self) -> Option<&'a str> {
        let start = self.byte_pos;
        while let Some(ch) = self.peek_char() {
            if !is_word_char(ch) {
                break;
            }

            self.next();
        }

        if start == self.byte_pos {
            None
        } else {
            Some(&self.input[start..self.byte_pos])
        }
    }

    /// Determine if the cursor's position is the end of the input stream
    pub fn is_eof(&self) -> bool {
        self.byte_pos >= self.input.len()
    }
}

// ASCII word class, the same set the original post-processing matched with `\w`
#[inline]
fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// Returns every hashtag token (`#` plus one or more word characters) in
/// `body`, in order of first appearance, duplicates retained. Total over all
/// input; unmatched text yields an empty vec.
pub fn extract_hashtags(body: &str) -> Vec<&str> {
    let mut lexer = Lexer::new(body);
    let mut tags = Vec::new();

    while let Some(ch) = lexer.peek_char() {
        if ch == '#' {
            let start = lexer.byte_pos;
            lexer.next();

            if lexer.next_word_chars().is_some() {
                tags.push(&body[start..lexer.byte_pos]);
            }
        } else {
            lexer.next();
        }
    }

    tags
}
