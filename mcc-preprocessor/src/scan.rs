//! Scanning layer: comments, strings, line splices, and the per-line
//! copy loop
//!
//! Everything here reads through `self.io` and echoes into its output.
//! `skip_until` is the workhorse: it consumes comments, blanks, and
//! spliced line breaks and stops on the first significant character
//! without consuming it.

use crate::storage::is_ident_start;
use crate::stream::Stream;
use crate::Preprocessor;
use mcc_common::ErrorKind;

impl Preprocessor<'_> {
    /// Skip a `//` comment; the slashes are already consumed. Spliced
    /// line breaks inside it are emitted as empty lines. Exits before
    /// the terminating newline.
    pub(crate) fn skip_comment(&mut self) {
        let mut was_slash = false;
        let mut character = self.io.scan_char();

        while let Some(ch) = character {
            if !was_slash && ch == '\n' {
                break;
            }
            if ch == '\n' {
                self.line_break();
                self.print_char(ch);
            }
            was_slash = ch == '\\';
            character = self.io.scan_char();
        }

        if let Some(ch) = character {
            self.io.unscan_char(ch);
        }
    }

    /// Skip a `/* … */` comment after the opening slash and star were
    /// consumed. A comment without a line break is kept verbatim; a
    /// multi-line one is removed, preserving its newlines, and the final
    /// line's tail is blanked out so columns after it stay faithful.
    pub(crate) fn skip_multi_comment(&mut self) {
        self.io.unscan_char('*');
        self.io.unscan_char('/');
        let loc = self.loc_copy();

        let mut piece = String::new();
        for _ in 0..2 {
            if let Some(ch) = self.io.scan_char() {
                piece.push(ch);
            }
        }

        let mut was_star = false;
        let mut character = Some('\0');
        loop {
            was_star = character == Some('*');
            character = self.io.scan_char();
            if let Some(ch) = character {
                piece.push(ch);
            }
            if was_star && character == Some('/') {
                self.print_str(&piece);
                return;
            }
            if matches!(character, None | Some('\n')) {
                break;
            }
        }

        let mut begin = self.io.position();
        while !(was_star && character == Some('/')) {
            match character {
                None => {
                    self.error_at(ErrorKind::CommentUnterminated, &loc);
                    return;
                }
                Some('\n') => {
                    self.line_break();
                    self.print_char('\n');
                    begin = self.io.position();
                }
                _ => {}
            }
            was_star = character == Some('*');
            character = self.io.scan_char();
        }

        let end = self.io.position();
        self.io.seek(begin);
        while self.io.position() != end {
            let blank = match self.io.scan_char() {
                Some('\t') => '\t',
                _ => ' ',
            };
            self.print_char(blank);
        }
    }

    /// Copy string content after the opening quote was consumed and
    /// echoed. Stops on the closing quote without printing it; returns
    /// the last character read. A bare line break or EOF inside is an
    /// error.
    pub(crate) fn skip_string(&mut self, quote: char) -> Option<char> {
        self.io.unscan_char(quote);
        let loc = self.loc_copy();
        self.io.scan_char();

        let mut character = self.io.scan_char();
        let mut was_slash = false;

        while was_slash || character != Some(quote) {
            if character == Some('\n') {
                self.line_break();
            }
            let ch = match character {
                Some(ch) if was_slash || ch != '\n' => ch,
                _ => {
                    self.error_at(ErrorKind::StringUnterminated(quote), &loc);
                    break;
                }
            };
            self.print_char(ch);
            was_slash = !was_slash && ch == '\\';
            character = self.io.scan_char();
        }

        character
    }

    /// Skip comments, blanks, and spliced newlines up to the first
    /// significant character, which is left unconsumed. With `fill` the
    /// skipped-over output (spaces, kept comments, splices) is echoed;
    /// without it, everything is discarded.
    pub(crate) fn skip_until(&mut self, fill: bool) -> Option<char> {
        let mut hold = Stream::sink();
        if !fill {
            self.io.swap_output(&mut hold);
        }

        let result = loop {
            let character = self.io.scan_char();
            match character {
                Some('/') => match self.io.scan_char() {
                    Some('*') => {
                        self.skip_multi_comment();
                        continue;
                    }
                    Some('/') => {
                        self.skip_comment();
                        continue;
                    }
                    other => {
                        if let Some(ch) = other {
                            self.io.unscan_char(ch);
                        }
                        break Some('/');
                    }
                },
                Some('\\') => match self.io.scan_char() {
                    Some('\n') => {
                        self.print_str("\\\n");
                        self.line_break();
                        continue;
                    }
                    other => {
                        if let Some(ch) = other {
                            self.io.unscan_char(ch);
                        }
                        break Some('\\');
                    }
                },
                Some(' ') | Some('\t') => {
                    self.print_char(character.unwrap_or(' '));
                    continue;
                }
                other => break other,
            }
        };

        if let Some(ch) = result {
            self.io.unscan_char(ch);
        }
        if !fill {
            self.io.swap_output(&mut hold);
        }
        result
    }

    /// Like `skip_until` without fill, but newlines are also consumed
    pub(crate) fn skip_lines(&mut self) -> Option<char> {
        let mut character = self.skip_until(false);
        while character == Some('\n') {
            self.io.scan_char();
            self.line_break();
            character = self.skip_until(false);
        }
        character
    }

    /// Skip the rest of the directive line through the main copy loop
    /// with a discarded output; recovery stays disabled for the duration
    pub(crate) fn skip_directive(&mut self) {
        let saved_recovery = self.recovery_disabled;
        let saved_error = self.was_error;
        self.recovery_disabled = true;
        self.was_error = true;

        let mut hold = Stream::sink();
        self.io.swap_output(&mut hold);
        self.parse_until();
        self.io.swap_output(&mut hold);

        self.was_error = saved_error;
        self.recovery_disabled = saved_recovery;
        self.line_required = true;
    }

    /// Process one line of ordinary text: expand identifiers, copy
    /// strings transparently, flag stray hashes. Returns the last
    /// character handled (`None` at end of input).
    pub(crate) fn parse_until(&mut self) -> Option<char> {
        let start = self.io.position();
        let mut character = Some('\0');

        while !matches!(character, Some('\n') | None) {
            character = self.skip_until(true);
            match character {
                Some(ch) if is_ident_start(ch) && self.io.output_active() => {
                    self.parse_identifier();
                }
                Some('#') => {
                    self.loc_search_from();
                    self.error_here(ErrorKind::CharacterStray('#'));
                    self.io.scan_char();
                    self.print_char('#');
                }
                Some(quote @ ('\'' | '"')) => {
                    self.io.scan_char();
                    self.print_char(quote);
                    if let Some(last) = self.skip_string(quote) {
                        self.print_char(last);
                    }
                }
                Some(ch) => {
                    self.io.scan_char();
                    self.print_char(ch);
                }
                None => {}
            }
        }

        if character.is_none() && self.prev.is_none() && self.io.position() != start {
            self.print_char('\n');
        }
        self.line_break();
        character
    }
}
