//! Directive recognition and the `#define`/`#set`/`#undef`/`#include`
//! family
//!
//! A hash introduces a directive only when nothing but whitespace and
//! comments precede it on its line. The leading run of each line is
//! buffered while looking for the hash: it is flushed when the line
//! turns out to be ordinary text and dropped when a directive is found.

use crate::storage::{is_ident_start, is_keyword, Storage};
use crate::stream::Stream;
use crate::{Preprocessor, MAX_INCLUDE_DEPTH};
use mcc_common::{ErrorKind, SourceLocation, WarningKind};

pub(crate) enum DirectiveOutcome {
    /// Keyword handle, location of the hash, directive spelling
    Keyword(usize, SourceLocation, String),
    /// Not a directive; the line continues as ordinary text
    Text,
    Eof,
}

impl Preprocessor<'_> {
    /// Buffer the leading run of each line until the first significant
    /// character. Returns that character plus, when it is a hash, the
    /// pending buffered output.
    fn parse_hash(&mut self) -> (Option<char>, String) {
        let mut hold = Stream::sink();
        self.io.swap_output(&mut hold);
        self.io.set_output_buffer();

        let character = loop {
            if self.line_required {
                let _ = self.io.extract_output_buffer();
                self.io.set_output_buffer();
            }
            let ch = self.skip_until(true);
            if ch != Some('\n') {
                break ch;
            }
            self.io.scan_char();
            self.print_char('\n');
            self.line_break();
        };

        let text = self.io.extract_output_buffer();
        self.io.swap_output(&mut hold);
        self.line_required = false;

        if character == Some('#') {
            (character, text)
        } else {
            self.print_str(&text);
            (character, String::new())
        }
    }

    /// Recognize a directive at a line start. On failure the buffered
    /// text is flushed and the line falls through to the copy loop.
    pub(crate) fn parse_directive(&mut self) -> DirectiveOutcome {
        let (character, buffered) = self.parse_hash();
        match character {
            Some('#') => {}
            Some(_) => return DirectiveOutcome::Text,
            None => return DirectiveOutcome::Eof,
        }

        let mut loc = self.loc_copy();
        let mut pending = buffered;

        let mut keyword = self.storage.search(&mut self.io);
        let mut name = self.storage.last_read().to_string();
        pending.push('#');

        if name == "#" {
            // the hash may be separated from the name by blanks
            let (ch, spaces) = self.capture_output(|p| p.skip_until(true));
            pending.push_str(&spaces);
            if matches!(ch, Some(c) if is_ident_start(c)) {
                loc = self.loc_copy();
                self.storage.search(&mut self.io);
                name = format!("#{}", self.storage.last_read());
                keyword = self.storage.get_index(&name);
            }
        }

        match keyword {
            Some(handle) if is_keyword(handle) => DirectiveOutcome::Keyword(handle, loc, name),
            _ => {
                self.print_str(&pending);
                let tail = name.trim_start_matches('#').to_string();
                if tail.chars().next().is_some_and(is_ident_start) {
                    self.error_at(ErrorKind::DirectiveInvalid(tail.clone()), &loc);
                    self.print_str(&tail);
                } else {
                    self.error_at(ErrorKind::CharacterStray('#'), &loc);
                }
                DirectiveOutcome::Text
            }
        }
    }

    /// `#line` is reserved: warn and skip the rest of the line
    pub(crate) fn parse_line(&mut self, loc: &SourceLocation) {
        self.warning_at(WarningKind::DirectiveLineSkipped, loc);
        self.skip_directive();
    }

    pub(crate) fn parse_include(&mut self, loc: &SourceLocation) {
        if self.include_depth >= MAX_INCLUDE_DEPTH {
            self.error_at(ErrorKind::IncludeDepth, loc);
            self.skip_directive();
            return;
        }

        self.include_depth += 1;
        match self.skip_until(false) {
            Some('<') => self.parse_include_path('>'),
            Some('"') => self.parse_include_path('"'),
            Some('\n') | None => self.error_at(ErrorKind::IncludeExpectsFilename, loc),
            Some(_) => {
                self.loc_search_from();
                self.error_here(ErrorKind::IncludeExpectsFilename);
            }
        }
        self.include_depth -= 1;
        self.skip_directive();
    }

    fn parse_include_path(&mut self, quote: char) {
        let loc = self.loc_copy();
        self.io.scan_char();

        let (character, path) = self.capture_output(|p| p.skip_string(quote));
        if character != Some(quote) {
            self.error_at(ErrorKind::IncludeExpectsFilename, &loc);
            return;
        }

        let from = self.io.file_id();
        let found = if quote == '"' {
            self.linker.search_internal(&path, from)
        } else {
            self.linker.search_external(&path)
        };
        let Some(file_id) = found else {
            self.error_at(ErrorKind::IncludeNoSuchFile, &loc);
            return;
        };

        if self.skip_until(false) != Some('\n') {
            self.loc_search_from();
            self.warning_here(WarningKind::DirectiveExtraTokens("include".to_string()));
        }

        // included output is set off by blank lines on both sides
        self.print_char('\n');
        self.preprocess_header(file_id);
        self.print_char('\n');
    }

    /// Position at the macro name after a directive that requires one
    fn parse_name(&mut self, directive: &str) -> bool {
        let loc = self.loc_copy();
        match self.skip_until(false) {
            Some(ch) if is_ident_start(ch) => true,
            Some('\n') | None => {
                self.error_at(ErrorKind::DirectiveNameNon(directive.to_string()), &loc);
                false
            }
            Some(_) => {
                self.loc_search_from();
                self.error_here(ErrorKind::MacroNameFirstCharacter);
                false
            }
        }
    }

    pub(crate) fn parse_define(&mut self, directive: &str) {
        if self.parse_name(directive) {
            let loc = self.loc_copy();
            match self.storage.add_by_reader(&mut self.io) {
                None => {
                    let name = self.storage.last_read().to_string();
                    self.error_at(ErrorKind::MacroNameRedefine(name), &loc);
                }
                Some(index) => self.parse_context(index),
            }
        }
        self.skip_directive();
    }

    pub(crate) fn parse_set(&mut self, directive: &str) {
        if self.parse_name(directive) {
            let loc = self.loc_copy();
            let position = self.io.position();
            let mut index = self.storage.search(&mut self.io);

            if index.is_none() {
                let name = self.storage.last_read().to_string();
                self.warning_at(WarningKind::MacroNameUndefined(name), &loc);
                self.io.seek(position);
                index = self.storage.add_by_reader(&mut self.io);
            }

            if let Some(index) = index {
                self.parse_context(index);
            }
        }
        self.skip_directive();
    }

    pub(crate) fn parse_undef(&mut self, directive: &str) {
        if self.parse_name(directive) {
            let index = self.storage.search(&mut self.io);
            self.storage.remove_by_index(index);
        }
        self.skip_directive();
    }

    /// Parse the parameter list and body of a macro being defined. The
    /// macro storage is swapped for a scratch one holding the parameter
    /// names, so body identifiers resolve against parameters only.
    fn parse_context(&mut self, index: usize) {
        let origin = std::mem::replace(&mut self.storage, Storage::new_bare());

        let args = self.parse_args();
        let mut body = None;

        if args.is_some() {
            let mut on_edge = false;
            if self.skip_until(false) == Some('#') {
                self.loc_search_from();
                self.io.scan_char();
                let second = self.io.scan_char();
                if second == Some('#') {
                    self.error_here(ErrorKind::HashOnEdge("##"));
                    on_edge = true;
                } else {
                    // not a paste; rewind and let the body parser see it
                    if let Some(ch) = second {
                        self.io.unscan_char(ch);
                    }
                    self.io.unscan_char('#');
                }
            }
            if !on_edge {
                body = self.parse_content(index);
            }
        }

        let mut origin = origin;
        match (args, body) {
            (Some(count), Some(value)) => {
                log::debug!("macro {} defined with {} parameter(s)", origin.to_string(index), count);
                origin.set_args_by_index(index, count);
                origin.set_by_index(index, &value);
            }
            _ => origin.remove_by_index(Some(index)),
        }
        self.storage = origin;
    }

    /// Parse the parenthesized parameter list; parameters land in the
    /// scratch storage with their ordinal as payload. A space before the
    /// opening parenthesis means there is no list at all.
    fn parse_args(&mut self) -> Option<usize> {
        let position = self.io.position();
        if self.skip_until(false) != Some('(') || position != self.io.position() {
            return Some(0);
        }

        let loc = self.loc_copy();
        self.io.scan_char();
        let mut character = self.skip_until(false);

        let mut count = 0;
        loop {
            match character {
                Some(')') => {
                    self.io.scan_char();
                    return Some(count);
                }
                Some('\n') | None => {
                    self.error_at(ErrorKind::ArgsExpectedBracket, &loc);
                    return None;
                }
                Some(ch) => {
                    self.loc_search_from();
                    if !is_ident_start(ch) {
                        self.error_here(ErrorKind::ArgsExpectedName(ch));
                        return None;
                    }
                }
            }

            match self.storage.add_by_reader(&mut self.io) {
                None => {
                    let name = self.storage.last_read().to_string();
                    self.error_here(ErrorKind::ArgsDuplicate(name));
                    return None;
                }
                Some(index) => {
                    let ordinal = count.to_string();
                    self.storage.set_by_index(index, &ordinal);
                }
            }

            character = self.skip_until(false);
            if character == Some(',') {
                self.io.scan_char();
                character = self.skip_until(false);
            } else if let Some(ch) = character.filter(|&c| c != ')' && c != '\n') {
                self.loc_search_from();
                self.error_here(ErrorKind::ArgsExpectedComma(ch));
                return None;
            }
            count += 1;
        }
    }

    /// Encode the macro body up to the logical end of line. Parameters
    /// become argument masks, `#` and `##` become stringize and paste
    /// masks; everything else is copied with runs of blanks collapsed to
    /// one space.
    fn parse_content(&mut self, index: usize) -> Option<String> {
        let mut hold = Stream::sink();
        self.io.swap_output(&mut hold);
        self.io.set_output_buffer();

        let mut character = self.skip_until(false);
        let mut position = self.io.position();
        let mut failed = false;

        while !matches!(character, Some('\n') | None) {
            if character == Some('#') {
                let was_space = self.io.position() != position;
                if !self.parse_operator(index, was_space) {
                    failed = true;
                    break;
                }
            } else {
                if self.io.position() != position {
                    self.print_char(' ');
                }
                match character {
                    Some(ch) if is_ident_start(ch) => match self.storage.search(&mut self.io) {
                        Some(param) => {
                            let ordinal =
                                self.storage.get_by_index(param).unwrap_or_default().to_string();
                            self.print_str(&format!("__ARG_{}_{}__", index, ordinal));
                        }
                        None => {
                            let word = self.storage.last_read().to_string();
                            self.print_str(&word);
                        }
                    },
                    Some(quote @ ('\'' | '"')) => {
                        self.io.scan_char();
                        self.print_char(quote);
                        if self.skip_string(quote) != Some(quote) {
                            failed = true;
                            break;
                        }
                        self.print_char(quote);
                    }
                    Some(ch) => {
                        self.io.scan_char();
                        self.print_char(ch);
                    }
                    _ => {}
                }
            }

            position = self.io.position();
            character = self.skip_until(false);
        }

        let body = self.io.extract_output_buffer();
        self.io.swap_output(&mut hold);
        if failed {
            None
        } else {
            Some(body)
        }
    }

    /// Encode a `#param` or `lhs##param` operator inside a macro body
    fn parse_operator(&mut self, index: usize, was_space: bool) -> bool {
        let loc = self.loc_copy();
        self.io.scan_char();

        let character = self.io.scan_char();
        if character == Some('#') {
            let next = self.skip_until(false);
            if matches!(next, Some('\n') | None) {
                self.error_at(ErrorKind::HashOnEdge("##"), &loc);
                return false;
            }
            return match self.storage.search(&mut self.io) {
                Some(param) => {
                    let ordinal = self.storage.get_by_index(param).unwrap_or_default().to_string();
                    self.print_str(&format!("#__TKP_{}_{}__", index, ordinal));
                    true
                }
                None => {
                    let word = self.storage.last_read().to_string();
                    if word.is_empty() {
                        self.error_at(ErrorKind::HashNotFollowed("##"), &loc);
                        false
                    } else {
                        // a plain token pastes literally, flush against
                        // the preceding one
                        self.print_str(&word);
                        true
                    }
                }
            };
        }

        if let Some(ch) = character {
            self.io.unscan_char(ch);
        }
        let _ = self.skip_until(false);
        match self.storage.search(&mut self.io) {
            Some(param) => {
                let ordinal = self.storage.get_by_index(param).unwrap_or_default().to_string();
                if was_space {
                    self.print_char(' ');
                }
                self.print_str(&format!("__STR_{}_{}__", index, ordinal));
                true
            }
            None => {
                self.error_at(ErrorKind::HashNotFollowed("#"), &loc);
                false
            }
        }
    }
}
