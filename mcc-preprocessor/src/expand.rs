//! Macro invocation: argument capture, encoding, substitution
//!
//! Each actual argument is stored under three mask keys bound to the
//! macro handle and argument ordinal: the raw spelling (token paste),
//! the re-preprocessed spelling (ordinary substitution), and the quoted
//! re-preprocessed spelling (stringize). Substitution streams the
//! encoded body through the scratch table and re-preprocesses the
//! result in a fresh nested frame.

use crate::storage::{is_ident_start, Storage};
use crate::stream::Stream;
use crate::{Preprocessor, MAX_CALL_DEPTH};
use mcc_common::{ErrorKind, SourceLocation};

impl Preprocessor<'_> {
    /// An identifier in the copy loop; expand it if it names a macro.
    /// File-backed invocations are wrapped in begin/end markers so
    /// diagnostics inside the expansion point at the invocation site.
    pub(crate) fn parse_identifier(&mut self) {
        let begin = self.io.position();
        let found = self
            .storage
            .search(&mut self.io)
            .filter(|&index| self.storage.get_by_index(index).is_some());

        let Some(index) = found else {
            let word = self.storage.last_read().to_string();
            self.print_str(&word);
            return;
        };

        if self.call_depth >= MAX_CALL_DEPTH {
            self.loc_search_from();
            self.error_here(ErrorKind::CallDepth);
            let word = self.storage.last_read().to_string();
            self.print_str(&word);
            return;
        }

        log::trace!("expanding macro {}", self.storage.to_string(index));
        self.call_depth += 1;
        if self.io.is_file() {
            let end = self.io.position();
            self.io.seek(begin);
            let invocation = self.loc_copy();
            self.prev = Some(invocation);
            self.io.seek(end);

            self.print_char('\n');
            if let Some(tracker) = &mut self.loc {
                tracker.update_begin(begin);
            }

            self.parse_replacement(index);
            self.prev = None;

            self.print_char('\n');
            let position = self.io.position();
            if let Some(tracker) = &mut self.loc {
                tracker.update_end(position);
            }
        } else {
            self.parse_replacement(index);
        }
        self.call_depth -= 1;
        if self.call_depth == 0 {
            self.iterations = 0;
        }
    }

    /// Expand one invocation of the macro behind `index`
    fn parse_replacement(&mut self, index: usize) {
        let expected = self.storage.get_args_by_index(index);
        let position = self.io.position();
        let saved_tracker = self.tracker_copy();

        if expected == 0 {
            // a `()` pair right after the name is consumed if present
            let mut matched = false;
            if self.skip_lines() == Some('(') {
                self.io.scan_char();
                if self.skip_lines() == Some(')') {
                    self.io.scan_char();
                    matched = true;
                }
            }
            if !matched {
                self.tracker_restore(saved_tracker);
                self.io.seek(position);
            }

            let body = self.storage.get_by_index(index).unwrap_or_default().to_string();
            self.preprocess_nested(&body);
            return;
        }

        if self.skip_lines() != Some('(') {
            self.tracker_restore(saved_tracker);
            self.io.seek(position);
            let name = self.storage.to_string(index);
            let site = self
                .prev
                .clone()
                .unwrap_or_else(SourceLocation::unknown);
            self.error_at(ErrorKind::ArgsNon(name), &site);
            return;
        }

        let mut arg_storage = Storage::new_bare();
        match self.parse_brackets(index, &mut arg_storage) {
            Some(actual) if actual == expected => {
                self.parse_observation(index, &mut arg_storage);
            }
            Some(actual) => {
                self.loc_search_from();
                let name = self.storage.to_string(index);
                let kind = if expected > actual {
                    ErrorKind::ArgsRequires(name, expected, actual)
                } else {
                    ErrorKind::ArgsPassed(name, expected, actual)
                };
                self.error_here(kind);
            }
            None => {}
        }
        self.io.scan_char();
    }

    /// Scan the bracketed argument list. Top-level commas separate
    /// arguments; nested brackets and string contents never do. Each
    /// completed argument is encoded immediately. Returns the argument
    /// count, or `None` after a scanning failure.
    fn parse_brackets(&mut self, index: usize, stg: &mut Storage) -> Option<usize> {
        let mut arg: Option<usize> = Some(0);
        let mut character = Some('\0');
        let loc = self.loc_copy();

        let mut hold = Stream::sink();
        self.io.swap_output(&mut hold);

        while character != Some(')') && character.is_some() {
            self.io.scan_char();
            character = self.skip_lines();
            let mut position = self.io.position();
            let mut brackets = 0i32;
            self.io.set_output_buffer();

            while brackets != 0 || !matches!(character, Some(',') | Some(')') | None) {
                if self.io.position() != position {
                    self.print_char(' ');
                }
                if let Some(ch) = self.io.scan_char() {
                    self.print_char(ch);
                }
                if let Some(quote) = character.filter(|&c| c == '\'' || c == '"') {
                    if self.skip_string(quote) != Some(quote) {
                        arg = None;
                    }
                    self.print_char(quote);
                }
                brackets += match character {
                    Some('(') => 1,
                    Some(')') => -1,
                    _ => 0,
                };
                position = self.io.position();
                character = self.skip_lines();
                if character.is_none() {
                    let name = self.storage.to_string(index);
                    self.error_at(ErrorKind::ArgsUnterminated(name), &loc);
                    arg = None;
                }
            }

            if let Some(count) = arg {
                let value = self.io.extract_output_buffer();
                self.parse_values(index, stg, &value, count);
                arg = Some(count + 1);
            }
        }

        self.io.swap_output(&mut hold);
        arg
    }

    /// Encode the three forms of one argument under its mask keys
    fn parse_values(&mut self, index: usize, stg: &mut Storage, value: &str, arg: usize) {
        let handle = stg.add(&format!("#__TKP_{}_{}__", index, arg));
        stg.set_by_index(handle, value);

        let expanded = self.preprocess_to_string(value);
        let handle = stg.add(&format!("__ARG_{}_{}__", index, arg));
        stg.set_by_index(handle, &expanded);

        let mut quoted = String::from("\"");
        for ch in expanded.chars() {
            if ch == '"' || ch == '\\' {
                quoted.push('\\');
            }
            quoted.push(ch);
        }
        quoted.push('"');
        let handle = stg.add(&format!("__STR_{}_{}__", index, arg));
        stg.set_by_index(handle, &quoted);
    }

    /// Stream the encoded body, replacing masks by their bound forms,
    /// then re-preprocess the substituted text
    fn parse_observation(&mut self, index: usize, stg: &mut Storage) {
        let body = self.storage.get_by_index(index).unwrap_or_default().to_string();

        let mut input = Stream::from_buffer(&body);
        input.set_output_buffer();
        let saved_io = std::mem::replace(&mut self.io, input);
        let saved_loc = self.loc.take();

        loop {
            let character = self.skip_until(true);
            match character {
                Some(ch) if ch == '#' || is_ident_start(ch) => {
                    match stg.search_longest(&mut self.io) {
                        Some(found) => {
                            let value = stg.get_by_index(found).unwrap_or_default().to_string();
                            self.print_str(&value);
                        }
                        None => {
                            let word = stg.last_read().to_string();
                            self.print_str(&word);
                        }
                    }
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
                None => break,
            }
        }

        self.loc = saved_loc;
        let mut inner = std::mem::replace(&mut self.io, saved_io);
        let substituted = inner.extract_output_buffer();

        self.preprocess_nested(&substituted);
    }
}
